//! Conversions from the configuration model to runtime types

use bridge::{CorrelationMode, PollSettings, QueueDescriptor};
use config::{CorrelationSetting, FamilyQueues, GatewayConfig, PollingConfig};
use server::ServerConfig;

pub fn poll_settings(polling: &PollingConfig) -> PollSettings {
    PollSettings {
        interval: polling.interval(),
        max_attempts: polling.max_attempts(),
        deadline: polling.deadline(),
    }
}

pub fn correlation_mode(setting: CorrelationSetting) -> CorrelationMode {
    match setting {
        CorrelationSetting::Correlated => CorrelationMode::Correlated,
        CorrelationSetting::Shared => CorrelationMode::Shared,
    }
}

pub fn queue_descriptor(queues: &FamilyQueues) -> QueueDescriptor {
    QueueDescriptor {
        exchange: queues.exchange.clone(),
        routing_key: queues.routing_key.clone(),
        request_queue: queues.request_queue.clone(),
        response_queue: queues.response_queue.clone(),
        response_routing_key: queues.response_routing_key.clone(),
    }
}

/// Server settings for the gateway, with an optional port override from the CLI
pub fn server_config(gateway: &GatewayConfig, http_override: Option<u16>) -> ServerConfig {
    ServerConfig::new(
        gateway.host.clone(),
        http_override.unwrap_or(gateway.http_port),
    )
    .with_request_timeout(gateway.request_timeout())
    .with_max_body_bytes(gateway.max_upload_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge::JobFamily;
    use std::time::Duration;

    fn config() -> config::LabgateConfig {
        config::parse_config(
            r#"
gateway:
  host: 127.0.0.1
  http_port: 8080
  request_timeout_seconds: 12
backend:
  base_uri: http://localhost:8081
polling:
  interval_ms: 200
  deadline_ms: 2000
  correlation: shared
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_poll_settings_from_config() {
        let settings = poll_settings(&config().polling);

        assert_eq!(settings.interval, Duration::from_millis(200));
        assert_eq!(settings.max_attempts, 10);
        assert_eq!(settings.deadline, Duration::from_secs(2));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_correlation_mode() {
        assert_eq!(correlation_mode(config().polling.correlation), CorrelationMode::Shared);
        assert_eq!(
            correlation_mode(CorrelationSetting::default()),
            CorrelationMode::Correlated
        );
    }

    #[test]
    fn test_default_queues_match_bridge_defaults() {
        let families = config().families;
        assert_eq!(
            queue_descriptor(&families.composition),
            QueueDescriptor::default_for(JobFamily::Composition)
        );
        assert_eq!(
            queue_descriptor(&families.porosity),
            QueueDescriptor::default_for(JobFamily::Porosity)
        );
    }

    #[test]
    fn test_server_config_override() {
        let gateway = config().gateway;

        let server = server_config(&gateway, None);
        assert_eq!(server.host, "127.0.0.1");
        assert_eq!(server.http_port, 8080);
        assert_eq!(server.request_timeout, Duration::from_secs(12));

        assert_eq!(server_config(&gateway, Some(9001)).http_port, 9001);
    }
}

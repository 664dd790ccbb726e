//! Assembly of the gateway router

use axum::Router;
use bridge::{redact_uri, AnalysisStateBuilder, Broker, JobFamily, QueueDescriptor};
use config::{BrokerKind, LabgateConfig};
use passthrough::{passthrough_routes, BackendForwarder};
use server::{health_routes, HealthClient, HealthState, HttpProbe};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::broker::BrokerProbe;
use crate::error::Result;
use crate::settings::{correlation_mode, poll_settings, queue_descriptor};

/// Queue descriptors of both families, composition first
pub fn family_descriptors(config: &LabgateConfig) -> [QueueDescriptor; 2] {
    [
        queue_descriptor(&config.families.composition),
        queue_descriptor(&config.families.porosity),
    ]
}

/// Build the full application router: analysis endpoints, backend
/// passthrough and health.
///
/// `shutdown` is the server's root token; in-flight polls run under
/// children of it and end with a cancellation outcome when it fires.
/// Middleware is added by `HttpServer`, not here.
pub fn build_app(
    config: &LabgateConfig,
    broker: Arc<dyn Broker>,
    shutdown: CancellationToken,
) -> Result<Router> {
    let [composition, porosity] = family_descriptors(config);
    let polling = &config.polling;

    let analysis = AnalysisStateBuilder::new(broker.clone())
        .poll_settings(poll_settings(polling))
        .correlation(correlation_mode(polling.correlation))
        .mailbox(polling.mailbox_capacity(), polling.mailbox_ttl())
        .idempotency_ttl(polling.idempotency_ttl())
        .descriptor(JobFamily::Composition, composition)
        .descriptor(JobFamily::Porosity, porosity)
        .shutdown(shutdown)
        .build()?;

    let forwarder = BackendForwarder::new(&config.backend.base_uri, config.backend.timeout())?;

    let broker_address = match config.broker.kind {
        BrokerKind::Amqp => redact_uri(&config.broker.uri),
        BrokerKind::Memory => "in-process".to_string(),
    };
    let health = HealthState::new(config.gateway.name.clone())
        .with_probe(Arc::new(BrokerProbe::new(broker, broker_address)))
        .with_probe(Arc::new(HttpProbe::new(
            "backend",
            config.backend.base_uri.clone(),
            HealthClient::new(config.backend.timeout())?,
        )));

    info!(
        backend = %forwarder.base_url(),
        correlation = ?polling.correlation,
        "Gateway routes assembled"
    );

    Ok(Router::new()
        .merge(bridge::create_router(analysis))
        .merge(passthrough_routes(forwarder))
        .merge(health_routes(Arc::new(health))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use bridge::InMemoryBroker;
    use serde_json::Value;
    use tower::ServiceExt;

    fn config() -> LabgateConfig {
        config::parse_config(
            r#"
gateway:
  name: labgate-test
  http_port: 8080
backend:
  base_uri: http://127.0.0.1:1
  timeout_seconds: 1
broker:
  kind: memory
polling:
  interval_ms: 10
  max_attempts: 5
  deadline_ms: 50
"#,
        )
        .unwrap()
    }

    fn app() -> Router {
        let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new());
        build_app(&config(), broker, CancellationToken::new()).unwrap()
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_liveness() {
        let (status, body) = call(app(), Request::get("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "labgate-test");
    }

    #[tokio::test]
    async fn test_detailed_health_is_degraded_without_backend() {
        let (status, body) = call(
            app(),
            Request::get("/health/detailed").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let connections = body["connections"].as_array().unwrap();
        assert_eq!(connections.len(), 2);
        assert_eq!(connections[0]["connected"], true);
        assert_eq!(connections[1]["service"], "backend");
        assert_eq!(connections[1]["connected"], false);
    }

    #[tokio::test]
    async fn test_passthrough_is_mounted() {
        let (status, body) = call(app(), Request::get("/products").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to reach backend"));
    }

    #[tokio::test]
    async fn test_analysis_is_mounted() {
        let (status, body) = call(
            app(),
            Request::get("/composition/analyze").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "processing");
        assert_eq!(body["message"], bridge::outcome::PROCESSING_MESSAGE);
    }

    #[test]
    fn test_shared_response_queue_is_rejected() {
        let mut config = config();
        config.families.porosity.response_queue = config.families.composition.response_queue.clone();

        let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new());
        let result = build_app(&config, broker, CancellationToken::new());
        assert!(matches!(result, Err(crate::GatewayError::Bridge(_))));
    }
}

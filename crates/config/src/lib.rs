//! Configuration model for labgate
//!
//! A single YAML file configures the HTTP surface, the backend the CRUD
//! routes forward to, the message broker, result polling, the queue layout
//! of each job family, logging and metrics. `${VAR}` placeholders are
//! substituted from the environment before parsing.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LabgateConfig {
    pub gateway: GatewayConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub families: FamiliesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_name")]
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Server-level ceiling; must exceed the poll deadline
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_seconds
                .unwrap_or_else(default_request_timeout_seconds),
        )
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes.unwrap_or_else(default_max_upload_bytes)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    pub base_uri: String,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(
            self.timeout_seconds
                .unwrap_or_else(default_backend_timeout_seconds),
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerKind {
    /// RabbitMQ over AMQP 0-9-1
    #[default]
    Amqp,
    /// In-process broker for local runs without RabbitMQ
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub kind: BrokerKind,
    #[serde(default = "default_broker_uri")]
    pub uri: String,
    /// Declare exchanges, queues and bindings at startup
    #[serde(default = "default_enabled")]
    pub declare_topology: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            kind: BrokerKind::default(),
            uri: default_broker_uri(),
            declare_topology: default_enabled(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationSetting {
    /// Replies are matched to requests by correlation id
    #[default]
    Correlated,
    /// Any request takes the next reply on the queue
    Shared,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PollingConfig {
    #[serde(default)]
    pub interval_ms: Option<u64>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub deadline_ms: Option<u64>,
    #[serde(default)]
    pub correlation: CorrelationSetting,
    #[serde(default)]
    pub idempotency_ttl_seconds: Option<u64>,
    #[serde(default)]
    pub mailbox_capacity: Option<usize>,
    /// How long a parked reply waits for its owner
    #[serde(default)]
    pub mailbox_ttl_seconds: Option<u64>,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.unwrap_or_else(default_poll_interval_ms))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or_else(default_max_attempts)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms.unwrap_or_else(default_poll_deadline_ms))
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::from_secs(
            self.idempotency_ttl_seconds
                .unwrap_or_else(default_idempotency_ttl_seconds),
        )
    }

    pub fn mailbox_capacity(&self) -> usize {
        self.mailbox_capacity.unwrap_or_else(default_mailbox_capacity)
    }

    pub fn mailbox_ttl(&self) -> Duration {
        Duration::from_secs(self.mailbox_ttl_seconds.unwrap_or_else(default_mailbox_ttl_seconds))
    }
}

/// Broker names of one job family
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FamilyQueues {
    pub exchange: String,
    pub routing_key: String,
    pub request_queue: String,
    pub response_queue: String,
    pub response_routing_key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FamiliesConfig {
    #[serde(default = "default_composition_queues")]
    pub composition: FamilyQueues,
    #[serde(default = "default_porosity_queues")]
    pub porosity: FamilyQueues,
}

impl Default for FamiliesConfig {
    fn default() -> Self {
        Self {
            composition: default_composition_queues(),
            porosity: default_porosity_queues(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// pretty | json | compact
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

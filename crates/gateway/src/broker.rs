//! Broker selection and its health probe

use async_trait::async_trait;
use bridge::{Broker, InMemoryBroker, QueueDescriptor};
use config::{BrokerConfig, BrokerKind};
use server::{ConnectionStatus, HealthProbe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::Result;
#[cfg(not(feature = "amqp"))]
use crate::error::GatewayError;

/// Connect the configured broker and, if asked to, declare the families' topology.
pub async fn connect_broker(
    config: &BrokerConfig,
    descriptors: &[QueueDescriptor],
) -> Result<Arc<dyn Broker>> {
    let broker: Arc<dyn Broker> = match config.kind {
        BrokerKind::Memory => {
            warn!("Using the in-memory broker; jobs stay inside this process");
            Arc::new(InMemoryBroker::new())
        }
        BrokerKind::Amqp => amqp_broker(&config.uri).await?,
    };

    // The in-memory broker needs its bindings to route anything
    if config.declare_topology || config.kind == BrokerKind::Memory {
        broker.declare_topology(descriptors).await?;
        info!(
            broker = broker.name(),
            families = descriptors.len(),
            "Broker topology declared"
        );
    }

    Ok(broker)
}

#[cfg(feature = "amqp")]
async fn amqp_broker(uri: &str) -> Result<Arc<dyn Broker>> {
    Ok(Arc::new(bridge::AmqpBroker::connect(uri).await?))
}

#[cfg(not(feature = "amqp"))]
async fn amqp_broker(_uri: &str) -> Result<Arc<dyn Broker>> {
    Err(GatewayError::UnsupportedBroker("amqp"))
}

/// Reports the broker connection on `GET /health/detailed`
pub struct BrokerProbe {
    broker: Arc<dyn Broker>,
    address: String,
}

impl BrokerProbe {
    pub fn new(broker: Arc<dyn Broker>, address: impl Into<String>) -> Self {
        Self {
            broker,
            address: address.into(),
        }
    }
}

#[async_trait]
impl HealthProbe for BrokerProbe {
    async fn check(&self) -> ConnectionStatus {
        let start = Instant::now();
        let service = format!("broker ({})", self.broker.name());

        if self.broker.is_connected() {
            ConnectionStatus::up(service, &self.address, start.elapsed())
        } else {
            ConnectionStatus::down(service, &self.address, None, "connection closed")
        }
    }
}

//! Broker trait - protocol agnostic

use async_trait::async_trait;

use crate::error::BridgeResult;
use crate::family::QueueDescriptor;

/// A message about to be published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub body: Vec<u8>,
    pub content_type: String,
    pub correlation_id: Option<String>,
    pub message_id: Option<String>,
}

impl OutboundMessage {
    pub fn json(body: Vec<u8>) -> Self {
        Self {
            body,
            content_type: "application/json".to_string(),
            correlation_id: None,
            message_id: None,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }
}

/// A message fetched from a response queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub body: Vec<u8>,
    pub correlation_id: Option<String>,
}

impl InboundMessage {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            correlation_id: None,
        }
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Client trait for the message broker
#[async_trait]
pub trait Broker: Send + Sync {
    /// Short adapter name for logs and health output
    fn name(&self) -> &str;

    /// Hand a message to the broker. Returns once the broker accepted it.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: OutboundMessage,
    ) -> BridgeResult<()>;

    /// Fetch at most one message from `queue` without waiting for one to arrive
    async fn receive_no_wait(&self, queue: &str) -> BridgeResult<Option<InboundMessage>>;

    /// Declare exchanges, queues and bindings for the given families
    async fn declare_topology(&self, descriptors: &[QueueDescriptor]) -> BridgeResult<()>;

    /// Whether the underlying connection is usable
    fn is_connected(&self) -> bool;
}

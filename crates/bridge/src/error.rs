//! Bridge error types

use thiserror::Error;

/// Errors that can occur while bridging an analysis request to the broker
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The inbound request is unusable (missing payload, both payloads, wrong media type)
    #[error("{0}")]
    ClientInput(String),

    /// Publish or receive failed at the broker
    #[error("Broker error: {0}")]
    Broker(String),

    /// A message could not be encoded or decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid bridge configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Create a client input error
    pub fn client_input(msg: impl Into<String>) -> Self {
        Self::ClientInput(msg.into())
    }

    /// Create a broker error
    pub fn broker(msg: impl Into<String>) -> Self {
        Self::Broker(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether the caller caused this error (maps to 400)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ClientInput(_))
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

#[cfg(feature = "amqp")]
impl From<lapin::Error> for BridgeError {
    fn from(e: lapin::Error) -> Self {
        Self::Broker(e.to_string())
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

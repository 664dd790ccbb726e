//! Errors raised while bringing the gateway's listener up or down

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    /// A port failed the pre-bind availability check
    #[error("{purpose} port {port} is not available: {reason}")]
    PortUnavailable {
        purpose: String,
        port: u16,
        reason: String,
    },

    #[error("Failed to bind the gateway listener to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    /// The listener failed after it was bound
    #[error("Gateway listener failed: {0}")]
    Serve(#[source] io::Error),

    #[error("Failed to build the health check client: {0}")]
    HealthClient(#[from] reqwest::Error),
}

impl ServerError {
    pub fn bind(address: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }

    pub fn port_unavailable(purpose: impl Into<String>, port: u16, reason: impl Into<String>) -> Self {
        Self::PortUnavailable {
            purpose: purpose.into(),
            port,
            reason: reason.into(),
        }
    }
}

//! Server configuration
//!
//! This module provides the HTTP server configuration and the default
//! port assignments of the gateway and its collaborators.

use crate::error::{Result, ServerError};
use std::net::SocketAddr;
use std::time::Duration;

/// Default port assignments
pub mod ports {
    /// Gateway HTTP port
    pub const GATEWAY_HTTP: u16 = 8080;
    /// Backend REST service the gateway forwards to
    pub const BACKEND_HTTP: u16 = 8081;
    /// Prometheus exporter
    pub const METRICS: u16 = 9090;
    /// RabbitMQ AMQP listener
    pub const AMQP: u16 = 5672;
}

/// Default server-level request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default maximum request body size (multipart uploads included)
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// HTTP server configuration
///
/// # Example
///
/// ```
/// use server::config::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::new("127.0.0.1", 8080)
///     .with_request_timeout(Duration::from_secs(15))
///     .with_max_body_bytes(5 * 1024 * 1024);
/// assert_eq!(config.http_port, 8080);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// HTTP port; 0 asks the OS for an ephemeral port
    pub http_port: u16,
    /// Hard ceiling on the time a request may take
    pub request_timeout: Duration,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, http_port: u16) -> Self {
        Self {
            host: host.into(),
            http_port,
            ..Self::default()
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    /// Get HTTP socket address
    pub fn http_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.http_port)
            .parse()
            .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", self.host, self.http_port)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: ports::GATEWAY_HTTP,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

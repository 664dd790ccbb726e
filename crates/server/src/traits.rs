//! Server lifecycle traits
//!
//! [`Server`] is the interface the binary drives.

use async_trait::async_trait;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// A long-running network server with cooperative shutdown.
///
/// # Implementors
///
/// - [`HttpServer`](crate::http::HttpServer) - HTTP server using Axum
#[async_trait]
pub trait Server: Send + Sync + 'static {
    /// Name for logging and identification
    fn name(&self) -> &str;

    /// Address the server is bound to, `None` until it has bound
    fn address(&self) -> Option<SocketAddr>;

    fn is_running(&self) -> bool;

    /// Bind, serve until `shutdown` is cancelled, drain, and return `Ok(())`
    /// on a clean stop.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or hits a fatal I/O error.
    async fn run(&self, shutdown: CancellationToken) -> Result<()>;
}

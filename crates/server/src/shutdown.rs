//! Graceful shutdown coordination using `CancellationToken`
//!
//! One root token is cancelled on Ctrl+C or SIGTERM. The HTTP server drains
//! on it, and every in-flight analysis poll holds a child of it, so polls end
//! with a cancellation outcome instead of being cut off mid-response.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Coordinates graceful shutdown across the server and request-scoped work.
///
/// # Example
///
/// ```ignore
/// let shutdown = ShutdownController::with_signals();
///
/// let state = AnalysisStateBuilder::new(broker)
///     .shutdown(shutdown.token())
///     .build()?;
///
/// server.run(shutdown.token()).await?;
/// ```
#[derive(Clone)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownController {
    /// Create a controller that only shuts down when asked to
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Create a controller that listens for Ctrl+C, and SIGTERM on unix
    ///
    /// This spawns a background task that cancels the token on the first signal.
    pub fn with_signals() -> Self {
        let controller = Self::new();
        let token = controller.token.clone();

        tokio::spawn(async move {
            wait_for_signal().await;
            token.cancel();
        });

        controller
    }

    /// Get a child token that will be cancelled when this controller is cancelled.
    ///
    /// Child tokens can also be cancelled independently without affecting the parent.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Get a clone of the root token
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Trigger shutdown manually
    pub fn shutdown(&self) {
        info!("Manual shutdown triggered");
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for shutdown to be triggered (signal or manual)
    pub async fn wait_for_shutdown(&self) {
        self.token.cancelled().await;
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_manual_shutdown_reaches_children() {
        let controller = ShutdownController::new();
        let token = controller.child_token();
        let request_scope = token.child_token();

        assert!(!controller.is_cancelled());
        controller.shutdown();

        assert!(controller.is_cancelled());
        assert!(token.is_cancelled());
        assert!(request_scope.is_cancelled());
    }

    #[tokio::test]
    async fn test_child_token_independence() {
        let controller = ShutdownController::new();
        let child1 = controller.child_token();
        let child2 = controller.child_token();

        child1.cancel();

        assert!(child1.is_cancelled());
        assert!(!child2.is_cancelled());
        assert!(!controller.is_cancelled());
    }

    #[tokio::test]
    async fn test_wait_for_shutdown() {
        let controller = ShutdownController::new();
        let trigger = controller.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.shutdown();
        });

        let waited = tokio::time::timeout(Duration::from_secs(1), controller.wait_for_shutdown()).await;
        assert!(waited.is_ok());
    }
}

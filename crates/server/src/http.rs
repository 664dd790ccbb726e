//! HTTP server implementation using Axum
//!
//! This module provides an HTTP server built on Axum, implementing the
//! [`Server`](crate::Server) trait for consistent lifecycle management.
//! Every router served here gets the standard middleware stack from
//! [`with_middleware`].

use async_trait::async_trait;
use axum::{body::Body, extract::DefaultBodyLimit, http::{HeaderName, Request}, Router};
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, Level};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::traits::Server;

/// Header carrying the per-request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Wrap a router with the standard middleware stack:
/// request ids, tracing, request timeout, CORS and a body size limit.
///
/// A request exceeding `request_timeout` gets `408 Request Timeout`; a body
/// larger than `max_body_bytes` gets `413 Payload Too Large`.
pub fn with_middleware(router: Router, config: &ServerConfig) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let trace = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    router
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(trace)
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(TimeoutLayer::new(config.request_timeout))
                .layer(CorsLayer::permissive()),
        )
}

/// HTTP server implementation using Axum
///
/// # Example
///
/// ```ignore
/// use server::{HttpServer, Server, ServerConfig, ShutdownController};
///
/// let shutdown = ShutdownController::with_signals();
/// let server = HttpServer::new(ServerConfig::new("127.0.0.1", 8080), router);
///
/// // Serves until Ctrl+C or SIGTERM, then drains in-flight requests
/// server.run(shutdown.token()).await?;
/// ```
#[derive(Clone)]
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
    running: Arc<AtomicBool>,
    bound_addr: Arc<RwLock<Option<SocketAddr>>>,
}

impl HttpServer {
    /// Create a new HTTP server; the middleware stack is applied here
    pub fn new(config: ServerConfig, router: Router) -> Self {
        let router = with_middleware(router, &config);
        Self {
            config,
            router,
            running: Arc::new(AtomicBool::new(false)),
            bound_addr: Arc::new(RwLock::new(None)),
        }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the router (for testing or inspection)
    pub fn router(&self) -> &Router {
        &self.router
    }
}

#[async_trait]
impl Server for HttpServer {
    fn name(&self) -> &str {
        "http"
    }

    fn address(&self) -> Option<SocketAddr> {
        *self.bound_addr.read()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn run(&self, shutdown_token: CancellationToken) -> Result<()> {
        let addr = self.config.http_addr()?;

        info!(%addr, "Starting HTTP server");

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::bind(addr.to_string(), e))?;

        let local_addr = listener.local_addr().map_err(ServerError::Serve)?;
        *self.bound_addr.write() = Some(local_addr);

        info!(%local_addr, "HTTP server listening");

        self.running.store(true, Ordering::SeqCst);

        // In-flight requests are drained before serve returns
        let result = axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(async move {
                shutdown_token.cancelled().await;
                info!("HTTP server received shutdown signal");
            })
            .await;

        self.running.store(false, Ordering::SeqCst);
        *self.bound_addr.write() = None;

        match result {
            Ok(()) => {
                info!("HTTP server shutdown complete");
                Ok(())
            }
            Err(e) => {
                error!(%e, "HTTP server error");
                Err(ServerError::Serve(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Bytes, http::StatusCode, routing::{get, post}};
    use std::time::Duration;
    use tower::ServiceExt as _;

    fn test_router() -> Router {
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    "late"
                }),
            )
            .route("/upload", post(|body: Bytes| async move { body.len().to_string() }))
    }

    #[tokio::test]
    async fn test_http_server_serves_and_shuts_down() {
        let server = HttpServer::new(ServerConfig::new("127.0.0.1", 0), test_router());
        let probe = server.clone();
        let token = CancellationToken::new();
        let handle = tokio::spawn({
            let token = token.clone();
            async move { server.run(token).await }
        });

        let mut addr = None;
        for _ in 0..50 {
            addr = probe.address();
            if addr.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let addr = addr.expect("server should bind");
        assert!(probe.is_running());

        let response = reqwest::get(format!("http://{addr}/ping")).await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));

        token.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(result.is_ok(), "Server should shutdown within timeout");
        assert!(!probe.is_running());
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let router = with_middleware(test_router(), &ServerConfig::default());
        let request = Request::builder()
            .uri("/ping")
            .header(REQUEST_ID_HEADER, "abc-123")
            .body(Body::empty())
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "abc-123");
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout() {
        let config = ServerConfig::default().with_request_timeout(Duration::from_secs(1));
        let router = with_middleware(test_router(), &config);
        let request = Request::builder().uri("/slow").body(Body::empty()).unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let config = ServerConfig::default().with_max_body_bytes(16);
        let router = with_middleware(test_router(), &config);
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .body(Body::from(vec![0u8; 64]))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_http_server_name() {
        let server = HttpServer::new(ServerConfig::new("127.0.0.1", 8080), Router::new());
        assert_eq!(server.name(), "http");
    }
}

//! Health check endpoints and dependency probes

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;

/// Connection status of one dependency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub service: String,
    pub address: String,
    pub connected: bool,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

impl ConnectionStatus {
    pub fn up(service: impl Into<String>, address: impl Into<String>, latency: Duration) -> Self {
        Self {
            service: service.into(),
            address: address.into(),
            connected: true,
            latency_ms: Some(latency.as_millis() as u64),
            error: None,
        }
    }

    pub fn down(
        service: impl Into<String>,
        address: impl Into<String>,
        latency: Option<Duration>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            address: address.into(),
            connected: false,
            latency_ms: latency.map(|d| d.as_millis() as u64),
            error: Some(error.into()),
        }
    }
}

/// A dependency checked by `GET /health/detailed`
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self) -> ConnectionStatus;
}

/// Shared state for health checks
#[derive(Clone)]
pub struct HealthState {
    pub service_name: String,
    pub start_time: Instant,
    probes: Vec<Arc<dyn HealthProbe>>,
}

impl HealthState {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            start_time: Instant::now(),
            probes: Vec::new(),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Run every probe concurrently
    pub async fn check_all(&self) -> Vec<ConnectionStatus> {
        futures::future::join_all(self.probes.iter().map(|p| p.check())).await
    }
}

/// Liveness: the process is up and serving
pub async fn health_handler(State(state): State<Arc<HealthState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
    }))
}

/// Readiness: every dependency probe must pass, otherwise 503
pub async fn detailed_health_handler(
    State(state): State<Arc<HealthState>>,
) -> (StatusCode, Json<Value>) {
    let connections = state.check_all().await;

    let all_healthy = connections.iter().all(|c| c.connected);
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let health = json!({
        "status": if all_healthy { "healthy" } else { "degraded" },
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
        "connections": connections,
        "healthy": all_healthy,
    });

    (status_code, Json(health))
}

/// Create health check router
pub fn health_routes(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/health/detailed", get(detailed_health_handler))
        .with_state(state)
}

/// HTTP client for health checks, shared across probes
#[derive(Clone)]
pub struct HealthClient {
    client: reqwest::Client,
}

impl HealthClient {
    /// Create a new health client with the specified timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Probe an HTTP endpoint. Any answer below 500 counts as reachable:
    /// the backend has no dedicated health route, a 404 still proves it is up.
    pub async fn check_http(&self, service_name: &str, url: &str) -> ConnectionStatus {
        let start = Instant::now();

        match self.client.get(url).send().await {
            Ok(response) if response.status().is_server_error() => ConnectionStatus::down(
                service_name,
                url,
                Some(start.elapsed()),
                format!("HTTP {}", response.status()),
            ),
            Ok(_) => ConnectionStatus::up(service_name, url, start.elapsed()),
            Err(e) => ConnectionStatus::down(service_name, url, Some(start.elapsed()), e.to_string()),
        }
    }
}

/// Probe for an HTTP dependency
pub struct HttpProbe {
    name: String,
    url: String,
    client: HealthClient,
}

impl HttpProbe {
    pub fn new(name: impl Into<String>, url: impl Into<String>, client: HealthClient) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn check(&self) -> ConnectionStatus {
        self.client.check_http(&self.name, &self.url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct FixedProbe(bool);

    #[async_trait]
    impl HealthProbe for FixedProbe {
        async fn check(&self) -> ConnectionStatus {
            if self.0 {
                ConnectionStatus::up("broker", "memory", Duration::ZERO)
            } else {
                ConnectionStatus::down("backend", "http://localhost:8081", None, "Connection refused")
            }
        }
    }

    async fn get_status(state: HealthState, uri: &str) -> StatusCode {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        health_routes(Arc::new(state))
            .oneshot(request)
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_detailed_health_reports_degraded() {
        let healthy = HealthState::new("labgate").with_probe(Arc::new(FixedProbe(true)));
        assert_eq!(get_status(healthy, "/health/detailed").await, StatusCode::OK);

        let degraded = HealthState::new("labgate")
            .with_probe(Arc::new(FixedProbe(true)))
            .with_probe(Arc::new(FixedProbe(false)));
        assert_eq!(degraded.check_all().await.len(), 2);
        assert_eq!(
            get_status(degraded.clone(), "/health/detailed").await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        // Liveness ignores dependencies
        assert_eq!(get_status(degraded, "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_http_probe_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HealthClient::new(Duration::from_secs(1)).unwrap();
        let probe = HttpProbe::new("backend", format!("http://{addr}/"), client);
        let status = probe.check().await;

        assert!(!status.connected);
        assert!(status.error.is_some());
    }
}

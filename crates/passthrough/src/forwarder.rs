//! HTTP client that relays requests to the backend service.

use axum::body::Bytes;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use observability::ForwardMetrics;
use std::time::{Duration, Instant};
use tracing::{debug, error};

use crate::error::{ForwardError, Result};

/// Relays requests to the backend and hands its answer back unchanged.
#[derive(Clone)]
pub struct BackendForwarder {
    client: reqwest::Client,
    base_url: String,
    metrics: ForwardMetrics,
}

impl BackendForwarder {
    /// Create a forwarder pointing at `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ForwardError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            metrics: ForwardMetrics::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `method path_and_query` with `body` to the backend.
    ///
    /// The backend's status, body and content type are relayed as they are,
    /// error statuses included. Only transport failures become a
    /// [`ForwardError`].
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        content_type: Option<&HeaderValue>,
        body: Bytes,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path_and_query);
        debug!(%method, %url, "Forwarding request to backend");

        let mut request = self.client.request(method, &url);
        if let Some(content_type) = content_type {
            request = request.header(CONTENT_TYPE, content_type.clone());
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let started = Instant::now();
        let upstream = request.send().await.map_err(|e| {
            error!(%url, "Failed to reach backend: {}", e);
            self.metrics.backend_unreachable();
            ForwardError::Unreachable(e)
        })?;

        let status = upstream.status();
        let upstream_type = upstream.headers().get(CONTENT_TYPE).cloned();
        let bytes = upstream.bytes().await.map_err(|e| {
            error!(%url, "Failed to read backend response: {}", e);
            self.metrics.backend_unreachable();
            ForwardError::BadResponse(e)
        })?;

        self.metrics.record_request(started.elapsed(), status.as_u16());
        debug!(status = status.as_u16(), bytes = bytes.len(), "Backend answered");

        let mut response = (status, bytes).into_response();
        match upstream_type {
            Some(value) => {
                response.headers_mut().insert(CONTENT_TYPE, value);
            }
            None => {
                response.headers_mut().remove(CONTENT_TYPE);
            }
        }
        Ok(response)
    }
}

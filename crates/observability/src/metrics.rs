//! Prometheus metrics infrastructure
//!
//! This module provides utilities for initializing the Prometheus exporter
//! and the metric sets used by the bridge and the backend forwarder.

use metrics::{counter, histogram, Counter, Histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Initialize the Prometheus metrics exporter
///
/// This starts an HTTP listener on the specified port that exposes metrics
/// at the `/metrics` endpoint.
///
/// # Example
///
/// ```ignore
/// observability::metrics::init_metrics(9090)?;
/// // Metrics available at http://localhost:9090/metrics
/// ```
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Per-family bridge metrics
///
/// # Metrics
///
/// * `bridge_jobs_published_total` - Jobs accepted by the broker
/// * `bridge_publish_failures_total` - Publish attempts that failed
/// * `bridge_broker_receives_total` - Non-blocking receive attempts
/// * `bridge_outcomes_total{outcome}` - Terminal request outcomes
/// * `bridge_poll_duration_seconds` - Time spent polling per request
///
/// All metrics carry a `family` label.
#[derive(Clone)]
pub struct BridgeMetrics {
    family: String,
    jobs_published: Counter,
    publish_failures: Counter,
    broker_receives: Counter,
    poll_duration: Histogram,
}

impl BridgeMetrics {
    /// Create metrics for a job family (e.g. "composition", "porosity")
    pub fn new(family: &str) -> Self {
        let name = family.to_string();

        Self {
            jobs_published: counter!("bridge_jobs_published_total", "family" => name.clone()),
            publish_failures: counter!("bridge_publish_failures_total", "family" => name.clone()),
            broker_receives: counter!("bridge_broker_receives_total", "family" => name.clone()),
            poll_duration: histogram!("bridge_poll_duration_seconds", "family" => name.clone()),
            family: name,
        }
    }

    pub fn job_published(&self) {
        self.jobs_published.increment(1);
    }

    pub fn publish_failed(&self) {
        self.publish_failures.increment(1);
    }

    pub fn broker_receive(&self) {
        self.broker_receives.increment(1);
    }

    /// Count a terminal outcome by its label ("completed", "timed_out", ...)
    pub fn record_outcome(&self, outcome: &'static str) {
        counter!(
            "bridge_outcomes_total",
            "family" => self.family.clone(),
            "outcome" => outcome
        )
        .increment(1);
    }

    pub fn record_poll(&self, elapsed: Duration) {
        self.poll_duration.record(elapsed.as_secs_f64());
    }

    /// Get the family label
    pub fn family(&self) -> &str {
        &self.family
    }
}

/// Metrics for requests forwarded to the backend service
///
/// * `passthrough_requests_total{status}` - Forwarded requests by backend status
/// * `passthrough_request_duration_seconds` - Backend round-trip time
/// * `passthrough_backend_errors_total` - Requests that never reached the backend
#[derive(Clone)]
pub struct ForwardMetrics {
    request_duration: Histogram,
    backend_errors: Counter,
}

impl ForwardMetrics {
    pub fn new() -> Self {
        Self {
            request_duration: histogram!("passthrough_request_duration_seconds"),
            backend_errors: counter!("passthrough_backend_errors_total"),
        }
    }

    /// Record a request the backend answered
    pub fn record_request(&self, duration: Duration, status_code: u16) {
        counter!("passthrough_requests_total", "status" => status_code.to_string()).increment(1);
        self.request_duration.record(duration.as_secs_f64());
    }

    /// Record a request that failed before the backend answered
    pub fn backend_unreachable(&self) {
        self.backend_errors.increment(1);
    }
}

impl Default for ForwardMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_metrics_creation() {
        // No recorder installed: recording is a no-op and must not panic
        let metrics = BridgeMetrics::new("composition");
        assert_eq!(metrics.family(), "composition");

        metrics.job_published();
        metrics.broker_receive();
        metrics.record_outcome("completed");
        metrics.record_poll(Duration::from_millis(250));
    }

    #[test]
    fn test_forward_metrics_creation() {
        let metrics = ForwardMetrics::default();
        metrics.record_request(Duration::from_millis(5), 200);
        metrics.backend_unreachable();
    }
}

//! Observability infrastructure for labgate
//!
//! This crate provides:
//! - Structured logging via tracing
//! - Prometheus metrics
//! - Bridge and backend-forwarding metric sets
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("labgate", LogFormat::Pretty, "info")?;
//! observability::metrics::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{init_metrics, BridgeMetrics, ForwardMetrics};

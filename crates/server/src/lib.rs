//! Server infrastructure for labgate
//!
//! This crate provides the HTTP server, its middleware stack, health
//! endpoints, and graceful shutdown.
//!
//! # Architecture
//!
//! [`HttpServer`] implements the [`Server`] trait and serves an Axum router
//! wrapped by [`http::with_middleware`]. Shutdown uses one root
//! `CancellationToken` from [`ShutdownController`]; cancelling it stops the
//! listener and every child token handed to request-scoped work.
//!
//! # Modules
//!
//! - [`config`] - Server configuration and port constants
//! - [`traits`] - `Server` trait
//! - [`http`] - HTTP server and middleware
//! - [`health`] - Health endpoints and dependency probes
//! - [`shutdown`] - Graceful shutdown
//! - [`port_validator`] - Startup port checks

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod port_validator;
pub mod shutdown;
pub mod traits;

pub use config::{ports, ServerConfig};
pub use error::{Result, ServerError};
pub use health::{health_routes, ConnectionStatus, HealthClient, HealthProbe, HealthState, HttpProbe};
pub use http::{with_middleware, HttpServer, REQUEST_ID_HEADER};
pub use port_validator::validate_ports_available;
pub use shutdown::ShutdownController;
pub use traits::Server;

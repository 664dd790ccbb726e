//! labgate application assembly
//!
//! Maps the configuration model onto the bridge, passthrough and health
//! components and merges them into one `axum::Router`:
//!
//! | Routes | Component |
//! |---|---|
//! | `POST/GET /composition/analyze`, `POST /analyze` | `bridge` |
//! | `/products/...`, `/users/...`, `/hairtypes/...` | `passthrough` |
//! | `/health`, `/health/detailed` | `server::health` |

pub mod app;
pub mod broker;
pub mod error;
pub mod settings;

pub use app::{build_app, family_descriptors};
pub use broker::{connect_broker, BrokerProbe};
pub use error::{GatewayError, Result};
pub use settings::server_config;

//! Backend passthrough
//!
//! Product, review, user, favourite and hair-type CRUD belongs to the
//! backend service. The gateway only relays those routes: method, path,
//! query, body and content type go out unchanged and the backend's status,
//! body and content type come back unchanged. A backend that cannot be
//! reached yields `502 {"error": "Failed to reach backend: ..."}`.

pub mod error;
pub mod forwarder;
pub mod routes;

pub use error::{ForwardError, Result};
pub use forwarder::BackendForwarder;
pub use routes::passthrough_routes;

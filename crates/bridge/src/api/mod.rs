//! HTTP surface of the bridge
//!
//! - `POST /composition/analyze` - image or text, polled to completion
//! - `GET /composition/analyze` - single non-blocking result check
//! - `POST /analyze` - porosity analysis, image only

pub mod handlers;
pub mod input;
pub mod routes;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::outcome::AnalysisResponse;

pub use handlers::{AnalysisState, AnalysisStateBuilder, FamilyBridge};
pub use routes::create_router;

impl IntoResponse for AnalysisResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}

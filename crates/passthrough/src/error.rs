use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForwardError {
    /// Connection refused, DNS failure, timeout: the backend never answered
    #[error("Failed to reach backend: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// The backend answered but its body could not be read
    #[error("Failed to read backend response: {0}")]
    BadResponse(#[source] reqwest::Error),

    #[error("Failed to build backend client: {0}")]
    Client(#[source] reqwest::Error),
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

pub type Result<T> = std::result::Result<T, ForwardError>;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;

use crate::error::ForwardError;
use crate::forwarder::BackendForwarder;

/// Backend CRUD routes, each relayed verbatim to the backend.
pub fn passthrough_routes(forwarder: BackendForwarder) -> Router {
    let state = Arc::new(forwarder);

    Router::new()
        .route("/products", get(forward_request))
        .route("/products/:product_id", get(forward_request))
        .route(
            "/products/:product_id/reviews",
            get(forward_request).post(forward_request),
        )
        .route(
            "/products/:product_id/reviews/:review_id",
            axum::routing::put(forward_request).delete(forward_request),
        )
        .route(
            "/products/:product_id/is_favourite/:user_id",
            get(forward_request),
        )
        .route("/users", post(forward_request))
        .route(
            "/users/:user_id",
            get(forward_request).put(forward_request).delete(forward_request),
        )
        .route(
            "/users/:user_id/favourites",
            get(forward_request).post(forward_request),
        )
        .route(
            "/users/:user_id/favourites/:product_id",
            delete(forward_request),
        )
        .route("/hairtypes", post(forward_request))
        .route(
            "/hairtypes/:user_id",
            get(forward_request).put(forward_request).delete(forward_request),
        )
        .with_state(state)
}

async fn forward_request(
    State(forwarder): State<Arc<BackendForwarder>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ForwardError> {
    let path_and_query = uri
        .path_and_query()
        .map_or_else(|| uri.path(), |pq| pq.as_str());

    forwarder
        .forward(method, path_and_query, headers.get(CONTENT_TYPE), body)
        .await
}

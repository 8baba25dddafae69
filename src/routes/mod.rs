// src/routes/mod.rs
//! Read API gateway.
//!
//! Each sibling module owns one endpoint and exports a subrouter generic over
//! the store. This module is the only one `main.rs` (and the tests) talk to:
//! it merges the subrouters, attaches the store as shared state and wraps
//! everything in the request logger (EMBP: single gateway call).

use std::time::Instant;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;

use crate::store::{StoreError, WeatherStore};

mod health;
mod observations;
mod stats;

// ---

/// Build the complete API router over `store`.
///
/// # Returns
/// A stateless [`Router`] serving `/api/weather`, `/api/weather/stats` and
/// `/health`, ready for `axum::serve`.
///
/// # Type Parameters
/// - `S`: Store backing every route; cloned into each request.
pub fn router<S: WeatherStore>(store: S) -> Router {
    // ---
    Router::new()
        .merge(observations::router::<S>())
        .merge(stats::router::<S>())
        .merge(health::router::<S>())
        .layer(middleware::from_fn(log_request))
        .with_state(store)
}

/// Log one line per request with its status and latency.
async fn log_request(req: Request, next: Next) -> Response {
    // ---
    let method = req.method().clone();
    let uri = req.uri().clone();
    let started = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        "\"{} {}\" {} {:.1}ms",
        method,
        uri,
        response.status().as_u16(),
        started.elapsed().as_secs_f64() * 1000.0
    );
    response
}

/// Store failures surfaced to HTTP clients as a bare 500.
///
/// The underlying error is logged server-side; the response body is always
/// `{"error": "Internal server error"}`.
#[derive(Debug)]
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        tracing::error!("Request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal server error" })),
        )
            .into_response()
    }
}

// src/routes/health.rs
//! Health check endpoint for the weather read API.
//!
//! Defines the `/health` route used by container orchestrators and CI to
//! decide whether the service can answer requests. Unlike a bare liveness
//! check it asks the store for a round trip, so a service that has lost its
//! database reports `503` instead of `200`.
//!
//! Follows the Explicit Module Boundary Pattern (EMBP):
//! - Internal to this file: the handler and its response type
//! - Exports to the gateway (`mod.rs`): a subrouter containing `/health`

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::store::WeatherStore;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Handle `GET /health`.
///
/// Returns `200 {"status":"ok"}` when the store answers a ping and
/// `503 {"status":"unavailable"}` otherwise. The failure reason is logged,
/// never returned.
async fn health<S: WeatherStore>(State(store): State<S>) -> (StatusCode, Json<HealthResponse>) {
    // ---
    match store.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "ok" })),
        Err(e) => {
            tracing::warn!("Health check failed ({} store): {}", store.backend_name(), e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                }),
            )
        }
    }
}

/// Create a subrouter containing the `/health` route.
///
/// # Returns
/// A [`Router<S>`] with a single GET `/health` route, still waiting for its
/// state; the gateway supplies it with `with_state`.
///
/// # Type Parameters
/// - `S`: Store shared by all routes in the gateway (`PgStore` in
///   production, `MemoryStore` in tests).
pub fn router<S: WeatherStore>() -> Router<S> {
    Router::new().route("/health", get(health::<S>))
}

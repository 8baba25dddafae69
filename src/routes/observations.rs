// src/routes/observations.rs
//! Daily observation listing for the weather read API.
//!
//! `GET /api/weather` returns `weather_data` rows one page at a time,
//! optionally narrowed to a station and/or an exact date. Filters combine
//! with AND; a filter that matches nothing yields an empty page with
//! `total = 0`, not an error.
//!
//! Follows the Explicit Module Boundary Pattern (EMBP):
//! - Internal to this file: the handler and its query type
//! - Exports to the gateway (`mod.rs`): a subrouter containing `/api/weather`

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use super::ApiError;
use crate::store::WeatherStore;
use crate::{Observation, ObservationFilter, Page, PageRequest};

// ---

/// Create a subrouter containing the `/api/weather` route.
///
/// # Returns
/// A [`Router<S>`] with a single GET `/api/weather` route.
///
/// # Type Parameters
/// - `S`: Store the handler reads from, supplied by the gateway.
pub fn router<S: WeatherStore>() -> Router<S> {
    // ---
    Router::new().route("/api/weather", get(handler::<S>))
}

/// Query parameters for filtering observations
#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    station_id: Option<String>,
    /// Exact day, `YYYY-MM-DD`
    date: Option<NaiveDate>,
    page: Option<i64>,
    per_page: Option<i64>,
}

async fn handler<S: WeatherStore>(
    Query(params): Query<WeatherQuery>,
    State(store): State<S>,
) -> Result<Json<Page<Observation>>, ApiError> {
    // ---
    debug!("Fetching weather data: {:?}", params);

    let filter = ObservationFilter {
        station_id: params.station_id.filter(|s| !s.is_empty()),
        date: params.date,
    };
    let page = PageRequest::new(params.page, params.per_page);

    let result = store.list_observations(&filter, page).await?;
    Ok(Json(result))
}

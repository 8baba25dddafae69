// src/routes/stats.rs
//! Annual statistics listing for the weather read API.
//!
//! `GET /api/weather/stats` pages through `weather_stats`, optionally
//! narrowed to a station and/or a year. The rows are whatever the last
//! `aggregate` run produced; this route never recomputes them.
//!
//! Follows the Explicit Module Boundary Pattern (EMBP):
//! - Internal to this file: the handler and its query type
//! - Exports to the gateway (`mod.rs`): a subrouter containing
//!   `/api/weather/stats`

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use super::ApiError;
use crate::store::WeatherStore;
use crate::{AnnualStat, Page, PageRequest, StatsFilter};

// ---

/// Create a subrouter containing the `/api/weather/stats` route.
///
/// # Returns
/// A [`Router<S>`] with a single GET `/api/weather/stats` route.
///
/// # Type Parameters
/// - `S`: Store the handler reads from, supplied by the gateway.
pub fn router<S: WeatherStore>() -> Router<S> {
    // ---
    Router::new().route("/api/weather/stats", get(handler::<S>))
}

/// Query parameters for filtering annual statistics
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    station_id: Option<String>,
    year: Option<i32>,
    page: Option<i64>,
    per_page: Option<i64>,
}

async fn handler<S: WeatherStore>(
    Query(params): Query<StatsQuery>,
    State(store): State<S>,
) -> Result<Json<Page<AnnualStat>>, ApiError> {
    // ---
    debug!("Fetching weather statistics: {:?}", params);

    let filter = StatsFilter {
        station_id: params.station_id.filter(|s| !s.is_empty()),
        year: params.year,
    };
    let page = PageRequest::new(params.page, params.per_page);

    let result = store.list_annual_stats(&filter, page).await?;
    Ok(Json(result))
}

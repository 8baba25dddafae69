//! Data models for the weather pipeline.

use chrono::NaiveDate;
use serde::Serialize;

// ---

/// Default page size for list endpoints.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Upper bound on the page size a client may request.
pub const MAX_PER_PAGE: u32 = 100;

/// Parsed observation, ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewObservation {
    // ---
    pub station_id: String,
    pub date: NaiveDate,
    pub max_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub precipitation: Option<f64>,
}

/// Stored daily observation (`weather_data` row).
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Observation {
    // ---
    pub id: i64,
    pub station_id: String,
    pub date: NaiveDate,
    /// Degrees Celsius.
    pub max_temp: Option<f64>,
    /// Degrees Celsius.
    pub min_temp: Option<f64>,
    /// Millimetres.
    pub precipitation: Option<f64>,
}

/// Per-station, per-year statistics (`weather_stats` row).
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct AnnualStat {
    // ---
    pub id: i64,
    pub station_id: String,
    pub year: i32,
    pub avg_max_temp: Option<f64>,
    pub avg_min_temp: Option<f64>,
    pub total_precipitation: Option<f64>,
}

impl NewObservation {
    // ---
    pub fn into_observation(self, id: i64) -> Observation {
        // ---
        Observation {
            id,
            station_id: self.station_id,
            date: self.date,
            max_temp: self.max_temp,
            min_temp: self.min_temp,
            precipitation: self.precipitation,
        }
    }
}

/// Optional filters for the observation listing. Present filters are ANDed.
#[derive(Debug, Clone, Default)]
pub struct ObservationFilter {
    pub station_id: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Optional filters for the annual statistics listing.
#[derive(Debug, Clone, Default)]
pub struct StatsFilter {
    pub station_id: Option<String>,
    pub year: Option<i32>,
}

/// Normalized pagination request.
///
/// Out-of-range inputs are clamped rather than rejected: a page below 1 is
/// page 1, a page size below 1 falls back to [`DEFAULT_PER_PAGE`], and sizes
/// above [`MAX_PER_PAGE`] are capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    // ---
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        // ---
        let page = match page {
            Some(p) if p >= 1 => u32::try_from(p).unwrap_or(u32::MAX),
            _ => 1,
        };
        let per_page = match per_page {
            Some(n) if n >= 1 => n.min(MAX_PER_PAGE as i64) as u32,
            _ => DEFAULT_PER_PAGE,
        };
        Self { page, per_page }
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }

    pub fn limit(&self) -> u64 {
        self.per_page as u64
    }
}

/// One page of results plus the metadata clients need to walk the rest.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    // ---
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub pages: u64,
}

impl<T> Page<T> {
    // ---
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        // ---
        let pages = total.div_ceil(request.per_page as u64);
        Self {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
            pages,
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        // ---
        let req = PageRequest::new(None, None);
        assert_eq!(req, PageRequest::default());
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, 20);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_page_request_clamping() {
        // ---
        // Below range falls back to defaults
        let req = PageRequest::new(Some(0), Some(-5));
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, DEFAULT_PER_PAGE);

        // Oversized pages are capped
        let req = PageRequest::new(Some(3), Some(5_000));
        assert_eq!(req.per_page, MAX_PER_PAGE);
        assert_eq!(req.offset(), 200);
    }

    #[test]
    fn test_page_counts() {
        // ---
        let req = PageRequest::new(Some(1), Some(20));

        let page = Page::new(vec![0u8; 20], 25, req);
        assert_eq!(page.pages, 2);
        assert_eq!(page.total, 25);
        assert_eq!(page.items.len(), 20);

        let exact: Page<u8> = Page::new(vec![], 40, req);
        assert_eq!(exact.pages, 2);

        let empty: Page<u8> = Page::new(vec![], 0, req);
        assert_eq!(empty.pages, 0);
    }

    #[test]
    fn test_observation_serializes_nulls() {
        // ---
        let obs = Observation {
            id: 7,
            station_id: "USC1".to_string(),
            date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            max_temp: Some(-5.0),
            min_temp: None,
            precipitation: None,
        };

        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["date"], "2021-01-01");
        assert_eq!(json["max_temp"], -5.0);
        assert!(json["min_temp"].is_null());
    }
}

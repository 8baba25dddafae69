//! Annual statistics recompute.
//!
//! Groups every observation by station and calendar year and upserts the
//! null-aware averages and totals into `weather_stats`.

use std::time::{Duration, Instant};

use tracing::info;

use crate::store::{StoreError, WeatherStore};
use crate::{AnnualStat, Observation};

// ---

/// Running mean/sum state for one station-year group.
///
/// Each metric tracks how many non-null values it has seen, so a metric
/// with no measurements finishes as `None` rather than `0.0`.
#[derive(Debug, Clone, Default)]
pub struct StatAccumulator {
    // ---
    max_temp_sum: f64,
    max_temp_count: u32,
    min_temp_sum: f64,
    min_temp_count: u32,
    precipitation_sum: f64,
    precipitation_count: u32,
}

impl StatAccumulator {
    // ---
    pub fn push(&mut self, obs: &Observation) {
        // ---
        if let Some(v) = obs.max_temp {
            self.max_temp_sum += v;
            self.max_temp_count += 1;
        }
        if let Some(v) = obs.min_temp {
            self.min_temp_sum += v;
            self.min_temp_count += 1;
        }
        if let Some(v) = obs.precipitation {
            self.precipitation_sum += v;
            self.precipitation_count += 1;
        }
    }

    pub fn avg_max_temp(&self) -> Option<f64> {
        mean(self.max_temp_sum, self.max_temp_count)
    }

    pub fn avg_min_temp(&self) -> Option<f64> {
        mean(self.min_temp_sum, self.min_temp_count)
    }

    pub fn total_precipitation(&self) -> Option<f64> {
        (self.precipitation_count > 0).then_some(self.precipitation_sum)
    }

    pub fn finish(self, id: i64, station_id: String, year: i32) -> AnnualStat {
        // ---
        AnnualStat {
            id,
            station_id,
            year,
            avg_max_temp: self.avg_max_temp(),
            avg_min_temp: self.avg_min_temp(),
            total_precipitation: self.total_precipitation(),
        }
    }
}

fn mean(sum: f64, count: u32) -> Option<f64> {
    (count > 0).then(|| sum / count as f64)
}

/// Outcome of one aggregation run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSummary {
    /// Station-year groups inserted or replaced.
    pub groups: u64,
    pub duration: Duration,
}

/// Recomputes `weather_stats` from `weather_data`.
pub struct AggregationEngine<S> {
    store: S,
}

impl<S: WeatherStore> AggregationEngine<S> {
    // ---
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run a full recompute. The whole run commits or nothing does; any
    /// error aborts it.
    #[tracing::instrument(name = "aggregate", skip(self), fields(backend = self.store.backend_name()))]
    pub async fn run(&self) -> Result<AggregateSummary, StoreError> {
        // ---
        let started = Instant::now();

        // Ingestion may never have run against this database
        self.store.ensure_observation_table().await?;
        self.store.ensure_stats_table().await?;
        info!("Starting annual statistics calculation");

        let groups = self.store.recompute_annual_stats().await?;
        let duration = started.elapsed();

        info!(
            "Annual statistics stored for {} station-year combinations in {:.2}s",
            groups,
            duration.as_secs_f64()
        );

        Ok(AggregateSummary { groups, duration })
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::NaiveDate;

    fn obs(max: Option<f64>, min: Option<f64>, precip: Option<f64>) -> Observation {
        // ---
        Observation {
            id: 0,
            station_id: "X".to_string(),
            date: NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
            max_temp: max,
            min_temp: min,
            precipitation: precip,
        }
    }

    #[test]
    fn test_empty_accumulator_is_all_null() {
        // ---
        let stat = StatAccumulator::default().finish(1, "X".to_string(), 2021);
        assert_eq!(stat.avg_max_temp, None);
        assert_eq!(stat.avg_min_temp, None);
        assert_eq!(stat.total_precipitation, None);
    }

    #[test]
    fn test_mean_ignores_nulls() {
        // ---
        let mut acc = StatAccumulator::default();
        acc.push(&obs(Some(10.0), None, None));
        acc.push(&obs(None, None, None));

        // Mean of the single measured value, not (10 + 0) / 2
        assert_eq!(acc.avg_max_temp(), Some(10.0));
        assert_eq!(acc.avg_min_temp(), None);
    }

    #[test]
    fn test_measured_zero_is_not_null() {
        // ---
        let mut acc = StatAccumulator::default();
        acc.push(&obs(None, None, Some(0.0)));
        acc.push(&obs(None, None, None));

        assert_eq!(acc.total_precipitation(), Some(0.0));
    }

    #[test]
    fn test_sums_and_means() {
        // ---
        let mut acc = StatAccumulator::default();
        acc.push(&obs(Some(4.0), Some(-2.0), Some(1.5)));
        acc.push(&obs(Some(8.0), Some(-4.0), Some(2.5)));
        acc.push(&obs(None, Some(-6.0), None));

        let stat = acc.finish(3, "X".to_string(), 2021);
        assert_eq!(stat.avg_max_temp, Some(6.0));
        assert_eq!(stat.avg_min_temp, Some(-4.0));
        assert_eq!(stat.total_precipitation, Some(4.0));
        assert_eq!(stat.id, 3);
        assert_eq!(stat.year, 2021);
    }
}

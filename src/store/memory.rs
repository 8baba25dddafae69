//! In-process store used by `ingest --dry-run` and the test suite.
//!
//! Mirrors the PostgreSQL semantics that matter to the pipeline: natural-key
//! uniqueness with insert-if-absent, all-or-nothing per call, and upserted
//! annual statistics.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};

use super::{StoreError, WeatherStore};
use crate::aggregate::StatAccumulator;
use crate::{
    AnnualStat, NewObservation, Observation, ObservationFilter, Page, PageRequest, StatsFilter,
};

// ---

#[derive(Debug, Default)]
struct Tables {
    // ---
    observations: BTreeMap<(String, NaiveDate), Observation>,
    stats: BTreeMap<(String, i32), AnnualStat>,
    next_observation_id: i64,
    next_stat_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Number of stored observations.
    pub fn observation_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.observations.len())
    }

    /// Snapshot of all annual statistics, ordered by station and year.
    pub fn annual_stats(&self) -> Result<Vec<AnnualStat>, StoreError> {
        Ok(self.lock()?.stats.values().cloned().collect())
    }
}

fn paginate<T: Clone>(matching: Vec<&T>, page: PageRequest) -> Page<T> {
    // ---
    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect();
    Page::new(items, total, page)
}

#[async_trait]
impl WeatherStore for MemoryStore {
    // ---
    async fn ensure_observation_table(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn ensure_stats_table(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_observations(&self, rows: &[NewObservation]) -> Result<u64, StoreError> {
        // ---
        // Holding the lock for the whole call makes the file atomic.
        let mut tables = self.lock()?;
        let tables = &mut *tables;
        let mut inserted = 0;

        for row in rows {
            let key = (row.station_id.clone(), row.date);
            if let Entry::Vacant(slot) = tables.observations.entry(key) {
                tables.next_observation_id += 1;
                slot.insert(row.clone().into_observation(tables.next_observation_id));
                inserted += 1;
            }
        }

        Ok(inserted)
    }

    async fn recompute_annual_stats(&self) -> Result<u64, StoreError> {
        // ---
        let mut tables = self.lock()?;
        let tables = &mut *tables;

        let mut groups: BTreeMap<(String, i32), StatAccumulator> = BTreeMap::new();
        for obs in tables.observations.values() {
            groups
                .entry((obs.station_id.clone(), obs.date.year()))
                .or_default()
                .push(obs);
        }

        let written = groups.len() as u64;
        for ((station_id, year), acc) in groups {
            let key = (station_id.clone(), year);
            let id = match tables.stats.get(&key) {
                Some(existing) => existing.id,
                None => {
                    tables.next_stat_id += 1;
                    tables.next_stat_id
                }
            };
            tables.stats.insert(key, acc.finish(id, station_id, year));
        }

        Ok(written)
    }

    async fn list_observations(
        &self,
        filter: &ObservationFilter,
        page: PageRequest,
    ) -> Result<Page<Observation>, StoreError> {
        // ---
        let tables = self.lock()?;
        let matching = tables
            .observations
            .values()
            .filter(|o| filter.station_id.as_ref().map_or(true, |id| &o.station_id == id))
            .filter(|o| filter.date.map_or(true, |d| o.date == d))
            .collect();
        Ok(paginate(matching, page))
    }

    async fn list_annual_stats(
        &self,
        filter: &StatsFilter,
        page: PageRequest,
    ) -> Result<Page<AnnualStat>, StoreError> {
        // ---
        let tables = self.lock()?;
        let matching = tables
            .stats
            .values()
            .filter(|s| filter.station_id.as_ref().map_or(true, |id| &s.station_id == id))
            .filter(|s| filter.year.map_or(true, |y| s.year == y))
            .collect();
        Ok(paginate(matching, page))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

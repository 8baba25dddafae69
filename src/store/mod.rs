//! Persistence seam shared by the engines and the read API.
//!
//! Engines and routes are generic over [`WeatherStore`], so the same code
//! runs against PostgreSQL in production and against [`MemoryStore`] for dry
//! runs and tests.

use async_trait::async_trait;
use sqlx::error::ErrorKind;
use thiserror::Error;

use crate::{
    AnnualStat, NewObservation, Observation, ObservationFilter, Page, PageRequest, StatsFilter,
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

// ---

#[derive(Debug, Error)]
pub enum StoreError {
    // ---
    /// A uniqueness, not-null, foreign-key or check constraint rejected the
    /// write. The surrounding transaction has been rolled back.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        // ---
        if let sqlx::Error::Database(db_err) = &err {
            if !matches!(db_err.kind(), ErrorKind::Other) {
                return StoreError::Integrity(db_err.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

/// Operations the pipeline needs from its backing store.
#[async_trait]
pub trait WeatherStore: Clone + Send + Sync + 'static {
    // ---
    /// Create the observation table and its indexes if missing.
    async fn ensure_observation_table(&self) -> Result<(), StoreError>;

    /// Create the annual statistics table and its indexes if missing.
    async fn ensure_stats_table(&self) -> Result<(), StoreError>;

    /// Insert one file's observations in a single transaction.
    ///
    /// Rows whose `(station_id, date)` already exists are skipped, never
    /// overwritten. Returns the number of rows actually inserted. On error
    /// nothing from this call is persisted.
    async fn insert_observations(&self, rows: &[NewObservation]) -> Result<u64, StoreError>;

    /// Recompute and upsert every station-year aggregate in one transaction.
    ///
    /// Returns the number of station-year groups written.
    async fn recompute_annual_stats(&self) -> Result<u64, StoreError>;

    async fn list_observations(
        &self,
        filter: &ObservationFilter,
        page: PageRequest,
    ) -> Result<Page<Observation>, StoreError>;

    async fn list_annual_stats(
        &self,
        filter: &StatsFilter,
        page: PageRequest,
    ) -> Result<Page<AnnualStat>, StoreError>;

    /// Cheap reachability check used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}

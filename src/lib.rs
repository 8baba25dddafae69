//! Weather station ingestion and annual statistics.
//!
//! The pipeline has three stages, each usable on its own:
//! - [`ingest`] loads tab-delimited station files into `weather_data`,
//!   skipping rows that already exist
//! - [`aggregate`] recomputes per-station, per-year statistics into
//!   `weather_stats`
//! - [`routes`] serves both tables through a paginated JSON API
//!
//! All three talk to storage through [`store::WeatherStore`], constructed
//! once by the caller and passed in.

pub mod aggregate;
pub mod config;
pub mod ingest;
pub mod models;
pub mod parser;
pub mod routes;
pub mod schema;
pub mod store;

pub use aggregate::{AggregateSummary, AggregationEngine};
pub use config::Config;
pub use ingest::{IngestError, IngestSummary, IngestionEngine};

// Re-exported at the crate root so modules refer to models through their
// parent rather than reaching into `models` directly.
pub use models::{
    AnnualStat, NewObservation, Observation, ObservationFilter, Page, PageRequest, StatsFilter,
};

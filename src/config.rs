//! Configuration loader for the `weather-ingest` pipeline.
//!
//! All runtime settings and their defaults live here, loaded from environment
//! variables (with optional `.env` support provided by the caller), so no
//! other module reads `env::var` directly.
//!
use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};

const DEFAULT_DATA_DIR: &str = "data/wx_data";

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// Immutable after loading; every component sees the same snapshot.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Directory holding one `<station_id>.<ext>` file per station.
    pub data_dir: PathBuf,

    /// Socket address the read API listens on.
    pub bind_addr: String,

    /// Rows per insert statement during ingestion.
    pub ingest_batch_size: u32,
}

/// Load configuration from environment variables with defaults.
///
/// Database, one of:
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `POSTGRES_USER`, `POSTGRES_PASSWORD`, `POSTGRES_HOST`, `POSTGRES_DB`
///   and optional `POSTGRES_PORT` (default: 5432)
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `WX_DATA_DIR` – input directory (default: `data/wx_data`)
/// - `WX_BIND_ADDR` – API listen address (default: `0.0.0.0:8080`)
/// - `INGEST_BATCH_SIZE` – rows per insert statement (default: 5000)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => db_url_from_parts()?,
    };
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let ingest_batch_size = parse_env_u32!("INGEST_BATCH_SIZE", 5000);
    if ingest_batch_size == 0 {
        bail!("Invalid INGEST_BATCH_SIZE: must be at least 1");
    }

    let data_dir = data_dir_from_env();
    let bind_addr = env::var("WX_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    Ok(Config {
        db_url,
        db_pool_max,
        data_dir,
        bind_addr,
        ingest_batch_size,
    })
}

/// Input directory from `WX_DATA_DIR`, or `data/wx_data`.
///
/// Independent of the database settings so `ingest --dry-run` can run on a
/// machine with no database configured.
pub fn data_dir_from_env() -> PathBuf {
    env::var("WX_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Assemble a connection string from the individual `POSTGRES_*` variables.
fn db_url_from_parts() -> Result<String> {
    // ---
    let user = require_env!("POSTGRES_USER");
    let password = require_env!("POSTGRES_PASSWORD");
    let host = require_env!("POSTGRES_HOST");
    let db = require_env!("POSTGRES_DB");
    let port = parse_env_u32!("POSTGRES_PORT", 5432);

    Ok(format!("postgresql://{user}:{password}@{host}:{port}/{db}"))
}

/// Replace the password in a connection string with `****`.
pub fn mask_db_url(db_url: &str) -> String {
    // ---
    let Some(at_pos) = db_url.rfind('@') else {
        return db_url.to_string();
    };
    let credentials = &db_url[..at_pos];
    // The scheme separator is not a password separator
    let scheme_end = credentials.find("://").map_or(0, |p| p + 3);
    match credentials[scheme_end..].find(':') {
        Some(colon_pos) => {
            let colon_pos = scheme_end + colon_pos;
            format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..])
        }
        None => db_url.to_string(),
    }
}

impl Config {
    /// Log the loaded configuration, masking the database password.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL      : {}", mask_db_url(&self.db_url));
        tracing::info!("  DB_POOL_MAX       : {}", self.db_pool_max);
        tracing::info!("  WX_DATA_DIR       : {}", self.data_dir.display());
        tracing::info!("  WX_BIND_ADDR      : {}", self.bind_addr);
        tracing::info!("  INGEST_BATCH_SIZE : {}", self.ingest_batch_size);
    }
}

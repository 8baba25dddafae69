//! Command-line entry point for `weather-ingest`.
//!
//! Subcommands:
//! - `ingest` – load station files from the data directory
//! - `aggregate` – recompute annual statistics
//! - `serve` – run the read API
//!
//! Each run loads configuration from the environment (or `.env`), installs
//! structured logging, opens the PostgreSQL pool and hands a `PgStore` to the
//! engine or router it needs.
//!
//! # Environment Variables
//! - `DATABASE_URL` (or the `POSTGRES_*` parts) – PostgreSQL connection
//! - `DB_POOL_MAX` (optional) – maximum number of DB connections (default: 5)
//! - `WX_DATA_DIR`, `WX_BIND_ADDR`, `INGEST_BATCH_SIZE` (optional)
//! - `WX_LOG_LEVEL` (optional) – log verbosity (default: `info`)
//! - `WX_SPAN_EVENTS` (optional) – span event mode for tracing
use std::{env, io::IsTerminal, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use weather_ingest::store::{MemoryStore, PgStore, WeatherStore};
use weather_ingest::{config, routes, AggregationEngine, Config, IngestionEngine};

// ---

#[derive(Debug, Parser)]
#[command(name = "weather-ingest", version, about = "Weather station data pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load station files into the observation table
    Ingest {
        /// Directory of `<station_id>.<ext>` files (overrides WX_DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Parse and deduplicate in memory without touching the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Recompute per-station annual statistics
    Aggregate,
    /// Serve the read API
    Serve {
        /// Listen address (overrides WX_BIND_ADDR)
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    // A dry run needs neither the database nor its configuration
    if let Command::Ingest {
        data_dir,
        dry_run: true,
    } = &cli.command
    {
        let dir = data_dir.clone().unwrap_or_else(config::data_dir_from_env);
        IngestionEngine::new(MemoryStore::new()).run(&dir).await?;
        return Ok(());
    }

    let cfg = config::load_from_env()?;
    cfg.log_config();

    match cli.command {
        Command::Ingest { data_dir, .. } => {
            let dir = data_dir.unwrap_or_else(|| cfg.data_dir.clone());
            IngestionEngine::new(connect(&cfg).await?).run(&dir).await?;
        }
        Command::Aggregate => {
            AggregationEngine::new(connect(&cfg).await?).run().await?;
        }
        Command::Serve { bind } => {
            let store = connect(&cfg).await?;
            store.ensure_observation_table().await?;
            store.ensure_stats_table().await?;

            let addr = bind.unwrap_or_else(|| cfg.bind_addr.clone());
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            tracing::info!("Listening on {}", addr);

            axum::serve(listener, routes::router(store)).await?;
        }
    }

    Ok(())
}

/// Open the connection pool and wrap it in a store.
async fn connect(cfg: &Config) -> Result<PgStore> {
    // ---
    tracing::info!(
        "Attempting to connect to database: {}",
        config::mask_db_url(&cfg.db_url)
    );

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(&cfg.db_url)
        .await
        .with_context(|| {
            format!(
                "Failed to connect to database '{}'",
                config::mask_db_url(&cfg.db_url)
            )
        })?;

    tracing::info!("Successfully connected to database");
    Ok(PgStore::new(pool, cfg.ingest_batch_size as usize))
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// - Color output: `FORCE_COLOR=1|true|yes` forces it on,
///   `FORCE_COLOR=0|false|no` forces it off, otherwise TTY detection
/// - Span events via `WX_SPAN_EVENTS`: `"full"`, `"enter_exit"`, or close
///   events only (default)
/// - Level from `RUST_LOG` if set, else `WX_LOG_LEVEL` (default `info`)
///
/// Call once at startup before any logging macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("WX_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("WX_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}

// src/schema.rs
//! Database schema management for `weather-ingest`.
//!
//! Ensures the two tables and their indexes exist. Nothing here runs at
//! process start; callers provision lazily through the store:
//! - ingestion creates `weather_data` before its first file
//! - aggregation creates both tables, since it reads `weather_data` and may
//!   run against a database ingestion has never touched
//! - `serve` creates both before binding
//!
//! Every function is idempotent and runs in its own transaction.

use sqlx::PgPool;

// ---

/// Create the `weather_data` table (idempotent).
///
/// The `uix_station_date` constraint is what makes re-ingesting a file a
/// no-op: inserts use `ON CONFLICT (station_id, date) DO NOTHING`.
pub async fn create_observation_table(pool: &PgPool) -> Result<(), sqlx::Error> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weather_data (
            id            BIGSERIAL PRIMARY KEY,
            station_id    TEXT             NOT NULL,
            date          DATE             NOT NULL,
            max_temp      DOUBLE PRECISION,
            min_temp      DOUBLE PRECISION,
            precipitation DOUBLE PRECISION,
            CONSTRAINT uix_station_date UNIQUE (station_id, date)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Lookups by exact date from `/api/weather?date=`
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_weather_data_date
            ON weather_data (date);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Create the `weather_stats` table (idempotent).
///
/// Keyed by `uix_station_year`, the conflict target of the aggregation
/// upsert. Errors are propagated if any SQL execution fails.
pub async fn create_stats_table(pool: &PgPool) -> Result<(), sqlx::Error> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weather_stats (
            id                  BIGSERIAL PRIMARY KEY,
            station_id          TEXT    NOT NULL,
            year                INTEGER NOT NULL,
            avg_max_temp        DOUBLE PRECISION,
            avg_min_temp        DOUBLE PRECISION,
            total_precipitation DOUBLE PRECISION,
            CONSTRAINT uix_station_year UNIQUE (station_id, year)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_weather_stats_year
            ON weather_stats (year);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

//! PostgreSQL store backed by a sqlx connection pool.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use super::{StoreError, WeatherStore};
use crate::{
    schema, AnnualStat, NewObservation, Observation, ObservationFilter, Page, PageRequest,
    StatsFilter,
};

// ---

#[derive(Debug, Clone)]
pub struct PgStore {
    // ---
    pool: PgPool,
    /// Rows per `INSERT` statement inside a file's transaction.
    batch_size: usize,
}

impl PgStore {
    // ---
    pub fn new(pool: PgPool, batch_size: usize) -> Self {
        Self {
            pool,
            batch_size: batch_size.max(1),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Insert one chunk with `UNNEST`, skipping rows whose natural key exists.
async fn insert_chunk(
    tx: &mut Transaction<'_, Postgres>,
    rows: &[NewObservation],
) -> Result<u64, sqlx::Error> {
    // ---
    let station_ids: Vec<&str> = rows.iter().map(|r| r.station_id.as_str()).collect();
    let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
    let max_temps: Vec<Option<f64>> = rows.iter().map(|r| r.max_temp).collect();
    let min_temps: Vec<Option<f64>> = rows.iter().map(|r| r.min_temp).collect();
    let precipitation: Vec<Option<f64>> = rows.iter().map(|r| r.precipitation).collect();

    let result = sqlx::query(
        r#"
        INSERT INTO weather_data (station_id, date, max_temp, min_temp, precipitation)
        SELECT * FROM UNNEST($1::text[], $2::date[], $3::float8[], $4::float8[], $5::float8[])
        ON CONFLICT (station_id, date) DO NOTHING
        "#,
    )
    .bind(&station_ids)
    .bind(&dates)
    .bind(&max_temps)
    .bind(&min_temps)
    .bind(&precipitation)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

#[async_trait]
impl WeatherStore for PgStore {
    // ---
    async fn ensure_observation_table(&self) -> Result<(), StoreError> {
        schema::create_observation_table(&self.pool).await?;
        Ok(())
    }

    async fn ensure_stats_table(&self) -> Result<(), StoreError> {
        schema::create_stats_table(&self.pool).await?;
        Ok(())
    }

    async fn insert_observations(&self, rows: &[NewObservation]) -> Result<u64, StoreError> {
        // ---
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in rows.chunks(self.batch_size) {
            match insert_chunk(&mut tx, chunk).await {
                Ok(n) => inserted += n,
                Err(e) => {
                    tx.rollback().await?;
                    return Err(e.into());
                }
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn recompute_annual_stats(&self) -> Result<u64, StoreError> {
        // ---
        // AVG and SUM skip NULLs and return NULL for an all-NULL group,
        // which is exactly the "no data" vs "measured zero" distinction.
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO weather_stats (
                station_id, year, avg_max_temp, avg_min_temp, total_precipitation
            )
            SELECT
                station_id,
                EXTRACT(YEAR FROM date)::INTEGER AS year,
                AVG(max_temp)      AS avg_max_temp,
                AVG(min_temp)      AS avg_min_temp,
                SUM(precipitation) AS total_precipitation
            FROM weather_data
            GROUP BY station_id, EXTRACT(YEAR FROM date)
            ON CONFLICT (station_id, year) DO UPDATE SET
                avg_max_temp        = EXCLUDED.avg_max_temp,
                avg_min_temp        = EXCLUDED.avg_min_temp,
                total_precipitation = EXCLUDED.total_precipitation
            "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    async fn list_observations(
        &self,
        filter: &ObservationFilter,
        page: PageRequest,
    ) -> Result<Page<Observation>, StoreError> {
        // ---
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM weather_data
            WHERE ($1::text IS NULL OR station_id = $1)
              AND ($2::date IS NULL OR date = $2)
            "#,
        )
        .bind(filter.station_id.as_deref())
        .bind(filter.date)
        .fetch_one(&self.pool)
        .await?;

        let items: Vec<Observation> = sqlx::query_as(
            r#"
            SELECT id, station_id, date, max_temp, min_temp, precipitation
            FROM weather_data
            WHERE ($1::text IS NULL OR station_id = $1)
              AND ($2::date IS NULL OR date = $2)
            ORDER BY station_id, date
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.station_id.as_deref())
        .bind(filter.date)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total as u64, page))
    }

    async fn list_annual_stats(
        &self,
        filter: &StatsFilter,
        page: PageRequest,
    ) -> Result<Page<AnnualStat>, StoreError> {
        // ---
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM weather_stats
            WHERE ($1::text IS NULL OR station_id = $1)
              AND ($2::integer IS NULL OR year = $2)
            "#,
        )
        .bind(filter.station_id.as_deref())
        .bind(filter.year)
        .fetch_one(&self.pool)
        .await?;

        let items: Vec<AnnualStat> = sqlx::query_as(
            r#"
            SELECT id, station_id, year, avg_max_temp, avg_min_temp, total_precipitation
            FROM weather_stats
            WHERE ($1::text IS NULL OR station_id = $1)
              AND ($2::integer IS NULL OR year = $2)
            ORDER BY station_id, year
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.station_id.as_deref())
        .bind(filter.year)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total as u64, page))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

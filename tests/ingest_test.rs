use std::fs;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::TempDir;

use weather_ingest::store::{MemoryStore, StoreError, WeatherStore};
use weather_ingest::{
    AnnualStat, IngestError, IngestionEngine, NewObservation, Observation, ObservationFilter,
    Page, PageRequest, StatsFilter,
};

// ---

fn write_station(dir: &Path, name: &str, rows: &[&str]) {
    // ---
    let mut body = rows.join("\n");
    body.push('\n');
    fs::write(dir.join(name), body).unwrap();
}

async fn all_observations(store: &MemoryStore, station: &str) -> Vec<Observation> {
    // ---
    let filter = ObservationFilter {
        station_id: Some(station.to_string()),
        date: None,
    };
    store
        .list_observations(&filter, PageRequest::new(Some(1), Some(100)))
        .await
        .unwrap()
        .items
}

#[tokio::test]
async fn ingests_known_row_with_sentinel() -> Result<()> {
    // ---
    let dir = TempDir::new()?;
    write_station(dir.path(), "USC1.txt", &["20210101\t-50\t-100\t-9999"]);

    let store = MemoryStore::new();
    let summary = IngestionEngine::new(store.clone()).run(dir.path()).await?;

    assert_eq!(summary.files_seen, 1);
    assert_eq!(summary.files_committed, 1);
    assert_eq!(summary.rows_processed, 1);
    assert_eq!(summary.rows_inserted, 1);

    let rows = all_observations(&store, "USC1").await;
    assert_eq!(rows.len(), 1);
    let obs = &rows[0];
    assert_eq!(obs.date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
    assert_eq!(obs.max_temp, Some(-5.0));
    assert_eq!(obs.min_temp, Some(-10.0));
    assert_eq!(obs.precipitation, None);

    Ok(())
}

#[tokio::test]
async fn second_run_inserts_nothing() -> Result<()> {
    // ---
    let dir = TempDir::new()?;
    write_station(
        dir.path(),
        "USC2.txt",
        &[
            "20210101\t10\t0\t5",
            "20210102\t20\t-10\t0",
            "20210103\t-9999\t-9999\t-9999",
        ],
    );

    let store = MemoryStore::new();
    let engine = IngestionEngine::new(store.clone());

    let first = engine.run(dir.path()).await?;
    let before = all_observations(&store, "USC2").await;

    let second = engine.run(dir.path()).await?;
    let after = all_observations(&store, "USC2").await;

    assert_eq!(first.rows_inserted, 3);
    assert_eq!(second.rows_processed, 3);
    assert_eq!(second.rows_inserted, 0);
    assert_eq!(before, after);

    Ok(())
}

#[tokio::test]
async fn duplicate_dates_keep_first_value() -> Result<()> {
    // ---
    let dir = TempDir::new()?;
    write_station(
        dir.path(),
        "DUP.txt",
        &["20210101\t10\t0\t5", "20210101\t99\t99\t99"],
    );

    let store = MemoryStore::new();
    let summary = IngestionEngine::new(store.clone()).run(dir.path()).await?;

    assert_eq!(summary.rows_processed, 2);
    assert_eq!(summary.rows_inserted, 1);

    let rows = all_observations(&store, "DUP").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].max_temp, Some(1.0));

    Ok(())
}

#[tokio::test]
async fn bad_rows_do_not_abort_the_file() -> Result<()> {
    // ---
    let dir = TempDir::new()?;
    write_station(
        dir.path(),
        "MIX.txt",
        &[
            "20210101\t10\t0\t5",
            "2021-01-02\t10\t0\t5",
            "20210103\tabc\t0\t5",
            "20210104\t10\t0",
            "",
            "20210105\t30\t10\t0",
        ],
    );

    let store = MemoryStore::new();
    let summary = IngestionEngine::new(store.clone()).run(dir.path()).await?;

    assert_eq!(summary.rows_rejected, 3);
    assert_eq!(summary.rows_processed, 2);
    assert_eq!(summary.rows_inserted, 2);
    assert_eq!(summary.files_committed, 1);
    assert_eq!(store.observation_count()?, 2);

    Ok(())
}

#[tokio::test]
async fn station_id_comes_from_file_name() -> Result<()> {
    // ---
    let dir = TempDir::new()?;
    write_station(dir.path(), "USC00110072.txt", &["19850101\t-22\t-128\t94"]);
    write_station(dir.path(), "USC00110187.txt", &["19850101\t-9999\t-9999\t0"]);
    fs::create_dir(dir.path().join("nested"))?;

    let store = MemoryStore::new();
    let summary = IngestionEngine::new(store.clone()).run(dir.path()).await?;

    assert_eq!(summary.files_seen, 2);
    assert_eq!(all_observations(&store, "USC00110072").await.len(), 1);
    assert_eq!(all_observations(&store, "USC00110187").await.len(), 1);

    Ok(())
}

#[tokio::test]
async fn missing_directory_is_fatal() {
    // ---
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist");

    let result = IngestionEngine::new(MemoryStore::new()).run(&missing).await;

    assert!(matches!(result, Err(IngestError::ReadDir { .. })));
}

#[tokio::test]
async fn unreadable_file_is_fatal() {
    // ---
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("BIN.dat"), [0xff, 0xfe, 0x00, 0x9f]).unwrap();

    let result = IngestionEngine::new(MemoryStore::new())
        .run(dir.path())
        .await;

    assert!(matches!(result, Err(IngestError::ReadFile { .. })));
}

// ---

/// Store that rejects one station's commit with an integrity violation and
/// otherwise delegates to a `MemoryStore`.
#[derive(Clone)]
struct RejectingStore {
    inner: MemoryStore,
    reject_station: &'static str,
}

#[async_trait]
impl WeatherStore for RejectingStore {
    // ---
    async fn ensure_observation_table(&self) -> Result<(), StoreError> {
        self.inner.ensure_observation_table().await
    }

    async fn ensure_stats_table(&self) -> Result<(), StoreError> {
        self.inner.ensure_stats_table().await
    }

    async fn insert_observations(&self, rows: &[NewObservation]) -> Result<u64, StoreError> {
        // ---
        if rows.iter().any(|r| r.station_id == self.reject_station) {
            return Err(StoreError::Integrity(
                "duplicate key value violates unique constraint \"uix_station_date\"".into(),
            ));
        }
        self.inner.insert_observations(rows).await
    }

    async fn recompute_annual_stats(&self) -> Result<u64, StoreError> {
        self.inner.recompute_annual_stats().await
    }

    async fn list_observations(
        &self,
        filter: &ObservationFilter,
        page: PageRequest,
    ) -> Result<Page<Observation>, StoreError> {
        self.inner.list_observations(filter, page).await
    }

    async fn list_annual_stats(
        &self,
        filter: &StatsFilter,
        page: PageRequest,
    ) -> Result<Page<AnnualStat>, StoreError> {
        self.inner.list_annual_stats(filter, page).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }

    fn backend_name(&self) -> &'static str {
        "rejecting"
    }
}

#[tokio::test]
async fn integrity_failure_rolls_back_only_that_file() -> Result<()> {
    // ---
    let dir = TempDir::new()?;
    write_station(dir.path(), "AAA.txt", &["20210101\t10\t0\t5"]);
    write_station(dir.path(), "BAD.txt", &["20210101\t10\t0\t5", "20210102\t10\t0\t5"]);
    write_station(dir.path(), "ZZZ.txt", &["20210101\t10\t0\t5"]);

    let memory = MemoryStore::new();
    let store = RejectingStore {
        inner: memory.clone(),
        reject_station: "BAD",
    };

    let summary = IngestionEngine::new(store).run(dir.path()).await?;

    assert_eq!(summary.files_seen, 3);
    assert_eq!(summary.files_committed, 2);
    assert_eq!(summary.files_failed, 1);
    assert_eq!(summary.rows_processed, 4);
    assert_eq!(summary.rows_inserted, 2);

    assert_eq!(all_observations(&memory, "AAA").await.len(), 1);
    assert!(all_observations(&memory, "BAD").await.is_empty());
    assert_eq!(all_observations(&memory, "ZZZ").await.len(), 1);

    Ok(())
}

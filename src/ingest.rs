//! Ingestion of per-station observation files.
//!
//! Every regular file in the data directory holds one station's daily rows;
//! the station id is the file name up to its first `.`. Each file is
//! written in its own transaction so one bad file cannot take down the run.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::parser::parse_line;
use crate::store::{StoreError, WeatherStore};
use crate::NewObservation;

// ---

/// Fatal ingestion failures. Row and per-file commit errors are recovered
/// inside the run and only show up in the logs and the summary counters.
#[derive(Debug, Error)]
pub enum IngestError {
    // ---
    #[error("cannot read data directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read data file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestSummary {
    // ---
    pub files_seen: u64,
    pub files_committed: u64,
    /// Files rolled back after an integrity violation.
    pub files_failed: u64,
    /// Parsed rows submitted to the store, new or not.
    pub rows_processed: u64,
    /// Rows that did not exist before, from committed files only.
    pub rows_inserted: u64,
    /// Rows dropped by the parser.
    pub rows_rejected: u64,
    pub duration: Duration,
}

/// Derive a station id from a file name: everything before the first `.`.
pub fn station_id_from_path(path: &Path) -> Option<String> {
    // ---
    let name = path.file_name()?.to_str()?;
    let stem = name.split('.').next().unwrap_or_default();
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Loads station files into the observation table.
pub struct IngestionEngine<S> {
    store: S,
}

impl<S: WeatherStore> IngestionEngine<S> {
    // ---
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Ingest every station file in `data_dir`, in file-name order.
    #[tracing::instrument(name = "ingest", skip(self, data_dir), fields(dir = %data_dir.as_ref().display()))]
    pub async fn run(&self, data_dir: impl AsRef<Path>) -> Result<IngestSummary, IngestError> {
        // ---
        let data_dir = data_dir.as_ref();
        let started = Instant::now();

        self.store.ensure_observation_table().await?;

        let files = list_station_files(data_dir).await?;
        info!(
            "Found {} weather files to process ({} store)",
            files.len(),
            self.store.backend_name()
        );

        let mut summary = IngestSummary::default();
        for (station_id, path) in files {
            summary.files_seen += 1;
            self.ingest_file(&station_id, &path, &mut summary).await?;
        }

        summary.duration = started.elapsed();
        info!("Total duration: {:.2} seconds", summary.duration.as_secs_f64());
        info!("Total records processed: {}", summary.rows_processed);
        info!("Total new records inserted: {}", summary.rows_inserted);
        if summary.rows_rejected > 0 || summary.files_failed > 0 {
            warn!(
                "Rejected {} rows; rolled back {} files",
                summary.rows_rejected, summary.files_failed
            );
        }

        Ok(summary)
    }

    async fn ingest_file(
        &self,
        station_id: &str,
        path: &Path,
        summary: &mut IngestSummary,
    ) -> Result<(), IngestError> {
        // ---
        debug!("Processing file: {}", path.display());

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| IngestError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;

        let rows = parse_file(station_id, path, &content, summary);

        match self.store.insert_observations(&rows).await {
            Ok(new_rows) => {
                summary.rows_processed += rows.len() as u64;
                summary.rows_inserted += new_rows;
                summary.files_committed += 1;
                info!(
                    "Successfully ingested file: {}. New records: {}",
                    path.display(),
                    new_rows
                );
            }
            Err(StoreError::Integrity(msg)) => {
                summary.rows_processed += rows.len() as u64;
                summary.files_failed += 1;
                error!(
                    "Failed to commit data for file: {} ({}); rolled back",
                    path.display(),
                    msg
                );
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }
}

/// Parse all rows of one file, logging and counting the ones that fail.
fn parse_file(
    station_id: &str,
    path: &Path,
    content: &str,
    summary: &mut IngestSummary,
) -> Vec<NewObservation> {
    // ---
    let mut rows = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(station_id, line) {
            Ok(obs) => rows.push(obs),
            Err(e) => {
                summary.rows_rejected += 1;
                error!(
                    "Error converting data in row {:?} at {}:{}: {}",
                    line,
                    path.display(),
                    idx + 1,
                    e
                );
            }
        }
    }
    rows
}

/// Regular files in `dir` paired with their station ids, sorted by name.
async fn list_station_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, IngestError> {
    // ---
    let read_dir_err = |source| IngestError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_dir_err)?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(read_dir_err)? {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(read_dir_err)?;
        if !file_type.is_file() {
            continue;
        }
        match station_id_from_path(&path) {
            Some(station_id) => files.push((station_id, path)),
            None => warn!("Skipping {}: no station id in file name", path.display()),
        }
    }

    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_station_id_from_path() {
        // ---
        assert_eq!(
            station_id_from_path(Path::new("data/wx_data/USC00110072.txt")),
            Some("USC00110072".to_string())
        );
        // Only the first extension-like segment separates the id
        assert_eq!(
            station_id_from_path(Path::new("USC1.txt.bak")),
            Some("USC1".to_string())
        );
        assert_eq!(
            station_id_from_path(Path::new("STATION")),
            Some("STATION".to_string())
        );
        assert_eq!(station_id_from_path(Path::new(".hidden")), None);
    }

    #[test]
    fn test_parse_file_skips_bad_and_blank_rows() {
        // ---
        let mut summary = IngestSummary::default();
        let content = "20210101\t10\t0\t5\n\nbogus\n20210102\t-9999\t-9999\t-9999\n";

        let rows = parse_file("S", Path::new("S.txt"), content, &mut summary);

        assert_eq!(rows.len(), 2);
        assert_eq!(summary.rows_rejected, 1);
        assert_eq!(rows[1].max_temp, None);
    }
}

//! Record parser for station data files.
//!
//! Each line holds four tab-separated fields:
//! `DATE(YYYYMMDD) MAX_TEMP MIN_TEMP PRECIPITATION`. Temperatures are in
//! tenths of a degree Celsius and precipitation in tenths of a millimetre;
//! `-9999` marks a missing measurement.

use chrono::NaiveDate;
use thiserror::Error;

use crate::NewObservation;

// ---

/// Literal used by the source data for "no measurement".
pub const MISSING_VALUE: &str = "-9999";

const FIELD_COUNT: usize = 4;

/// Why a single line could not be turned into an observation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowParseError {
    // ---
    #[error("expected 4 tab-separated fields, found {0}")]
    FieldCount(usize),

    #[error("invalid date {0:?}, expected YYYYMMDD")]
    InvalidDate(String),

    #[error("invalid {field} value {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Parse one line of a station file.
pub fn parse_line(station_id: &str, line: &str) -> Result<NewObservation, RowParseError> {
    // ---
    let line = line.trim_end_matches(['\r', '\n']);
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != FIELD_COUNT {
        return Err(RowParseError::FieldCount(fields.len()));
    }

    Ok(NewObservation {
        station_id: station_id.to_string(),
        date: parse_date(fields[0])?,
        max_temp: parse_tenths("max_temp", fields[1])?,
        min_temp: parse_tenths("min_temp", fields[2])?,
        precipitation: parse_tenths("precipitation", fields[3])?,
    })
}

fn parse_date(raw: &str) -> Result<NaiveDate, RowParseError> {
    // ---
    let raw = raw.trim();
    // chrono accepts short numeric fields for %Y, so pin the width first
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RowParseError::InvalidDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map_err(|_| RowParseError::InvalidDate(raw.to_string()))
}

/// Convert a value in tenths of a unit, mapping the sentinel to `None`.
fn parse_tenths(field: &'static str, raw: &str) -> Result<Option<f64>, RowParseError> {
    // ---
    let raw = raw.trim();
    if raw == MISSING_VALUE {
        return Ok(None);
    }

    let invalid = || RowParseError::InvalidNumber {
        field,
        value: raw.to_string(),
    };

    let value: f64 = raw.parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok(Some(value / 10.0))
}

//! CSV parsing for vessel telemetry uploads.

use chrono::NaiveDate;

use crate::error::{EngineError, Result};
use crate::telemetry::{TelemetryRow, is_known_column};

/// A parsed upload: the header as uploaded plus raw string cells.
///
/// Cleaning starts from the raw cells because null removal has to see the
/// original values, not coerced ones.
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl RawBatch {
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Decodes one record into a [`TelemetryRow`]: text columns pass through,
    /// numeric cells that fail coercion become null.
    pub fn decode_row(&self, record: &[String]) -> TelemetryRow {
        let mut row = TelemetryRow::default();
        for (header, cell) in self.headers.iter().zip(record) {
            match header.as_str() {
                "date" => row.date = cell.clone(),
                "time" => row.time = Some(cell.clone()),
                "latitude" => row.latitude = Some(cell.clone()),
                "longitude" => row.longitude = Some(cell.clone()),
                other => {
                    row.set_numeric(other, cell.trim().parse::<f64>().ok());
                }
            }
        }
        row
    }

    /// Observed date range across all rows with a parseable date.
    pub fn date_range(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        let date_idx = match self.headers.iter().position(|h| h == "date") {
            Some(i) => i,
            None => return (None, None),
        };
        let mut range: Option<(NaiveDate, NaiveDate)> = None;
        for record in &self.records {
            let Some(d) = record.get(date_idx).and_then(|c| parse_date(c)) else {
                continue;
            };
            range = Some(match range {
                Some((lo, hi)) => (lo.min(d), hi.max(d)),
                None => (d, d),
            });
        }
        match range {
            Some((lo, hi)) => (Some(lo), Some(hi)),
            None => (None, None),
        }
    }
}

/// Synchronous intake checks, applied before any job record exists.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] for an empty body or a file name that
/// is not `.csv`.
pub fn validate_upload(file_name: &str, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(EngineError::Validation("empty upload".into()));
    }
    if !file_name.to_ascii_lowercase().ends_with(".csv") {
        return Err(EngineError::Validation(format!(
            "unsupported file name: {file_name} (expected .csv)"
        )));
    }
    Ok(())
}

/// Decodes upload bytes into a [`RawBatch`].
///
/// Every header must be a known telemetry column; a header outside the
/// allow-list fails the whole batch.
pub fn parse_batch(bytes: &[u8]) -> Result<RawBatch> {
    let mut reader = csv::ReaderBuilder::new().from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(EngineError::Validation("missing header row".into()));
    }
    if let Some(unknown) = headers.iter().find(|h| !is_known_column(h)) {
        return Err(EngineError::InvalidData(format!(
            "unknown column: {unknown}"
        )));
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(record.iter().map(|c| c.to_string()).collect());
    }

    Ok(RawBatch { headers, records })
}

/// Parses a date cell, accepting the formats seen in real sensor exports.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(cell, fmt) {
            return Some(d);
        }
    }
    None
}

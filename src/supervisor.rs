//! The upload job supervisor: one fire-and-forget unit of work per uploaded
//! file, driving it through the pipeline to a terminal job state.
//!
//! The pipeline has no suspension points; file read, cleaning, and all store
//! I/O run synchronously inside a blocking task. Nothing is returned to the
//! caller: the persisted job row is the only observable outcome.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use tracing::{error, info};

use crate::cii::factors::EmissionFactors;
use crate::error::Result;
use crate::parser;
use crate::pipeline::{aggregate, clean};
use crate::store::{AnalyticsStore, JobStore};
use crate::telemetry::TelemetryRow;

/// Everything a processing run needs besides the open stores.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub upload_id: i64,
    pub vessel_id: i64,
    pub file_path: PathBuf,
    pub pitch: f64,
    /// CII-relevant tonnage (DWT or GT, registry-supplied). CII computation
    /// runs only when this is positive.
    pub capacity: Option<f64>,
}

/// Spawns the processing task. The returned handle can be awaited but carries
/// no result; job outcome lives in the job store.
pub fn spawn(
    jobs_db: PathBuf,
    analytics_db: PathBuf,
    factors: EmissionFactors,
    request: JobRequest,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let jobs = match JobStore::open(&jobs_db) {
            Ok(store) => store,
            Err(e) => {
                error!(upload_id = request.upload_id, error = %e, "job store unavailable");
                return;
            }
        };
        let mut analytics = match AnalyticsStore::open(&analytics_db) {
            Ok(store) => store,
            Err(e) => {
                error!(upload_id = request.upload_id, error = %e, "analytics store unavailable");
                let _ = jobs.mark_failed(request.upload_id, &e.to_string());
                return;
            }
        };
        process_upload(&jobs, &mut analytics, &factors, &request);
    })
}

/// Drives one upload to a terminal state. Pipeline errors are captured on the
/// job row and never propagated.
#[tracing::instrument(
    skip(jobs, analytics, factors, request),
    fields(upload_id = request.upload_id, vessel_id = request.vessel_id)
)]
pub fn process_upload(
    jobs: &JobStore,
    analytics: &mut AnalyticsStore,
    factors: &EmissionFactors,
    request: &JobRequest,
) {
    if let Err(e) = jobs.mark_processing(request.upload_id) {
        error!(error = %e, "could not mark job processing");
        return;
    }

    match run_pipeline(analytics, factors, request) {
        Ok((date_start, date_end)) => {
            if let Err(e) = jobs.mark_done(request.upload_id, date_start, date_end) {
                error!(error = %e, "could not mark job done");
            } else {
                info!("upload processed");
            }
        }
        Err(e) => {
            error!(error = %e, "upload processing failed");
            if let Err(update_err) = jobs.mark_failed(request.upload_id, &e.to_string()) {
                error!(error = %update_err, "could not mark job failed");
            }
        }
    }
}

fn run_pipeline(
    analytics: &mut AnalyticsStore,
    factors: &EmissionFactors,
    request: &JobRequest,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    let bytes = std::fs::read(&request.file_path)?;
    let batch = parser::parse_batch(&bytes)?;
    info!(rows = batch.records.len(), "telemetry file parsed");

    let raw_rows: Vec<TelemetryRow> = batch
        .records
        .iter()
        .map(|record| batch.decode_row(record))
        .collect();
    analytics.append_raw(request.vessel_id, &raw_rows)?;

    let cleaned = clean::clean(&batch, request.pitch);
    info!(rows = cleaned.len(), "rows after cleaning");

    // Zero cleaned rows is a degenerate success: only the raw write happened.
    if !cleaned.is_empty() {
        analytics.append_standard(request.vessel_id, &cleaned)?;

        let daily = aggregate::aggregate_daily(request.vessel_id, &cleaned)?;
        analytics.upsert_per_day(&daily)?;

        if let Some(capacity) = request.capacity.filter(|c| *c > 0.0) {
            let updated =
                analytics.update_cii_temp_where_zero(request.vessel_id, capacity, factors)?;
            let recomputed = analytics.recompute_cii(request.vessel_id)?;
            info!(updated, recomputed, "carbon intensity updated");
        }
    }

    Ok(batch.date_range())
}

/// Writes uploaded bytes under a dated directory and returns the path the job
/// will read from.
pub fn save_upload_file(
    bytes: &[u8],
    vessel_name: &str,
    upload_dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let now = Utc::now();
    let dir = upload_dir.as_ref().join(now.format("%Y-%m-%d").to_string());
    std::fs::create_dir_all(&dir)?;

    let path = dir.join(format!("{vessel_name}-{}.csv", now.format("%Y%m%d_%H%M%S%f")));
    std::fs::write(&path, bytes)?;
    Ok(path)
}

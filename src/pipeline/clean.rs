//! Multi-stage cleaning of raw telemetry batches.
//!
//! Stage order is fixed: null removal → numeric coercion → derived fields →
//! plausibility filtering → operational filtering. An empty result is a valid
//! terminal state, not an error.

use tracing::debug;

use crate::parser::RawBatch;
use crate::telemetry::TelemetryRow;

/// Propeller pitch used for slip ratio when the caller does not supply one.
pub const DEFAULT_PITCH: f64 = 6.058;

/// Value some sensors emit instead of a reading when they fault.
const SENSOR_ERROR: f64 = 88888.0;

/// Runs the full cleaning pipeline over a parsed batch.
pub fn clean(batch: &RawBatch, pitch: f64) -> Vec<TelemetryRow> {
    let total = batch.records.len();

    // Null removal happens on the raw cells; coercion afterwards turns the
    // surviving unparsable cells into nulls without re-dropping the row.
    let mut rows: Vec<TelemetryRow> = batch
        .records
        .iter()
        .filter(|record| !record.iter().any(|cell| is_null_cell(cell)))
        .map(|record| batch.decode_row(record))
        .collect();
    debug!(rows_in = total, rows_out = rows.len(), "null removal");

    for row in &mut rows {
        compute_derived(row, pitch);
    }

    let before = rows.len();
    rows.retain(|row| passes_plausibility(row, batch));
    debug!(rows_in = before, rows_out = rows.len(), "plausibility filter");
    if rows.is_empty() {
        return rows;
    }

    let before = rows.len();
    rows.retain(passes_operational);
    debug!(rows_in = before, rows_out = rows.len(), "operational filter");

    rows
}

fn is_null_cell(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty() || matches!(cell.to_ascii_lowercase().as_str(), "nan" | "null" | "na" | "n/a")
}

/// Derived fields with zero-guards. Inputs absent from the upload behave as
/// zero columns.
fn compute_derived(row: &mut TelemetryRow, pitch: f64) {
    let astern = row.draught_astern.unwrap_or(0.0);
    let bow = row.draught_bow.unwrap_or(0.0);
    row.draft = Some(0.5 * (astern + bow));

    row.slip_ratio = Some(match (row.me_rpm, row.speed_water) {
        (Some(rpm), Some(speed)) if rpm != 0.0 && speed != 0.0 => {
            (1.0 - speed / (rpm * pitch * 60.0) * 1852.0) * 100.0
        }
        _ => 0.0,
    });

    row.ship_nmile = Some(match row.speed_water {
        Some(speed) if speed != 0.0 => {
            (row.me_hfo_act_cons.unwrap_or(0.0)
                + row.dg_hfo_act_cons.unwrap_or(0.0)
                + row.blr_hfo_act_cons.unwrap_or(0.0))
                / speed
        }
        _ => 0.0,
    });
}

/// Physically-impossible value removal. Upload-dependent rules apply only
/// when the column came with the file; rules on derived or normalized
/// columns are unconditional. Range rules drop null values, the
/// sentinel `!=` rules keep them.
fn passes_plausibility(row: &TelemetryRow, batch: &RawBatch) -> bool {
    if batch.has_column("me_fuel_consumption_nmile")
        && !row
            .me_fuel_consumption_nmile
            .is_some_and(|v| v > 0.0 && v < 250.0)
    {
        return false;
    }
    if batch.has_column("me_shaft_power") && !row.me_shaft_power.is_some_and(|v| v > 0.0 && v < 8000.0)
    {
        return false;
    }
    if !row.me_rpm.is_some_and(|v| v < 2000.0 && v != 0.0) {
        return false;
    }
    if !row.draft.is_some_and(|v| v > 0.0) {
        return false;
    }
    if batch.has_column("speed_ground")
        && !row.speed_ground.is_some_and(|v| v != SENSOR_ERROR && v >= 3.0)
    {
        return false;
    }
    if row.speed_water.is_some_and(|v| v == SENSOR_ERROR) {
        return false;
    }
    if row.slip_ratio.is_some_and(|v| v == SENSOR_ERROR) {
        return false;
    }
    if batch.has_column("wind_direction") && row.wind_direction.is_some_and(|v| v == SENSOR_ERROR) {
        return false;
    }
    if batch.has_column("wind_speed") && !row.wind_speed.is_some_and(|v| v < 60.0) {
        return false;
    }
    if batch.has_column("me_fuel_consumption_kwh")
        && !row.me_fuel_consumption_kwh.is_some_and(|v| v >= 0.0)
    {
        return false;
    }

    // Embedded line breaks in text fields mark corrupted exports.
    !has_embedded_break(row)
}

fn has_embedded_break(row: &TelemetryRow) -> bool {
    let text_fields = [
        Some(&row.date),
        row.time.as_ref(),
        row.latitude.as_ref(),
        row.longitude.as_ref(),
    ];
    text_fields
        .into_iter()
        .flatten()
        .any(|field| field.contains('\n'))
}

/// Keeps only rows from sustained under-way operation.
fn passes_operational(row: &TelemetryRow) -> bool {
    row.me_rpm.is_some_and(|v| v >= 35.0)
        && row.speed_water.is_some_and(|v| v >= 3.0)
        && row
            .slip_ratio
            .is_some_and(|v| (-20.0..=100.0).contains(&v))
}

//! Per-day and rolling carbon intensity calculators.

use chrono::{Datelike, NaiveDate};

use crate::cii::factors::EmissionFactors;
use crate::telemetry::{CII_FUEL_COLUMNS, DailyAggregate};

/// Instantaneous per-day carbon intensity contribution:
/// `Σ (consumption / speed_water) * (CF * 1000 / capacity)` over the fuel
/// columns. Terms with an unrecognized fuel are omitted; the whole figure is
/// 0 when speed or capacity is missing or non-positive, never NaN.
pub fn cii_temp(day: &DailyAggregate, capacity: f64, factors: &EmissionFactors) -> f64 {
    if capacity <= 0.0 {
        return 0.0;
    }
    let speed = day.speed_water.unwrap_or(0.0);
    if speed <= 0.0 {
        return 0.0;
    }

    let mut total = 0.0;
    for column in CII_FUEL_COLUMNS {
        let cf = factors.cf_for(column);
        if cf <= 0.0 {
            continue;
        }
        let consumption = day.numeric_value(column).unwrap_or(0.0);
        total += (consumption / speed) * (cf * 1000.0 / capacity);
    }
    total
}

/// Year-partitioned rolling average of `cii_temp`.
///
/// Input order does not matter; the result carries one `(date, cii)` pair per
/// input day, where `cii` is the mean of all `cii_temp` values from January 1
/// of that day's year through that day. The average restarts at every
/// calendar-year boundary.
pub fn rolling_cii(days: &[(NaiveDate, f64)]) -> Vec<(NaiveDate, f64)> {
    let mut sorted = days.to_vec();
    sorted.sort_by_key(|(date, _)| *date);

    let mut result = Vec::with_capacity(sorted.len());
    let mut year = None;
    let mut sum = 0.0;
    let mut count = 0u32;

    for (date, temp) in sorted {
        if year != Some(date.year()) {
            year = Some(date.year());
            sum = 0.0;
            count = 0;
        }
        sum += temp;
        count += 1;
        result.push((date, sum / f64::from(count)));
    }
    result
}

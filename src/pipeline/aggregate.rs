//! Daily aggregation of cleaned telemetry.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::{EngineError, Result};
use crate::parser::parse_date;
use crate::pipeline::util::mean;
use crate::telemetry::{DailyAggregate, NUMERIC_COLUMNS, TelemetryRow};

/// Groups cleaned rows by calendar date and reduces every numeric column to
/// its arithmetic mean. Nulls are skipped; a column with no present values
/// stays null. The engine-owned carbon fields start at their 0 default.
///
/// # Errors
///
/// A cleaned row whose date parses with none of the accepted formats is a
/// data-integrity failure and fails the whole batch.
pub fn aggregate_daily(vessel_id: i64, rows: &[TelemetryRow]) -> Result<Vec<DailyAggregate>> {
    let mut groups: BTreeMap<NaiveDate, Vec<&TelemetryRow>> = BTreeMap::new();
    for row in rows {
        let date = parse_date(&row.date).ok_or_else(|| {
            EngineError::InvalidData(format!("unparsable date on cleaned row: {:?}", row.date))
        })?;
        groups.entry(date).or_default().push(row);
    }

    let mut daily = Vec::with_capacity(groups.len());
    for (date, members) in groups {
        let mut agg = DailyAggregate {
            vessel_id,
            date,
            ..DailyAggregate::default()
        };
        for column in NUMERIC_COLUMNS {
            let values: Vec<f64> = members
                .iter()
                .filter_map(|row| row.numeric_value(column))
                .collect();
            if !values.is_empty() {
                agg.set_numeric(column, Some(mean(&values)));
            }
        }
        daily.push(agg);
    }
    Ok(daily)
}

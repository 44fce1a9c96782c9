//! The analytical store: raw telemetry, cleaned telemetry, and the per-day
//! aggregate table.
//!
//! The two telemetry tables are append-only; the per-day table is keyed by
//! (vessel_id, date) and replaced whole via delete+insert. All SQL is
//! assembled from the compile-time column allow-list, never from caller
//! input.

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, params, params_from_iter};
use tracing::debug;

use crate::cii::compute::{cii_temp, rolling_cii};
use crate::cii::factors::EmissionFactors;
use crate::error::Result;
use crate::telemetry::{DailyAggregate, NUMERIC_COLUMNS, TelemetryRow};

const RAW_TABLE: &str = "vessel_original_data";
const STANDARD_TABLE: &str = "vessel_standard_data";
const PER_DAY_TABLE: &str = "vessel_data_per_day";

pub struct AnalyticsStore {
    conn: Connection,
}

impl AnalyticsStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::migrate(&conn)?;
        Ok(Self { conn })
    }

    fn migrate(conn: &Connection) -> Result<()> {
        for table in [RAW_TABLE, STANDARD_TABLE] {
            conn.execute_batch(&telemetry_table_sql(table))?;
        }
        conn.execute_batch(&per_day_table_sql())?;
        Ok(())
    }

    /// Appends parsed rows to the raw telemetry table. Every parsed row is
    /// kept, including ones the cleaning pipeline later drops.
    pub fn append_raw(&mut self, vessel_id: i64, rows: &[TelemetryRow]) -> Result<usize> {
        self.append_telemetry(RAW_TABLE, vessel_id, rows)
    }

    /// Appends cleaned rows to the standard telemetry table.
    pub fn append_standard(&mut self, vessel_id: i64, rows: &[TelemetryRow]) -> Result<usize> {
        self.append_telemetry(STANDARD_TABLE, vessel_id, rows)
    }

    fn append_telemetry(
        &mut self,
        table: &str,
        vessel_id: i64,
        rows: &[TelemetryRow],
    ) -> Result<usize> {
        let sql = format!(
            "INSERT INTO {table} (vessel_id, date, time, latitude, longitude, {}, created_at) \
             VALUES ({})",
            NUMERIC_COLUMNS.join(", "),
            placeholders(5 + NUMERIC_COLUMNS.len() + 1),
        );
        let created_at = Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                let mut values: Vec<Value> = vec![
                    Value::Integer(vessel_id),
                    Value::Text(row.date.clone()),
                    opt_text(row.time.as_deref()),
                    opt_text(row.latitude.as_deref()),
                    opt_text(row.longitude.as_deref()),
                ];
                values.extend(row.numeric_values().into_iter().map(opt_real));
                values.push(Value::Text(created_at.clone()));
                stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;
        debug!(table, vessel_id, rows = rows.len(), "telemetry appended");
        Ok(rows.len())
    }

    /// Replaces the per-day rows for each date in the batch: delete existing
    /// (vessel, date) rows, insert the new ones. Last write wins.
    pub fn upsert_per_day(&mut self, rows: &[DailyAggregate]) -> Result<usize> {
        let insert_sql = format!(
            "INSERT INTO {PER_DAY_TABLE} (vessel_id, date, {}, cii_temp, cii) VALUES ({})",
            NUMERIC_COLUMNS.join(", "),
            placeholders(2 + NUMERIC_COLUMNS.len() + 2),
        );

        let tx = self.conn.transaction()?;
        {
            let mut delete = tx.prepare(&format!(
                "DELETE FROM {PER_DAY_TABLE} WHERE vessel_id = ?1 AND date = ?2"
            ))?;
            let mut insert = tx.prepare(&insert_sql)?;
            for row in rows {
                let date = row.date.to_string();
                delete.execute(params![row.vessel_id, date])?;

                let mut values: Vec<Value> =
                    vec![Value::Integer(row.vessel_id), Value::Text(date)];
                values.extend(row.numeric_values().into_iter().map(opt_real));
                values.push(Value::Real(row.cii_temp));
                values.push(Value::Real(row.cii));
                insert.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    /// Computes `cii_temp` for a vessel's per-day rows, limited to rows where
    /// the stored value is still 0.
    ///
    /// Already-nonzero values are deliberately never overwritten, so a later
    /// run with a corrected capacity will not touch days computed before the
    /// correction; clear `cii_temp` first if that is wanted.
    pub fn update_cii_temp_where_zero(
        &mut self,
        vessel_id: i64,
        capacity: f64,
        factors: &EmissionFactors,
    ) -> Result<usize> {
        let pending = {
            let sql = daily_select_sql("WHERE vessel_id = ?1 AND cii_temp = 0 ORDER BY date ASC");
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params![vessel_id], row_to_daily)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let tx = self.conn.transaction()?;
        {
            let mut update = tx.prepare(&format!(
                "UPDATE {PER_DAY_TABLE} SET cii_temp = ?1 \
                 WHERE vessel_id = ?2 AND date = ?3 AND cii_temp = 0"
            ))?;
            for day in &pending {
                let value = cii_temp(day, capacity, factors);
                update.execute(params![value, vessel_id, day.date.to_string()])?;
            }
        }
        tx.commit()?;
        debug!(vessel_id, rows = pending.len(), "cii_temp updated");
        Ok(pending.len())
    }

    /// Recomputes the rolling `cii` column for a vessel's entire history.
    /// Full recompute keeps backfilled and out-of-order uploads correct.
    pub fn recompute_cii(&mut self, vessel_id: i64) -> Result<usize> {
        let days = {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT date, cii_temp FROM {PER_DAY_TABLE} \
                 WHERE vessel_id = ?1 ORDER BY date ASC"
            ))?;
            let rows = stmt.query_map(params![vessel_id], |row| {
                Ok((text_to_date(row.get::<_, String>(0)?)?, row.get::<_, f64>(1)?))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let rolled = rolling_cii(&days);
        let tx = self.conn.transaction()?;
        {
            let mut update = tx.prepare(&format!(
                "UPDATE {PER_DAY_TABLE} SET cii = ?1 WHERE vessel_id = ?2 AND date = ?3"
            ))?;
            for (date, cii) in &rolled {
                update.execute(params![cii, vessel_id, date.to_string()])?;
            }
        }
        tx.commit()?;
        debug!(vessel_id, rows = rolled.len(), "rolling cii recomputed");
        Ok(rolled.len())
    }

    /// Per-day rows for a vessel, newest first.
    pub fn daily_rows(
        &self,
        vessel_id: i64,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<DailyAggregate>> {
        let sql = daily_select_sql("WHERE vessel_id = ?1 ORDER BY date DESC LIMIT ?2 OFFSET ?3");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![vessel_id, limit as i64, offset as i64],
            row_to_daily,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Number of rows in one of the telemetry tables, for reporting.
    pub fn standard_row_count(&self, vessel_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {STANDARD_TABLE} WHERE vessel_id = ?1"),
            params![vessel_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn raw_row_count(&self, vessel_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {RAW_TABLE} WHERE vessel_id = ?1"),
            params![vessel_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn numeric_column_defs() -> String {
    NUMERIC_COLUMNS
        .iter()
        .map(|c| format!("{c} REAL, "))
        .collect()
}

fn telemetry_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\
            id INTEGER PRIMARY KEY AUTOINCREMENT, \
            vessel_id INTEGER NOT NULL, \
            date TEXT, time TEXT, latitude TEXT, longitude TEXT, \
            {}created_at TEXT NOT NULL\
        );\n\
        CREATE INDEX IF NOT EXISTS idx_{table}_vessel_date ON {table} (vessel_id, date);",
        numeric_column_defs(),
    )
}

fn per_day_table_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {PER_DAY_TABLE} (\
            vessel_id INTEGER NOT NULL, \
            date TEXT NOT NULL, \
            {}cii_temp REAL NOT NULL DEFAULT 0, \
            cii REAL NOT NULL DEFAULT 0, \
            PRIMARY KEY (vessel_id, date)\
        );",
        numeric_column_defs(),
    )
}

fn daily_select_sql(tail: &str) -> String {
    format!(
        "SELECT vessel_id, date, {}, cii_temp, cii FROM {PER_DAY_TABLE} {tail}",
        NUMERIC_COLUMNS.join(", "),
    )
}

fn row_to_daily(row: &rusqlite::Row<'_>) -> rusqlite::Result<DailyAggregate> {
    let mut day = DailyAggregate {
        vessel_id: row.get(0)?,
        date: text_to_date(row.get::<_, String>(1)?)?,
        ..DailyAggregate::default()
    };
    for (i, column) in NUMERIC_COLUMNS.iter().enumerate() {
        day.set_numeric(column, row.get::<_, Option<f64>>(2 + i)?);
    }
    day.cii_temp = row.get(2 + NUMERIC_COLUMNS.len())?;
    day.cii = row.get(2 + NUMERIC_COLUMNS.len() + 1)?;
    Ok(day)
}

fn text_to_date(text: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
    })
}

fn placeholders(n: usize) -> String {
    let mut s = String::new();
    for i in 1..=n {
        if i > 1 {
            s.push_str(", ");
        }
        s.push('?');
        s.push_str(&i.to_string());
    }
    s
}

fn opt_real(value: Option<f64>) -> Value {
    value.map_or(Value::Null, Value::Real)
}

fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::Text(s.to_string()))
}

//! Upload job records: the persisted state machine behind background
//! processing. `pending → processing → {done, failed}`; terminal states are
//! never left, and jobs are never deleted.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::error::{Result, truncate_message};

/// Longest error message stored on a failed job.
pub const MAX_ERROR_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "done" => Self::Done,
            "failed" => Self::Failed,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadJob {
    pub id: i64,
    pub vessel_id: i64,
    pub file_path: String,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

pub struct JobStore {
    conn: Connection,
}

impl JobStore {
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
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS upload_jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                vessel_id INTEGER NOT NULL,
                file_path TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                error_message TEXT,
                date_start TEXT,
                date_end TEXT,
                created_at TEXT NOT NULL,
                completed_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_upload_jobs_vessel
                ON upload_jobs (vessel_id, created_at DESC);",
        )?;
        Ok(())
    }

    /// Creates a job in `pending` and returns it.
    pub fn create(&self, vessel_id: i64, file_path: &str) -> Result<UploadJob> {
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO upload_jobs (vessel_id, file_path, status, created_at)
             VALUES (?1, ?2, 'pending', ?3)",
            params![vessel_id, file_path, created_at.to_rfc3339()],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(UploadJob {
            id,
            vessel_id,
            file_path: file_path.to_string(),
            status: JobStatus::Pending,
            error_message: None,
            date_start: None,
            date_end: None,
            created_at,
            completed_at: None,
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<UploadJob>> {
        let job = self
            .conn
            .query_row(
                "SELECT id, vessel_id, file_path, status, error_message,
                        date_start, date_end, created_at, completed_at
                 FROM upload_jobs WHERE id = ?1",
                params![id],
                row_to_job,
            )
            .optional()?;
        Ok(job)
    }

    pub fn mark_processing(&self, id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE upload_jobs SET status = 'processing' WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    /// Terminal success: records the observed raw date range and completion
    /// time.
    pub fn mark_done(
        &self,
        id: i64,
        date_start: Option<NaiveDate>,
        date_end: Option<NaiveDate>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE upload_jobs
             SET status = 'done', date_start = ?2, date_end = ?3, completed_at = ?4
             WHERE id = ?1",
            params![
                id,
                date_start.map(|d| d.to_string()),
                date_end.map(|d| d.to_string()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Terminal failure: stores a truncated message and completion time.
    pub fn mark_failed(&self, id: i64, message: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE upload_jobs
             SET status = 'failed', error_message = ?2, completed_at = ?3
             WHERE id = ?1",
            params![
                id,
                truncate_message(message, MAX_ERROR_LEN),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Upload history for a vessel, newest first.
    pub fn list_by_vessel(
        &self,
        vessel_id: i64,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<UploadJob>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, vessel_id, file_path, status, error_message,
                    date_start, date_end, created_at, completed_at
             FROM upload_jobs WHERE vessel_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3",
        )?;
        let jobs = stmt.query_map(
            params![vessel_id, limit as i64, offset as i64],
            row_to_job,
        )?;
        Ok(jobs.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<UploadJob> {
    let status_text: String = row.get(3)?;
    let status = JobStatus::parse(&status_text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown job status: {status_text}").into(),
        )
    })?;
    Ok(UploadJob {
        id: row.get(0)?,
        vessel_id: row.get(1)?,
        file_path: row.get(2)?,
        status,
        error_message: row.get(4)?,
        date_start: parse_opt_date(row, 5)?,
        date_end: parse_opt_date(row, 6)?,
        created_at: parse_timestamp(row, 7)?,
        completed_at: {
            let text: Option<String> = row.get(8)?;
            match text {
                Some(t) => Some(parse_timestamp_text(&t, 8)?),
                None => None,
            }
        },
    })
}

fn parse_opt_date(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        t.parse::<NaiveDate>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
        })
    })
    .transpose()
}

fn parse_timestamp(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_timestamp_text(&text, idx)
}

fn parse_timestamp_text(text: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Upload rejected before a job record exists (empty file, wrong name,
    /// missing header).
    #[error("validation: {0}")]
    Validation(String),

    /// Data that parsed but cannot be processed (unknown columns, unparsable
    /// dates on cleaned rows).
    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Trims a failure message to fit the job table's error column.
pub fn truncate_message(msg: &str, limit: usize) -> String {
    msg.chars().take(limit).collect()
}

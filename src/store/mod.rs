//! SQLite-backed persistence: the analytical telemetry store and the
//! upload-job record store. Separate files, separate connections.

pub mod analytics;
pub mod jobs;

pub use analytics::AnalyticsStore;
pub use jobs::{JobStatus, JobStore, UploadJob};

//! The telemetry cleaning and aggregation pipeline.

pub mod aggregate;
pub mod clean;
pub mod util;

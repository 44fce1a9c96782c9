//! CLI entry point for the vessel CII rater.
//!
//! Provides subcommands for uploading telemetry files, inspecting job state,
//! reading per-day aggregates, and rating observed CII values against the
//! reference curve.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use vessel_cii_rater::cii::factors::EmissionFactors;
use vessel_cii_rater::cii::reference::classify;
use vessel_cii_rater::parser::validate_upload;
use vessel_cii_rater::pipeline::clean::DEFAULT_PITCH;
use vessel_cii_rater::store::{AnalyticsStore, JobStore};
use vessel_cii_rater::supervisor::{self, JobRequest};

#[derive(Parser)]
#[command(name = "vessel_cii_rater")]
#[command(about = "Ingest vessel telemetry and compute CII ratings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a telemetry CSV for a vessel and process it in the background
    Upload {
        /// Vessel the file belongs to
        #[arg(short, long)]
        vessel_id: i64,

        /// Path to the telemetry CSV
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Propeller pitch for slip ratio calculation
        #[arg(short, long, default_value_t = DEFAULT_PITCH)]
        pitch: f64,

        /// CII-relevant tonnage (DWT or GT); omit to skip CII computation
        #[arg(short, long)]
        capacity: Option<f64>,
    },
    /// Show one upload job by id
    Status {
        #[arg(value_name = "UPLOAD_ID")]
        upload_id: i64,
    },
    /// List a vessel's upload jobs, newest first
    History {
        #[arg(short, long)]
        vessel_id: i64,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print a vessel's per-day aggregates as JSON, newest first
    Daily {
        #[arg(short, long)]
        vessel_id: i64,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Rate an observed CII value against the reference curve
    Rate {
        /// Observed CII value
        #[arg(value_name = "VALUE")]
        value: f64,

        #[arg(short, long)]
        year: i32,

        /// Ship type code, e.g. I001
        #[arg(short, long)]
        ship_type: String,

        /// Deadweight tonnage
        #[arg(long, default_value_t = 0.0)]
        dwt: f64,

        /// Gross tonnage
        #[arg(long, default_value_t = 0.0)]
        gt: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/vessel_cii_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("vessel_cii_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let jobs_db = env_path("JOBS_DB", "data/jobs.db");
    let analytics_db = env_path("ANALYTICS_DB", "data/analytics.db");
    ensure_parent(&jobs_db)?;
    ensure_parent(&analytics_db)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Upload {
            vessel_id,
            file,
            pitch,
            capacity,
        } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let file_name = file
                .file_name()
                .and_then(OsStr::to_str)
                .unwrap_or_default();
            validate_upload(file_name, &bytes)?;

            let upload_dir = env_path("DATA_DIR", "uploads");
            let stored_path =
                supervisor::save_upload_file(&bytes, &format!("vessel_{vessel_id}"), &upload_dir)?;

            let jobs = JobStore::open(&jobs_db)?;
            let job = jobs.create(vessel_id, stored_path.to_str().unwrap_or_default())?;
            info!(upload_id = job.id, vessel_id, "upload accepted");

            let handle = supervisor::spawn(
                jobs_db,
                analytics_db,
                EmissionFactors::default(),
                JobRequest {
                    upload_id: job.id,
                    vessel_id,
                    file_path: stored_path,
                    pitch,
                    capacity,
                },
            );
            // The job's outcome is only ever the persisted status; awaiting
            // here just keeps the process alive until it lands.
            let _ = handle.await;

            println!("{}", serde_json::to_string(&job)?);
        }
        Commands::Status { upload_id } => {
            let jobs = JobStore::open(&jobs_db)?;
            match jobs.get(upload_id)? {
                Some(job) => println!("{}", serde_json::to_string_pretty(&job)?),
                None => bail!("upload {upload_id} not found"),
            }
        }
        Commands::History {
            vessel_id,
            offset,
            limit,
        } => {
            let jobs = JobStore::open(&jobs_db)?;
            let records = jobs.list_by_vessel(vessel_id, offset, limit)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::Daily {
            vessel_id,
            offset,
            limit,
        } => {
            let analytics = AnalyticsStore::open(&analytics_db)?;
            let rows = analytics.daily_rows(vessel_id, offset, limit)?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Commands::Rate {
            value,
            year,
            ship_type,
            dwt,
            gt,
        } => {
            let result = classify(value, year, &ship_type, dwt, gt);
            info!(rating = %result.rating, ship_type = %ship_type, year, "classified");
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn env_path(var: &str, default: &str) -> PathBuf {
    PathBuf::from(std::env::var(var).unwrap_or_else(|_| default.to_string()))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

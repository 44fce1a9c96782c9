//! End-to-end pipeline tests: file bytes through cleaning, aggregation, and
//! carbon intensity, observed through the persisted job state and the
//! analytical store.

use std::env;
use std::path::PathBuf;

use vessel_cii_rater::cii::factors::EmissionFactors;
use vessel_cii_rater::parser::validate_upload;
use vessel_cii_rater::pipeline::clean::DEFAULT_PITCH;
use vessel_cii_rater::store::{AnalyticsStore, JobStatus, JobStore};
use vessel_cii_rater::supervisor::{JobRequest, process_upload};

const SAMPLE: &str = include_str!("fixtures/telemetry_sample.csv");

fn temp_csv(name: &str, contents: &str) -> PathBuf {
    let path = env::temp_dir().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn run_upload(
    jobs: &JobStore,
    analytics: &mut AnalyticsStore,
    vessel_id: i64,
    path: &PathBuf,
    capacity: Option<f64>,
) -> i64 {
    let job = jobs.create(vessel_id, path.to_str().unwrap()).unwrap();
    let request = JobRequest {
        upload_id: job.id,
        vessel_id,
        file_path: path.clone(),
        pitch: DEFAULT_PITCH,
        capacity,
    };
    process_upload(jobs, analytics, &EmissionFactors::default(), &request);
    job.id
}

#[test]
fn test_full_pipeline_produces_rolling_cii() {
    let jobs = JobStore::open_in_memory().unwrap();
    let mut analytics = AnalyticsStore::open_in_memory().unwrap();
    let path = temp_csv("vessel_cii_rater_e2e_full.csv", SAMPLE);

    let upload_id = run_upload(&jobs, &mut analytics, 1, &path, Some(50_000.0));

    let job = jobs.get(upload_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.date_start, "2023-03-01".parse().ok());
    assert_eq!(job.date_end, "2023-03-02".parse().ok());
    assert!(job.completed_at.is_some());

    // 6 raw rows; the sentinel, the slow row, and the null row are cleaned out.
    assert_eq!(analytics.raw_row_count(1).unwrap(), 6);
    assert_eq!(analytics.standard_row_count(1).unwrap(), 3);

    let rows = analytics.daily_rows(1, 0, 10).unwrap();
    assert_eq!(rows.len(), 2);

    // Newest first: index 0 is Mar 2, index 1 is Mar 1.
    let (later, earlier) = (&rows[0], &rows[1]);
    assert_eq!(earlier.date.to_string(), "2023-03-01");
    assert_eq!(earlier.speed_water, Some(12.5));
    assert_eq!(earlier.me_hfo_act_cons, Some(2.5));

    assert!(earlier.cii_temp > 0.0);
    assert!(later.cii_temp > 0.0);

    // First date of the year present equals its own temp; the next day is
    // the running mean.
    assert!((earlier.cii - earlier.cii_temp).abs() < 1e-12);
    let expected = (earlier.cii_temp + later.cii_temp) / 2.0;
    assert!((later.cii - expected).abs() < 1e-12);

    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_empty_upload_rejected_before_job_creation() {
    let jobs = JobStore::open_in_memory().unwrap();

    // The intake check fails, so no job record is ever created.
    assert!(validate_upload("empty.csv", b"").is_err());
    assert!(jobs.list_by_vessel(1, 0, 10).unwrap().is_empty());
}

#[test]
fn test_unknown_column_fails_the_job() {
    let jobs = JobStore::open_in_memory().unwrap();
    let mut analytics = AnalyticsStore::open_in_memory().unwrap();
    let path = temp_csv(
        "vessel_cii_rater_e2e_badcol.csv",
        "date,warp_factor\n2023-03-01,9.0\n",
    );

    let upload_id = run_upload(&jobs, &mut analytics, 1, &path, None);

    let job = jobs.get(upload_id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let message = job.error_message.unwrap();
    assert!(message.contains("warp_factor"), "{message}");
    assert!(job.completed_at.is_some());

    // Nothing was written for the vessel.
    assert_eq!(analytics.raw_row_count(1).unwrap(), 0);

    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_backfilled_upload_corrects_rolling_average() {
    let jobs = JobStore::open_in_memory().unwrap();
    let mut analytics = AnalyticsStore::open_in_memory().unwrap();

    let march = temp_csv("vessel_cii_rater_e2e_march.csv", SAMPLE);
    run_upload(&jobs, &mut analytics, 1, &march, Some(50_000.0));

    // January arrives late, after March was already processed.
    let january = temp_csv(
        "vessel_cii_rater_e2e_jan.csv",
        "date,speed_water,me_rpm,draught_astern,draught_bow,me_hfo_act_cons\n\
         2023-01-15,10.0,70.0,5.0,6.0,2.0\n",
    );
    run_upload(&jobs, &mut analytics, 1, &january, Some(50_000.0));

    let rows = analytics.daily_rows(1, 0, 10).unwrap();
    assert_eq!(rows.len(), 3);

    // Oldest-first view of (cii_temp, cii) must obey the running mean across
    // the whole year regardless of upload order.
    let mut asc = rows.clone();
    asc.reverse();
    let mut sum = 0.0;
    for (i, day) in asc.iter().enumerate() {
        sum += day.cii_temp;
        let expected = sum / (i as f64 + 1.0);
        assert!(
            (day.cii - expected).abs() < 1e-12,
            "{}: {} vs {}",
            day.date,
            day.cii,
            expected
        );
    }

    std::fs::remove_file(march).unwrap();
    std::fs::remove_file(january).unwrap();
}

#[test]
fn test_year_boundary_resets_rolling_average() {
    let jobs = JobStore::open_in_memory().unwrap();
    let mut analytics = AnalyticsStore::open_in_memory().unwrap();

    let newyear = temp_csv(
        "vessel_cii_rater_e2e_newyear.csv",
        "date,speed_water,me_rpm,draught_astern,draught_bow,me_hfo_act_cons\n\
         2022-12-31,10.0,70.0,5.0,6.0,4.0\n\
         2023-01-01,10.0,70.0,5.0,6.0,2.0\n",
    );
    let upload_id = run_upload(&jobs, &mut analytics, 1, &newyear, Some(50_000.0));
    assert_eq!(jobs.get(upload_id).unwrap().unwrap().status, JobStatus::Done);

    let rows = analytics.daily_rows(1, 0, 10).unwrap();
    assert_eq!(rows.len(), 2);

    // The January row starts a fresh window: cii equals its own cii_temp and
    // ignores December entirely.
    let january = &rows[0];
    let december = &rows[1];
    assert_eq!(january.date.to_string(), "2023-01-01");
    assert!((january.cii - january.cii_temp).abs() < 1e-12);
    assert!((december.cii - december.cii_temp).abs() < 1e-12);
    assert!(december.cii_temp > january.cii_temp);

    std::fs::remove_file(newyear).unwrap();
}

#[test]
fn test_reupload_replaces_day_and_recomputes() {
    let jobs = JobStore::open_in_memory().unwrap();
    let mut analytics = AnalyticsStore::open_in_memory().unwrap();

    let first = temp_csv(
        "vessel_cii_rater_e2e_first.csv",
        "date,speed_water,me_rpm,draught_astern,draught_bow,me_hfo_act_cons\n\
         2023-05-01,10.0,70.0,5.0,6.0,4.0\n",
    );
    run_upload(&jobs, &mut analytics, 1, &first, Some(50_000.0));
    let before = analytics.daily_rows(1, 0, 10).unwrap()[0].cii_temp;

    // Same date again with half the consumption: the day is replaced, its
    // carbon figures recomputed from scratch.
    let second = temp_csv(
        "vessel_cii_rater_e2e_second.csv",
        "date,speed_water,me_rpm,draught_astern,draught_bow,me_hfo_act_cons\n\
         2023-05-01,10.0,70.0,5.0,6.0,2.0\n",
    );
    run_upload(&jobs, &mut analytics, 1, &second, Some(50_000.0));

    let rows = analytics.daily_rows(1, 0, 10).unwrap();
    assert_eq!(rows.len(), 1);
    assert!((rows[0].cii_temp - before / 2.0).abs() < 1e-12);
    assert!((rows[0].cii - rows[0].cii_temp).abs() < 1e-12);

    std::fs::remove_file(first).unwrap();
    std::fs::remove_file(second).unwrap();
}

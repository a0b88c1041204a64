//! Offline integration tests for the task orchestrator
//!
//! These run the pipeline in skip modes against a temp directory, so no
//! network, database, or object store is required.

use std::path::PathBuf;
use tempfile::tempdir;
use tripdata_common::catalog::{parse_months, parse_taxi_types, parse_years, Provider, TaxiType};
use tripdata_ingest::pipeline::{run, PipelineConfig};
use tripdata_ingest::retry::RetryPolicy;

fn offline_config(download_dir: PathBuf) -> PipelineConfig {
    PipelineConfig {
        taxi_types: vec![TaxiType::Yellow],
        years: vec![2024],
        months: vec![1],
        provider: Provider::Tlc,
        download_dir,
        prefix: String::new(),
        workers: 4,
        overwrite: true,
        keep_local: false,
        skip_download: true,
        skip_upload: true,
        retry: RetryPolicy::default(),
    }
}

#[test]
fn invalid_inputs_are_rejected_before_any_work() {
    // The CLI parses every list before a pipeline config can be built,
    // so an invalid value never produces a single task.
    assert!(parse_taxi_types("pink").is_err());
    assert!(parse_years("1999").is_err());
    assert!(parse_months("13").is_err());
}

#[tokio::test]
async fn months_all_expands_to_a_full_year_of_tasks() {
    let dir = tempdir().unwrap();
    let mut config = offline_config(dir.path().to_path_buf());
    config.months = parse_months("all").unwrap();

    assert_eq!(config.tasks().len(), 12);

    let summary = run(&config, None).await.unwrap();
    assert_eq!(summary.total_tasks, 12);
    assert_eq!(summary.missing_local, 12);
}

#[tokio::test]
async fn skip_download_collects_only_present_files() {
    let dir = tempdir().unwrap();
    let mut config = offline_config(dir.path().to_path_buf());
    config.months = vec![1, 2, 3];

    std::fs::write(dir.path().join("yellow_tripdata_2024-01.parquet"), b"jan").unwrap();
    std::fs::write(dir.path().join("yellow_tripdata_2024-03.parquet"), b"mar").unwrap();

    let summary = run(&config, None).await.unwrap();

    assert_eq!(summary.total_tasks, 3);
    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.missing_local, 1);
    assert_eq!(summary.upload_failed, 0);
}

#[tokio::test]
async fn skip_upload_leaves_local_files_in_place() {
    let dir = tempdir().unwrap();
    let config = offline_config(dir.path().to_path_buf());

    let file = dir.path().join("yellow_tripdata_2024-01.parquet");
    std::fs::write(&file, b"jan").unwrap();

    let summary = run(&config, None).await.unwrap();

    assert_eq!(summary.downloaded, 1);
    assert!(file.exists(), "skip-upload must not delete local files");
}

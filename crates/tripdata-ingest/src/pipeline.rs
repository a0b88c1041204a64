//! Download/publish task orchestrator
//!
//! Expands the Cartesian product of taxi types x years x months into
//! independent tasks and drives them through two strictly sequential
//! phases: download everything, then publish everything that landed.
//! Each phase runs over a bounded worker pool; a failed task is counted
//! and never aborts the batch.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tripdata_common::catalog::{Provider, Source, TaxiType};

use crate::fetch;
use crate::retry::RetryPolicy;
use crate::storage::{object_key, ObjectStore, PublishOutcome};

/// Orchestrator configuration, validated before any work starts
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub taxi_types: Vec<TaxiType>,
    pub years: Vec<u16>,
    pub months: Vec<u8>,
    pub provider: Provider,
    pub download_dir: PathBuf,
    pub prefix: String,
    pub workers: usize,
    pub overwrite: bool,
    pub keep_local: bool,
    pub skip_download: bool,
    pub skip_upload: bool,
    pub retry: RetryPolicy,
}

impl PipelineConfig {
    /// Cartesian product of taxi types x years x months
    pub fn tasks(&self) -> Vec<Source> {
        let mut tasks =
            Vec::with_capacity(self.taxi_types.len() * self.years.len() * self.months.len());

        for taxi_type in &self.taxi_types {
            for year in &self.years {
                for month in &self.months {
                    tasks.push(Source::new(self.provider, *taxi_type, *year, *month));
                }
            }
        }

        tasks
    }
}

/// Per-run counters; failures are reported here, never as process errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub total_tasks: usize,
    pub downloaded: usize,
    pub download_failed: usize,
    pub missing_local: usize,
    pub uploaded: usize,
    pub upload_skipped: usize,
    pub upload_failed: usize,
}

enum UploadStatus {
    Uploaded,
    Skipped,
    Failed,
}

/// Run the pipeline. `store` may be `None` only with `skip_upload` set.
pub async fn run(config: &PipelineConfig, store: Option<&ObjectStore>) -> Result<PipelineSummary> {
    std::fs::create_dir_all(&config.download_dir)?;

    let tasks = config.tasks();

    info!(
        taxi_types = ?config.taxi_types,
        years = ?config.years,
        months = ?config.months,
        source = %config.provider,
        download_dir = %config.download_dir.display(),
        prefix = %config.prefix,
        workers = config.workers,
        overwrite = config.overwrite,
        keep_local = config.keep_local,
        total_files = tasks.len(),
        "Pipeline configuration"
    );

    let mut summary = PipelineSummary {
        total_tasks: tasks.len(),
        ..Default::default()
    };

    // Phase 1: download (or collect what is already on disk)
    let local_files: Vec<PathBuf> = if config.skip_download {
        info!("Skip-download set, collecting already-downloaded files");

        let mut found = Vec::new();
        for task in &tasks {
            let path = config.download_dir.join(task.file_name());
            if path.exists() {
                found.push(path);
            } else {
                warn!(file = %task.file_name(), "File not found locally, will be skipped");
                summary.missing_local += 1;
            }
        }

        summary.downloaded = found.len();
        found
    } else {
        info!(
            total = tasks.len(),
            workers = config.workers,
            "Starting download phase"
        );

        let client = fetch::http_client()?;
        let results: Vec<Option<PathBuf>> = stream::iter(tasks.iter())
            .map(|source| {
                let client = client.clone();
                async move { fetch::fetch_task(&client, source, &config.download_dir).await }
            })
            .buffer_unordered(config.workers.max(1))
            .collect()
            .await;

        let files: Vec<PathBuf> = results.into_iter().flatten().collect();
        summary.downloaded = files.len();
        summary.download_failed = tasks.len() - files.len();

        info!(
            succeeded = summary.downloaded,
            failed = summary.download_failed,
            "Download phase complete"
        );

        files
    };

    // Phase 2: publish, strictly after every download has been attempted
    if config.skip_upload {
        info!("Skip-upload set, leaving files local");
        return Ok(summary);
    }

    let Some(store) = store else {
        anyhow::bail!("An object store is required unless skip_upload is set");
    };

    if local_files.is_empty() {
        warn!("No local files to upload");
        return Ok(summary);
    }

    info!(
        total = local_files.len(),
        workers = config.workers,
        "Starting publish phase"
    );

    let results: Vec<UploadStatus> = stream::iter(local_files.iter())
        .map(|path| async move {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                error!(path = %path.display(), "File name is not valid UTF-8");
                return UploadStatus::Failed;
            };

            let key = object_key(&config.prefix, name);

            match store
                .publish_file(path, &key, config.overwrite, &config.retry)
                .await
            {
                Ok(outcome) => {
                    if !config.keep_local {
                        match std::fs::remove_file(path) {
                            Ok(()) => info!(file = %name, "Deleted local file"),
                            Err(e) => warn!(file = %name, error = %e, "Failed to delete local file"),
                        }
                    }

                    match outcome {
                        PublishOutcome::Uploaded(_) => UploadStatus::Uploaded,
                        PublishOutcome::SkippedExists => UploadStatus::Skipped,
                    }
                },
                Err(e) => {
                    error!(key = %key, error = %e, "Gave up on upload");
                    UploadStatus::Failed
                },
            }
        })
        .buffer_unordered(config.workers.max(1))
        .collect()
        .await;

    for status in results {
        match status {
            UploadStatus::Uploaded => summary.uploaded += 1,
            UploadStatus::Skipped => summary.upload_skipped += 1,
            UploadStatus::Failed => summary.upload_failed += 1,
        }
    }

    info!(
        uploaded = summary.uploaded,
        skipped = summary.upload_skipped,
        failed = summary.upload_failed,
        "Publish phase complete"
    );

    Ok(summary)
}

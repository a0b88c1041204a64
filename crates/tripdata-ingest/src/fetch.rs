//! Trip file fetcher
//!
//! Downloads a single remote file to local storage. Re-runs are
//! idempotent: an existing destination file is never re-downloaded.
//! A failed download removes the partial file before reporting.

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::Client;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tripdata_common::catalog::Source;

use crate::progress;

/// Shared HTTP client for downloads
pub fn http_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")
}

/// Download `url` to `dest`, skipping when the file already exists.
///
/// On failure the partial file is removed and the error returned.
pub async fn fetch_url(client: &Client, url: &str, dest: &Path) -> Result<PathBuf> {
    if dest.exists() {
        info!(file = %dest.display(), "Already exists, skipping download");
        return Ok(dest.to_path_buf());
    }

    match download(client, url, dest).await {
        Ok(()) => Ok(dest.to_path_buf()),
        Err(e) => {
            if dest.exists() {
                let _ = std::fs::remove_file(dest);
            }
            Err(e)
        },
    }
}

/// Absence-signal wrapper used by the orchestrator: a failed download
/// is logged and reported as `None` so sibling tasks keep running.
pub async fn fetch_task(client: &Client, source: &Source, download_dir: &Path) -> Option<PathBuf> {
    let dest = download_dir.join(source.file_name());

    match fetch_url(client, &source.url(), &dest).await {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(source = %source, error = %e, "Download failed, skipping task");
            None
        },
    }
}

async fn download(client: &Client, url: &str, dest: &Path) -> Result<()> {
    info!(url = %url, "Downloading");

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to request {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to download {}: {}", url, response.status());
    }

    let total_size = response.content_length().unwrap_or(0);

    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| url.to_string());

    let pb = progress::create_download_progress(total_size, &format!("Downloading {}", file_name));

    let mut file = std::fs::File::create(dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("Failed to read body of {}", url))?;
        file.write_all(&chunk)
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    pb.finish_with_message(format!(
        "Downloaded {} ({})",
        file_name,
        progress::format_bytes(downloaded)
    ));

    Ok(())
}

//! tripdata-asset - windowed trip ingestion asset

use anyhow::{Context, Result};
use clap::Parser;
use parquet::arrow::ArrowWriter;
use std::fs::File;
use std::path::PathBuf;
use tracing::{info, warn};
use tripdata_asset::{materialize, AssetEnv};
use tripdata_common::logging::{init_logging, LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(name = "tripdata-asset")]
#[command(author, version, about = "Windowed trip-file ingestion asset")]
struct Cli {
    /// Write the materialized table to this Parquet file
    #[arg(short, long, env = "PIPELINE_OUTPUT")]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Environment variables take precedence over the verbose flag.
    let mut log_config = LogConfig::from_env()?;
    log_config.log_file_prefix = "tripdata-asset".to_string();
    if cli.verbose && std::env::var("TRIPDATA_LOG_LEVEL").is_err() {
        log_config.level = LogLevel::Debug;
    }
    init_logging(&log_config)?;

    let env = AssetEnv::from_env()?;
    let result = materialize(&env).await?;

    info!(
        rows = result.num_rows(),
        columns = result.num_columns(),
        "Materialized result"
    );

    if let Some(output) = cli.output {
        if result.num_rows() == 0 {
            warn!("Empty result, not writing output file");
            return Ok(());
        }

        let file = File::create(&output)
            .with_context(|| format!("Failed to create {}", output.display()))?;
        let mut writer = ArrowWriter::try_new(file, result.schema(), None)
            .context("Failed to open Parquet writer")?;
        writer.write(&result).context("Failed to write result")?;
        writer.close().context("Failed to finalize output file")?;

        info!(file = %output.display(), "Wrote Parquet output");
    }

    Ok(())
}

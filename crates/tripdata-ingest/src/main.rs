//! tripdata - NYC taxi trip data movement tool

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tripdata_common::catalog::{self, Provider, Source, TaxiType, VALID_YEARS};
use tripdata_common::logging::{init_logging, LogConfig, LogLevel};
use tripdata_common::TripdataError;
use tripdata_ingest::retry::RetryPolicy;
use tripdata_ingest::{db, fetch, pipeline, read, storage};

#[derive(Parser, Debug)]
#[command(name = "tripdata")]
#[command(author, version, about = "NYC taxi trip data movement tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download trip files and publish them to object storage
    Publish(PublishArgs),

    /// Download one monthly trip file and bulk-load it into PostgreSQL
    Load(LoadArgs),
}

#[derive(Args, Debug)]
struct PublishArgs {
    /// Destination bucket (created when missing)
    #[arg(long)]
    bucket: String,

    /// Comma-separated taxi types: green, yellow, fhv, fhvhv
    #[arg(long, default_value = "green")]
    taxi_types: String,

    /// Comma-separated years (2019-2024)
    #[arg(long, default_value = "2024")]
    years: String,

    /// Comma-separated months (1-12) or 'all'
    #[arg(long, default_value = "all")]
    months: String,

    /// Data source: 'tlc' (Parquet CDN) or 'dtc' (CSV.GZ mirror)
    #[arg(long, default_value = "tlc")]
    source: String,

    /// Local directory for downloaded files
    #[arg(long, default_value = "./data")]
    download_dir: PathBuf,

    /// Optional key prefix inside the bucket, e.g. 'raw/green'
    #[arg(long, default_value = "")]
    prefix: String,

    /// Number of parallel download/upload workers
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Custom object store endpoint (MinIO); falls back to S3_ENDPOINT
    #[arg(long)]
    endpoint: Option<String>,

    /// Object store region; falls back to S3_REGION
    #[arg(long)]
    region: Option<String>,

    /// Named AWS credentials profile; omit to use ambient credentials
    #[arg(long)]
    profile: Option<String>,

    /// Skip downloading; publish files already in the download dir
    #[arg(long)]
    skip_download: bool,

    /// Skip publishing; only download files locally
    #[arg(long)]
    skip_upload: bool,

    /// Do not re-upload objects that already exist
    #[arg(long)]
    no_overwrite: bool,

    /// Keep local files after a successful publish
    #[arg(long)]
    keep_local: bool,
}

#[derive(Args, Debug)]
struct LoadArgs {
    /// Destination table name
    #[arg(long, default_value = "green_taxi_data")]
    table: String,

    /// Taxi type: green, yellow, fhv, fhvhv
    #[arg(long, default_value = "green")]
    taxi_type: String,

    /// Year of data (2019-2024)
    #[arg(long, default_value_t = 2024)]
    year: u16,

    /// Month of data (1-12)
    #[arg(long, default_value_t = 1)]
    month: u8,

    /// Data source: 'tlc' (Parquet CDN) or 'dtc' (CSV.GZ mirror)
    #[arg(long, default_value = "tlc")]
    source: String,

    /// Rows per ingestion batch
    #[arg(long, default_value_t = read::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Local directory for downloaded files
    #[arg(long, default_value = "./data")]
    download_dir: PathBuf,

    /// Custom URL overriding the catalog-derived one
    #[arg(long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Environment variables take precedence over the verbose flag.
    let mut log_config = LogConfig::from_env()?;
    if cli.verbose && std::env::var("TRIPDATA_LOG_LEVEL").is_err() {
        log_config.level = LogLevel::Debug;
    }
    init_logging(&log_config)?;

    match cli.command {
        Command::Publish(args) => run_publish(args).await,
        Command::Load(args) => run_load(args).await,
    }
}

async fn run_publish(args: PublishArgs) -> Result<()> {
    // Validate every discrete input before any network call.
    let taxi_types = catalog::parse_taxi_types(&args.taxi_types)?;
    let years = catalog::parse_years(&args.years)?;
    let months = catalog::parse_months(&args.months)?;
    let provider: Provider = args.source.parse()?;

    let config = pipeline::PipelineConfig {
        taxi_types,
        years,
        months,
        provider,
        download_dir: args.download_dir,
        prefix: args.prefix,
        workers: args.workers,
        overwrite: !args.no_overwrite,
        keep_local: args.keep_local,
        skip_download: args.skip_download,
        skip_upload: args.skip_upload,
        retry: RetryPolicy::default(),
    };

    let store = if args.skip_upload {
        None
    } else {
        let mut store_config = storage::ObjectStoreConfig::from_env(&args.bucket);
        if let Some(endpoint) = args.endpoint {
            store_config.endpoint = Some(endpoint);
        }
        if let Some(region) = args.region {
            store_config.region = region;
        }
        if let Some(profile) = args.profile {
            store_config.profile = Some(profile);
        }

        let store = storage::ObjectStore::new(store_config).await?;
        store.ensure_bucket().await?;
        Some(store)
    };

    let summary = pipeline::run(&config, store.as_ref()).await?;

    info!(
        total = summary.total_tasks,
        downloaded = summary.downloaded,
        download_failed = summary.download_failed,
        uploaded = summary.uploaded,
        upload_skipped = summary.upload_skipped,
        upload_failed = summary.upload_failed,
        "Done"
    );

    Ok(())
}

async fn run_load(args: LoadArgs) -> Result<()> {
    let taxi_type: TaxiType = args.taxi_type.parse()?;
    let provider: Provider = args.source.parse()?;

    if !VALID_YEARS.contains(&args.year) {
        return Err(TripdataError::invalid_input(
            "years",
            args.year.to_string(),
            format!("{}-{}", VALID_YEARS.start(), VALID_YEARS.end()),
        )
        .into());
    }
    if !(1..=12).contains(&args.month) {
        return Err(TripdataError::invalid_input("months", args.month.to_string(), "1-12").into());
    }

    let source = Source::new(provider, taxi_type, args.year, args.month);

    let (url, file_name) = match &args.url {
        Some(url) => {
            let name = url
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .unwrap_or_else(|| source.file_name());
            (url.clone(), name)
        },
        None => (source.url(), source.file_name()),
    };

    std::fs::create_dir_all(&args.download_dir)?;

    let client = fetch::http_client()?;
    let path = fetch::fetch_url(&client, &url, &args.download_dir.join(&file_name)).await?;

    let db_config = db::DatabaseConfig::from_env();
    info!(
        host = %db_config.host,
        port = db_config.port,
        database = %db_config.database,
        "Connecting to PostgreSQL"
    );
    let pool = db::connect(&db_config).await?;

    let reader = read::BatchReader::open(&path, args.batch_size)?;
    let report = db::BulkWriter::new(pool).load(reader, &args.table).await?;

    info!(
        table = %report.table,
        batches = report.batches,
        rows = report.rows,
        "Ingestion complete"
    );

    Ok(())
}

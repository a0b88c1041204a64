//! Windowed trip-file ingestion asset
//!
//! Reads a half-open date window and a taxi-type list from the
//! environment, fetches every covered month's Parquet file from the TLC
//! CDN into memory, tags each batch with extraction metadata, and
//! returns the concatenation of everything fetched. A month that cannot
//! be fetched is logged and skipped; a window with no available data
//! produces an empty (zero-row) result rather than an error.
//!
//! # Environment contract
//!
//! - `PIPELINE_START_DATE` (required): ISO date, window start, inclusive
//! - `PIPELINE_END_DATE` (required): ISO date, window end, exclusive
//! - `PIPELINE_VARS` (optional): JSON object; `taxi_types` supplies the
//!   taxi-type list, defaulting to `["yellow"]` when absent or malformed

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, StringArray};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tripdata_common::catalog::{Provider, Source, TaxiType};
use tripdata_common::window::months_in_window;

/// Per-request timeout for monthly file fetches
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Asset inputs resolved from the environment
#[derive(Debug, Clone)]
pub struct AssetEnv {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub taxi_types: Vec<TaxiType>,
}

impl AssetEnv {
    pub fn from_env() -> Result<Self> {
        let start = required_date("PIPELINE_START_DATE")?;
        let end = required_date("PIPELINE_END_DATE")?;
        let taxi_types = taxi_types_from_vars(std::env::var("PIPELINE_VARS").ok().as_deref());

        Ok(Self {
            start,
            end,
            taxi_types,
        })
    }
}

fn required_date(var: &str) -> Result<NaiveDate> {
    let raw = std::env::var(var).map_err(|_| anyhow::anyhow!("{} must be set", var))?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .with_context(|| format!("{} is not an ISO date: {}", var, raw))
}

/// Extract `taxi_types` from the JSON variable bag, defaulting to
/// yellow when the bag is absent, malformed, or names no known type.
pub fn taxi_types_from_vars(raw: Option<&str>) -> Vec<TaxiType> {
    let fallback = vec![TaxiType::Yellow];

    let Some(raw) = raw else {
        return fallback;
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        warn!("PIPELINE_VARS is not valid JSON, defaulting to yellow");
        return fallback;
    };
    let Some(list) = value.get("taxi_types").and_then(|v| v.as_array()) else {
        return fallback;
    };

    let parsed: Vec<TaxiType> = list
        .iter()
        .filter_map(|v| v.as_str())
        .filter_map(|s| s.parse().ok())
        .collect();

    if parsed.is_empty() {
        fallback
    } else {
        parsed
    }
}

/// Fetch and concatenate every (taxi type, window month) trip file.
///
/// The result carries two extra columns: `extracted_at` (one ISO-8601
/// instant for the whole run) and `source_file` (the remote file name).
/// Mismatched schemas across fetched months are an explicit error.
pub async fn materialize(env: &AssetEnv) -> Result<RecordBatch> {
    let months = months_in_window(env.start, env.end);
    let extracted_at = Utc::now().to_rfc3339();

    info!(
        start = %env.start,
        end = %env.end,
        months = months.len(),
        taxi_types = ?env.taxi_types,
        "Materializing trip window"
    );

    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;

    let mut batches: Vec<RecordBatch> = Vec::new();

    for taxi_type in &env.taxi_types {
        for (year, month) in &months {
            let source = Source::new(Provider::Tlc, *taxi_type, *year, *month);

            let data = match fetch_month(&client, &source).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(source = %source, error = %e, "Skipping month");
                    continue;
                },
            };

            let tagged = read_tagged(data, &source.file_name(), &extracted_at)?;
            batches.extend(tagged);
        }
    }

    if batches.is_empty() {
        info!("No months fetched, returning empty result");
        return Ok(empty_result());
    }

    let schema = batches[0].schema();
    let combined = concat_batches(&schema, &batches)
        .context("Fetched months have mismatched schemas")?;

    info!(rows = combined.num_rows(), "Concatenated fetched months");
    Ok(combined)
}

async fn fetch_month(client: &reqwest::Client, source: &Source) -> Result<Bytes> {
    let url = source.url();
    let response = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Failed to request {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("{} returned status {}", url, response.status());
    }

    response
        .bytes()
        .await
        .with_context(|| format!("Failed to read body of {}", url))
}

/// Decode an in-memory Parquet file into tagged record batches
pub fn read_tagged(data: Bytes, file_name: &str, extracted_at: &str) -> Result<Vec<RecordBatch>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(data)
        .with_context(|| format!("Failed to read parquet metadata of {}", file_name))?
        .build()
        .with_context(|| format!("Failed to decode {}", file_name))?;

    let mut batches = Vec::new();
    for batch in reader {
        let batch = batch.with_context(|| format!("Failed to decode batch of {}", file_name))?;
        batches.push(tag_batch(&batch, file_name, extracted_at)?);
    }

    Ok(batches)
}

/// Append the `extracted_at` and `source_file` metadata columns
pub fn tag_batch(batch: &RecordBatch, file_name: &str, extracted_at: &str) -> Result<RecordBatch> {
    let rows = batch.num_rows();

    let mut fields: Vec<FieldRef> = batch.schema().fields().iter().cloned().collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();

    fields.push(Arc::new(Field::new("extracted_at", DataType::Utf8, false)));
    columns.push(Arc::new(StringArray::from(vec![extracted_at; rows])));

    fields.push(Arc::new(Field::new("source_file", DataType::Utf8, false)));
    columns.push(Arc::new(StringArray::from(vec![file_name; rows])));

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("Failed to append metadata columns")
}

/// Zero-row result for a window with no available data
pub fn empty_result() -> RecordBatch {
    RecordBatch::new_empty(Arc::new(Schema::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Float64Array, Int64Array};
    use parquet::arrow::ArrowWriter;

    fn sample_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("vendor_id", DataType::Int64, false),
            Field::new("fare_amount", DataType::Float64, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 1])),
                Arc::new(Float64Array::from(vec![10.5, 7.25, 33.0])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_taxi_types_default_when_absent() {
        assert_eq!(taxi_types_from_vars(None), vec![TaxiType::Yellow]);
    }

    #[test]
    fn test_taxi_types_default_when_malformed() {
        assert_eq!(taxi_types_from_vars(Some("not json")), vec![TaxiType::Yellow]);
        assert_eq!(taxi_types_from_vars(Some("{}")), vec![TaxiType::Yellow]);
        assert_eq!(
            taxi_types_from_vars(Some(r#"{"taxi_types": ["pink"]}"#)),
            vec![TaxiType::Yellow]
        );
    }

    #[test]
    fn test_taxi_types_from_valid_vars() {
        let parsed = taxi_types_from_vars(Some(r#"{"taxi_types": ["green", "fhv"]}"#));
        assert_eq!(parsed, vec![TaxiType::Green, TaxiType::Fhv]);
    }

    #[test]
    fn test_tag_batch_appends_metadata_columns() {
        let batch = sample_batch();
        let tagged = tag_batch(&batch, "yellow_tripdata_2024-01.parquet", "2024-03-01T00:00:00Z")
            .unwrap();

        assert_eq!(tagged.num_rows(), 3);
        assert_eq!(tagged.num_columns(), 4);

        let schema = tagged.schema();
        assert_eq!(schema.field(2).name(), "extracted_at");
        assert_eq!(schema.field(3).name(), "source_file");

        let source_file = tagged
            .column(3)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(source_file.value(0), "yellow_tripdata_2024-01.parquet");
        assert_eq!(source_file.value(2), "yellow_tripdata_2024-01.parquet");
    }

    #[test]
    fn test_read_tagged_round_trips_parquet_bytes() {
        let batch = sample_batch();

        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let batches = read_tagged(
            Bytes::from(buffer),
            "yellow_tripdata_2024-01.parquet",
            "2024-03-01T00:00:00Z",
        )
        .unwrap();

        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 3);
        assert!(batches.iter().all(|b| b.num_columns() == 4));
    }

    #[tokio::test]
    async fn test_empty_window_returns_zero_rows() {
        let env = AssetEnv {
            start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            taxi_types: vec![TaxiType::Yellow],
        };

        // Zero window months means no fetch is attempted at all.
        let result = materialize(&env).await.unwrap();
        assert_eq!(result.num_rows(), 0);
    }
}

//! Local tabular files as Arrow record batch streams
//!
//! Opens a Parquet, CSV, or gzip-compressed CSV trip file as an iterator
//! of fixed-size `RecordBatch`es. CSV schemas are inferred from a bounded
//! sample in a first pass; the file is then reopened for reading.

use anyhow::{Context, Result};
use arrow::csv;
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchReader};
use flate2::read::GzDecoder;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Default rows per batch for bulk ingestion
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// Rows sampled for CSV schema inference
const CSV_INFER_SAMPLE: usize = 1000;

/// Batch iterator over a local trip file
pub enum BatchReader {
    Parquet(ParquetRecordBatchReader),
    Csv(csv::Reader<Box<dyn Read + Send>>),
}

impl BatchReader {
    /// Open `path` with a format chosen by file extension:
    /// `.parquet`, `.csv`, or `.csv.gz`.
    pub fn open(path: &Path, batch_size: usize) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if name.ends_with(".parquet") {
            Self::open_parquet(path, batch_size)
        } else if name.ends_with(".csv.gz") || name.ends_with(".csv") {
            Self::open_csv(path, batch_size, name.ends_with(".gz"))
        } else {
            anyhow::bail!("Unsupported file format: {}", path.display());
        }
    }

    fn open_parquet(path: &Path, batch_size: usize) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .with_context(|| format!("Failed to read parquet metadata of {}", path.display()))?
            .with_batch_size(batch_size)
            .build()
            .with_context(|| format!("Failed to open parquet reader for {}", path.display()))?;

        Ok(BatchReader::Parquet(reader))
    }

    fn open_csv(path: &Path, batch_size: usize, gzipped: bool) -> Result<Self> {
        // Pass 1: infer the schema from a bounded sample.
        let format = csv::reader::Format::default().with_header(true);
        let (schema, _) = format
            .infer_schema(csv_reader(path, gzipped)?, Some(CSV_INFER_SAMPLE))
            .with_context(|| format!("Failed to infer CSV schema of {}", path.display()))?;

        debug!(
            file = %path.display(),
            columns = schema.fields().len(),
            "Inferred CSV schema"
        );

        // Pass 2: reopen and read with the inferred schema.
        let reader = csv::ReaderBuilder::new(Arc::new(schema))
            .with_header(true)
            .with_batch_size(batch_size)
            .build(csv_reader(path, gzipped)?)
            .with_context(|| format!("Failed to open CSV reader for {}", path.display()))?;

        Ok(BatchReader::Csv(reader))
    }

    /// Schema of the batches this reader yields
    pub fn schema(&self) -> SchemaRef {
        match self {
            BatchReader::Parquet(reader) => reader.schema(),
            BatchReader::Csv(reader) => reader.schema(),
        }
    }
}

impl Iterator for BatchReader {
    type Item = std::result::Result<RecordBatch, ArrowError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            BatchReader::Parquet(reader) => reader.next(),
            BatchReader::Csv(reader) => reader.next(),
        }
    }
}

fn csv_reader(path: &Path, gzipped: bool) -> Result<Box<dyn Read + Send>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    if gzipped {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use parquet::arrow::ArrowWriter;
    use std::io::Write;

    const SAMPLE_CSV: &str = "\
vendor_id,fare_amount,store_and_fwd_flag
1,10.5,N
2,7.25,Y
1,33.0,N
";

    #[test]
    fn test_csv_schema_inference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.csv");
        std::fs::write(&path, SAMPLE_CSV).unwrap();

        let reader = BatchReader::open(&path, 2).unwrap();
        let schema = reader.schema();

        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert_eq!(schema.field(1).data_type(), &DataType::Float64);
        assert_eq!(schema.field(2).data_type(), &DataType::Utf8);
    }

    #[test]
    fn test_csv_batching() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.csv");
        std::fs::write(&path, SAMPLE_CSV).unwrap();

        let batches: Vec<_> = BatchReader::open(&path, 2)
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].num_rows(), 2);
        assert_eq!(batches[1].num_rows(), 1);
    }

    #[test]
    fn test_gzipped_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.csv.gz");

        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(SAMPLE_CSV.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let rows: usize = BatchReader::open(&path, 100)
            .unwrap()
            .map(|b| b.unwrap().num_rows())
            .sum();

        assert_eq!(rows, 3);
    }

    #[test]
    fn test_parquet_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("vendor_id", DataType::Int64, false),
            Field::new("zone", DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 2])),
                Arc::new(StringArray::from(vec!["JFK", "Midtown", "Harlem"])),
            ],
        )
        .unwrap();

        let file = File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema.clone(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let reader = BatchReader::open(&path, 2).unwrap();
        assert_eq!(reader.schema().fields(), schema.fields());

        let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(rows, 3);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.json");
        std::fs::write(&path, "{}").unwrap();

        assert!(BatchReader::open(&path, 10).is_err());
    }
}

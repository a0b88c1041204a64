//! Tripdata ingestion library
//!
//! Data-movement building blocks for NYC taxi trip files:
//!
//! - [`fetch`]: idempotent HTTP downloads to local disk
//! - [`read`]: local Parquet/CSV files as Arrow record batch streams
//! - [`db`]: chunked bulk loading into PostgreSQL
//! - [`storage`]: S3-compatible object store publishing with retries
//! - [`pipeline`]: the download/publish task orchestrator

pub mod checksum;
pub mod db;
pub mod fetch;
pub mod pipeline;
pub mod progress;
pub mod read;
pub mod retry;
pub mod storage;

//! Tripdata Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the tripdata workspace.
//!
//! # Overview
//!
//! This crate provides common functionality used across all tripdata
//! workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Source Catalog**: Taxi trip file providers, URL and file-name derivation
//! - **Date Windows**: Month enumeration for half-open date ranges
//! - **Logging**: Centralized tracing configuration
//!
//! # Example
//!
//! ```no_run
//! use tripdata_common::catalog::{Provider, Source, TaxiType};
//!
//! let source = Source::new(Provider::Tlc, TaxiType::Yellow, 2024, 1);
//! println!("{} -> {}", source.url(), source.file_name());
//! ```

pub mod catalog;
pub mod error;
pub mod logging;
pub mod window;

// Re-export commonly used types
pub use error::{Result, TripdataError};

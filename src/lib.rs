// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Playlog ETL
//!
//! Batch job that turns a catalog of playable items and a log of user
//! activity, both stored as JSON, into five analytical tables written as
//! partitioned Parquet.
//!
//! ## Features
//!
//! - **Embedded engine**: DuckDB reads JSON and writes Parquet in-process
//! - **Local or S3 storage**: Input and output roots are paths or `s3://` URIs
//! - **Append or overwrite**: Reruns add files or replace each table
//! - **Completion markers**: `_SUCCESS` per table gates the activity stage
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use playlog_etl::{JobConfig, Pipeline, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = JobConfig::load(Some("job.yaml".as_ref()))?;
//!     let report = Pipeline::new(config)?.run().await?;
//!     println!("{} facts", report.rows(playlog_etl::OutputTable::Facts));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Pipeline                            │
//! │   catalog stage ──CatalogOutput──▶ activity stage            │
//! └──────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────┬────────────────┴─────┬─────────────────────────┐
//! │   Session   │        Output        │         Config          │
//! ├─────────────┼──────────────────────┼─────────────────────────┤
//! │ read_json   │ COPY .. PARTITION_BY │ YAML + CLI overrides    │
//! │ httpfs/S3   │ _SUCCESS markers     │ [AWS] credentials file  │
//! └─────────────┴──────────────────────┴─────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Job configuration
pub mod config;

/// Storage credentials file
pub mod credentials;

/// Embedded query session
pub mod session;

/// Parquet output, storage roots and completion markers
pub mod output;

/// Catalog and activity stages
pub mod pipeline;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::JobConfig;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, RunReport};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

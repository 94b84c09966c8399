//! Output module
//!
//! Handles table placement in storage and partitioned Parquet writes.
//!
//! # Overview
//!
//! This module provides:
//! - Storage URI parsing and normalization (S3 and local)
//! - Object-store access for markers and overwrite cleanup
//! - Partitioned Parquet writes through the engine session
//! - Per-table completion markers

mod cloud;
mod marker;
mod writer;

pub use cloud::{StorageRoot, StorageUri};
pub use marker::{CompletionMarker, MARKER_FILE};
pub use writer::{TableWriter, WriteOptions, WrittenTable};

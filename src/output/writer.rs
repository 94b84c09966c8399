//! Partitioned Parquet writer
//!
//! Writes a session table to Hive-partitioned Parquet through the engine's
//! `COPY ... TO` statement. Every write produces files named
//! `part-<uuid>.parquet`, so writing into a directory that already holds
//! data adds files next to the old ones (append) instead of replacing them.

use super::cloud::StorageRoot;
use super::marker::CompletionMarker;
use crate::config::OutputConfig;
use crate::error::Result;
use crate::session::{quote_literal, Session};
use crate::types::{Compression, OutputTable, WriteMode};
use std::time::Instant;

/// Configuration for table writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    compression: Compression,
    row_group_size: usize,
    mode: WriteMode,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Snappy,
            row_group_size: 122_880,
            mode: WriteMode::Append,
        }
    }
}

impl WriteOptions {
    /// Create options with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the job's output section and write mode
    pub fn from_config(output: &OutputConfig, mode: WriteMode) -> Self {
        Self {
            compression: output.compression,
            row_group_size: output.row_group_size,
            mode,
        }
    }

    /// Set compression codec
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Set write mode
    #[must_use]
    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    /// Write mode
    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Build the `COPY` statement writing `source` to `target_uri`
    pub fn copy_statement(&self, source: &str, target_uri: &str, partition_by: &[&str]) -> String {
        let mut options = vec![
            "FORMAT PARQUET".to_string(),
            format!("COMPRESSION {}", quote_literal(self.compression.as_engine_str())),
            format!("ROW_GROUP_SIZE {}", self.row_group_size),
        ];
        if !partition_by.is_empty() {
            options.push(format!("PARTITION_BY ({})", partition_by.join(", ")));
            // Existing partition directories are written into, never cleared here
            options.push("OVERWRITE_OR_IGNORE".to_string());
            options.push("FILENAME_PATTERN 'part-{uuid}'".to_string());
        }

        format!(
            "COPY (SELECT * FROM {source}) TO {} ({});",
            quote_literal(target_uri),
            options.join(", ")
        )
    }
}

/// Outcome of writing one table
#[derive(Debug, Clone)]
pub struct WrittenTable {
    /// Which table
    pub table: OutputTable,
    /// Rows written
    pub rows: usize,
    /// Engine-facing URI of the table directory
    pub location: String,
    /// Files removed beforehand (overwrite mode)
    pub removed_files: usize,
    /// Wall time of the write in milliseconds
    pub write_ms: u64,
}

/// Writes session tables under an output root
pub struct TableWriter<'a> {
    session: &'a Session,
    root: &'a StorageRoot,
    options: WriteOptions,
}

impl<'a> TableWriter<'a> {
    /// Create a new writer
    pub fn new(session: &'a Session, root: &'a StorageRoot, options: WriteOptions) -> Self {
        Self {
            session,
            root,
            options,
        }
    }

    /// Output root
    pub fn root(&self) -> &StorageRoot {
        self.root
    }

    /// Write options
    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Write a table, then mark it complete
    pub async fn write(&self, table: OutputTable) -> Result<WrittenTable> {
        let start = Instant::now();
        let dir = table.dir_name();
        let location = self.root.uri_of(dir);

        let removed_files = match self.options.mode {
            WriteMode::Overwrite => {
                let removed = self.root.delete_dir(dir).await?;
                if removed > 0 {
                    tracing::info!("Removed {removed} existing files from {location}");
                }
                removed
            }
            WriteMode::Append => 0,
        };

        let rows = self.session.table_rows(table.session_table())?;
        let sql =
            self.options
                .copy_statement(table.session_table(), &location, table.partition_columns());
        self.session
            .execute(&format!("writing {table} table"), &sql)?;

        CompletionMarker::now(table, rows, self.options.mode)
            .write(self.root, table)
            .await?;

        let write_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            table = %table,
            rows,
            write_ms,
            mode = %self.options.mode,
            "Wrote {table} table to {location}"
        );

        Ok(WrittenTable {
            table,
            rows,
            location,
            removed_files,
            write_ms,
        })
    }
}

//! Table completion markers
//!
//! After a table write finishes, a `_SUCCESS` object is written into the
//! table directory. Later stages (or a separate process) check for it
//! instead of inferring completion from the presence of data files.

use super::cloud::StorageRoot;
use crate::error::{Error, Result};
use crate::types::{OutputTable, WriteMode};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File name of the marker inside each table directory
pub const MARKER_FILE: &str = "_SUCCESS";

/// Body of a `_SUCCESS` marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionMarker {
    /// Table directory name
    pub table: String,
    /// Rows written by the run that created the marker
    pub rows: usize,
    /// Write mode of that run
    pub write_mode: WriteMode,
    /// When the write finished
    pub completed_at: DateTime<Utc>,
}

impl CompletionMarker {
    /// Marker for a table write finishing now
    pub fn now(table: OutputTable, rows: usize, write_mode: WriteMode) -> Self {
        Self {
            table: table.dir_name().to_string(),
            rows,
            write_mode,
            completed_at: Utc::now(),
        }
    }

    /// Relative path of the marker for a table
    pub fn path_for(table: OutputTable) -> String {
        format!("{}/{MARKER_FILE}", table.dir_name())
    }

    /// Write this marker under the root
    pub async fn write(&self, root: &StorageRoot, table: OutputTable) -> Result<String> {
        let body = serde_json::to_vec(self)?;
        root.put(&Self::path_for(table), Bytes::from(body)).await
    }

    /// Read a table's marker, `None` when the table never completed
    pub async fn read(root: &StorageRoot, table: OutputTable) -> Result<Option<Self>> {
        let Some(body) = root.get(&Self::path_for(table)).await? else {
            return Ok(None);
        };
        let marker = serde_json::from_slice(&body).map_err(|e| {
            Error::output(format!(
                "Corrupt completion marker for {table}: {e}"
            ))
        })?;
        Ok(Some(marker))
    }

    /// Read a table's marker, failing when it is absent
    pub async fn require(root: &StorageRoot, table: OutputTable) -> Result<Self> {
        Self::read(root, table).await?.ok_or_else(|| {
            Error::stage_incomplete(table.stage().to_string(), root.uri_of(&Self::path_for(table)))
        })
    }
}

//! Common types used throughout playlog-etl
//!
//! This module contains shared type definitions used across the
//! configuration, session, output and pipeline modules.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Write Mode
// ============================================================================

/// How table data should be written to the destination
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Add new files next to whatever is already there
    #[default]
    Append,
    /// Remove the table's existing files before writing
    Overwrite,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Append => f.write_str("append"),
            WriteMode::Overwrite => f.write_str("overwrite"),
        }
    }
}

// ============================================================================
// Compression
// ============================================================================

/// Parquet compression codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    #[default]
    Snappy,
    Zstd,
    Gzip,
    Uncompressed,
}

impl Compression {
    /// Codec name as understood by the engine's Parquet writer
    pub fn as_engine_str(self) -> &'static str {
        match self {
            Compression::Snappy => "snappy",
            Compression::Zstd => "zstd",
            Compression::Gzip => "gzip",
            Compression::Uncompressed => "uncompressed",
        }
    }
}

// ============================================================================
// Stages
// ============================================================================

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Catalog,
    Activity,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Catalog => f.write_str("catalog"),
            Stage::Activity => f.write_str("activity"),
        }
    }
}

// ============================================================================
// Output Tables
// ============================================================================

/// The five analytical tables produced by the job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputTable {
    /// Catalog entities (one row per distinct entry)
    Entities,
    /// Attributes of the parent of each entity
    Attributes,
    /// Users seen in play events
    Actors,
    /// Calendar decomposition of play timestamps
    Time,
    /// One row per play event
    Facts,
}

impl OutputTable {
    /// All tables in write order
    pub const ALL: [OutputTable; 5] = [
        OutputTable::Entities,
        OutputTable::Attributes,
        OutputTable::Actors,
        OutputTable::Time,
        OutputTable::Facts,
    ];

    /// Name of the engine table holding the rows during a run
    pub fn session_table(self) -> &'static str {
        match self {
            OutputTable::Entities => "entities",
            OutputTable::Attributes => "attributes",
            OutputTable::Actors => "actors",
            OutputTable::Time => "time_dim",
            OutputTable::Facts => "facts",
        }
    }

    /// Directory under the output root
    pub fn dir_name(self) -> &'static str {
        match self {
            OutputTable::Entities => "entities",
            OutputTable::Attributes => "attributes",
            OutputTable::Actors => "actors",
            OutputTable::Time => "time",
            OutputTable::Facts => "facts",
        }
    }

    /// Columns used for Hive-style partition directories
    pub fn partition_columns(self) -> &'static [&'static str] {
        match self {
            OutputTable::Entities => &["year", "parent_id"],
            OutputTable::Attributes => &["name", "parent_id"],
            OutputTable::Actors => &["user_id"],
            OutputTable::Time | OutputTable::Facts => &["year", "month"],
        }
    }

    /// Stage that produces this table
    pub fn stage(self) -> Stage {
        match self {
            OutputTable::Entities | OutputTable::Attributes => Stage::Catalog,
            OutputTable::Actors | OutputTable::Time | OutputTable::Facts => Stage::Activity,
        }
    }
}

impl fmt::Display for OutputTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

// ============================================================================
// Time Zone
// ============================================================================

/// Time zone used to turn epoch timestamps into wall-clock time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeZone(String);

impl TimeZone {
    /// Create from an IANA name such as `America/New_York`
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Coordinated Universal Time
    pub fn utc() -> Self {
        Self("UTC".to_string())
    }

    /// The zone name
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether this zone is UTC (no extension needed for conversion)
    pub fn is_utc(&self) -> bool {
        matches!(
            self.0.to_ascii_uppercase().as_str(),
            "UTC" | "Z" | "GMT" | "ETC/UTC" | "+00:00"
        )
    }
}

impl Default for TimeZone {
    fn default() -> Self {
        Self::utc()
    }
}

impl fmt::Display for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_output_table_layout() {
        assert_eq!(OutputTable::Time.dir_name(), "time");
        assert_eq!(OutputTable::Time.session_table(), "time_dim");
        assert_eq!(
            OutputTable::Entities.partition_columns(),
            &["year", "parent_id"]
        );
        assert_eq!(
            OutputTable::Attributes.partition_columns(),
            &["name", "parent_id"]
        );
        assert_eq!(OutputTable::Actors.partition_columns(), &["user_id"]);
        assert_eq!(OutputTable::Facts.partition_columns(), &["year", "month"]);
    }

    #[test]
    fn test_output_table_stage() {
        let catalog: Vec<_> = OutputTable::ALL
            .iter()
            .filter(|t| t.stage() == Stage::Catalog)
            .collect();
        assert_eq!(catalog.len(), 2);
    }

    #[test_case("UTC", true)]
    #[test_case("utc", true)]
    #[test_case("Etc/UTC", true)]
    #[test_case("America/New_York", false)]
    #[test_case("Europe/Berlin", false)]
    fn test_timezone_is_utc(name: &str, expected: bool) {
        assert_eq!(TimeZone::new(name).is_utc(), expected);
    }

    #[test]
    fn test_write_mode_serde() {
        let mode: WriteMode = serde_yaml::from_str("overwrite").unwrap();
        assert_eq!(mode, WriteMode::Overwrite);
        assert_eq!(WriteMode::default(), WriteMode::Append);
        assert_eq!(WriteMode::Append.to_string(), "append");
    }

    #[test]
    fn test_compression_engine_name() {
        assert_eq!(Compression::default().as_engine_str(), "snappy");
        assert_eq!(Compression::Zstd.as_engine_str(), "zstd");
    }
}

//! Job configuration
//!
//! A job is described by a YAML file. Every field has a default, so an
//! absent or empty file yields the standard job: read the catalog and
//! activity JSON from the public input bucket and write all five tables
//! under `output/`.
//!
//! ```yaml
//! input_root: s3://udacity-dend/
//! output_root: s3://my-lake/
//! timezone: America/New_York
//! write_mode: overwrite
//! sources:
//!   catalog_path: catalog_data/A/A/B/*.json
//!   activity_path: activity_data/2018/11/*.json
//! engine:
//!   threads: 4
//!   memory_limit: 4GB
//! output:
//!   compression: zstd
//! ```

use crate::error::{Error, Result};
use crate::output::StorageUri;
use crate::types::{Compression, TimeZone, WriteMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// Top-Level Job Config
// ============================================================================

/// Complete job configuration loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Root URI of the raw JSON inputs
    pub input_root: String,

    /// Root URI under which the five tables are written
    pub output_root: String,

    /// Input sub-paths relative to `input_root`
    pub sources: SourcesConfig,

    /// `page` value that marks a play event
    pub play_action: String,

    /// Zone used to derive wall-clock timestamps
    pub timezone: TimeZone,

    /// Append to or overwrite existing table output
    pub write_mode: WriteMode,

    /// Key-value file holding the storage credentials
    pub credentials_file: PathBuf,

    /// Storage region, exported as `AWS_DEFAULT_REGION` when set
    pub region: Option<String>,

    /// Query engine settings
    pub engine: EngineConfig,

    /// Parquet output settings
    pub output: OutputConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            input_root: default_input_root(),
            output_root: default_output_root(),
            sources: SourcesConfig::default(),
            play_action: default_play_action(),
            timezone: TimeZone::utc(),
            write_mode: WriteMode::Append,
            credentials_file: default_credentials_file(),
            region: None,
            engine: EngineConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

fn default_input_root() -> String {
    "s3://udacity-dend/".to_string()
}

fn default_output_root() -> String {
    "output".to_string()
}

fn default_play_action() -> String {
    "NextSong".to_string()
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("dl.cfg")
}

// ============================================================================
// Sections
// ============================================================================

/// Input sub-paths (globs) relative to the input root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Catalog-entry JSON files
    pub catalog_path: String,
    /// Activity-log JSON files
    pub activity_path: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            catalog_path: "catalog_data/A/A/B/*.json".to_string(),
            activity_path: "activity_data/2018/11/*.json".to_string(),
        }
    }
}

/// Query engine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads (engine default when unset)
    pub threads: Option<usize>,
    /// Memory limit such as `4GB`
    pub memory_limit: Option<String>,
}

/// Parquet output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Compression codec
    pub compression: Compression,
    /// Rows per row group
    pub row_group_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            compression: Compression::Snappy,
            row_group_size: 122_880,
        }
    }
}

// ============================================================================
// Overrides
// ============================================================================

/// Values supplied on the command line; `None` keeps the file value
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_root: Option<String>,
    pub output_root: Option<String>,
    pub credentials_file: Option<PathBuf>,
    pub timezone: Option<String>,
    pub write_mode: Option<WriteMode>,
}

// ============================================================================
// Loading
// ============================================================================

impl JobConfig {
    /// Load from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::config(format!(
                    "Failed to read config file '{}': {e}",
                    path.display()
                ))
            }
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse from a YAML string; an empty document yields the defaults
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load from an optional path, falling back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply command-line overrides
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(input) = overrides.input_root {
            self.input_root = input;
        }
        if let Some(output) = overrides.output_root {
            self.output_root = output;
        }
        if let Some(credentials) = overrides.credentials_file {
            self.credentials_file = credentials;
        }
        if let Some(tz) = overrides.timezone {
            self.timezone = TimeZone::new(tz);
        }
        if let Some(mode) = overrides.write_mode {
            self.write_mode = mode;
        }
        self
    }

    /// Check the configuration before any work starts
    pub fn validate(&self) -> Result<()> {
        let input = StorageUri::parse(&self.input_root)
            .map_err(|e| Error::invalid_value("input_root", e.to_string()))?;
        let output = StorageUri::parse(&self.output_root)
            .map_err(|e| Error::invalid_value("output_root", e.to_string()))?;

        if input.as_str() == output.as_str() {
            return Err(Error::invalid_value(
                "output_root",
                "must differ from input_root",
            ));
        }
        if self.play_action.trim().is_empty() {
            return Err(Error::invalid_value("play_action", "must not be empty"));
        }
        if self.timezone.name().trim().is_empty() {
            return Err(Error::invalid_value("timezone", "must not be empty"));
        }
        if self.sources.catalog_path.trim().is_empty() {
            return Err(Error::missing_field("sources.catalog_path"));
        }
        if self.sources.activity_path.trim().is_empty() {
            return Err(Error::missing_field("sources.activity_path"));
        }
        if self.output.row_group_size == 0 {
            return Err(Error::invalid_value(
                "output.row_group_size",
                "must be greater than zero",
            ));
        }
        if self.engine.threads == Some(0) {
            return Err(Error::invalid_value(
                "engine.threads",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Parsed input root
    pub fn input_uri(&self) -> Result<StorageUri> {
        StorageUri::parse(&self.input_root)
    }

    /// Parsed output root
    pub fn output_uri(&self) -> Result<StorageUri> {
        StorageUri::parse(&self.output_root)
    }

    /// Full glob of the catalog input files
    pub fn catalog_glob(&self) -> Result<String> {
        Ok(self.input_uri()?.join(&self.sources.catalog_path))
    }

    /// Full glob of the activity input files
    pub fn activity_glob(&self) -> Result<String> {
        Ok(self.input_uri()?.join(&self.sources.activity_path))
    }

    /// Whether either root lives in remote object storage
    pub fn uses_remote_storage(&self) -> Result<bool> {
        Ok(self.input_uri()?.is_remote() || self.output_uri()?.is_remote())
    }
}

//! CLI commands and argument parsing

use crate::config::ConfigOverrides;
use crate::types::{OutputTable, WriteMode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Playlog ETL: catalog and activity JSON to partitioned Parquet tables
#[derive(Parser, Debug)]
#[command(name = "playlog-etl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Job configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Input root (local path or s3://bucket/prefix)
    #[arg(short, long, global = true)]
    pub input: Option<String>,

    /// Output root (local path or s3://bucket/prefix)
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Credentials file with an [AWS] section
    #[arg(long, global = true)]
    pub credentials: Option<PathBuf>,

    /// Timezone used for wall-clock timestamps
    #[arg(long, global = true)]
    pub timezone: Option<String>,

    /// Write mode for every table
    #[arg(short, long, global = true)]
    pub mode: Option<WriteMode>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Defaults to `run`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Command-line values that take precedence over the config file
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            input_root: self.input.clone(),
            output_root: self.output.clone(),
            credentials_file: self.credentials.clone(),
            timezone: self.timezone.clone(),
            write_mode: self.mode,
        }
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the catalog stage, then the activity stage
    Run,

    /// Run only the catalog stage
    Catalog,

    /// Run only the activity stage against a completed entity table
    Activity,

    /// Validate the configuration and print it resolved
    Validate,

    /// Print rows of a written table
    Preview {
        /// Table to read
        #[arg(value_enum)]
        table: OutputTable,

        /// Maximum rows
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_subcommand() {
        let cli = Cli::parse_from(["playlog-etl"]);
        assert_eq!(cli.command, None);
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.overrides().write_mode.is_none());
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::parse_from([
            "playlog-etl",
            "activity",
            "--input",
            "/data/in",
            "-o",
            "s3://bucket/out",
            "--mode",
            "overwrite",
            "--timezone",
            "America/New_York",
        ]);
        assert_eq!(cli.command, Some(Commands::Activity));

        let overrides = cli.overrides();
        assert_eq!(overrides.input_root.as_deref(), Some("/data/in"));
        assert_eq!(overrides.output_root.as_deref(), Some("s3://bucket/out"));
        assert_eq!(overrides.write_mode, Some(WriteMode::Overwrite));
        assert_eq!(overrides.timezone.as_deref(), Some("America/New_York"));
    }

    #[test]
    fn test_preview_arguments() {
        let cli = Cli::parse_from(["playlog-etl", "preview", "facts", "--limit", "3"]);
        assert_eq!(
            cli.command,
            Some(Commands::Preview {
                table: OutputTable::Facts,
                limit: 3
            })
        );
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["playlog-etl", "--mode", "merge"]).is_err());
    }
}

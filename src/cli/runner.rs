//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::JobConfig;
use crate::error::{Error, Result, ResultExt};
use crate::pipeline::{Pipeline, RunReport};
use crate::session::quote_literal;
use crate::types::OutputTable;
use serde_json::{json, Value};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;
        match self.cli.command.clone().unwrap_or(Commands::Run) {
            Commands::Run => {
                let report = Pipeline::new(config)?.run().await?;
                self.output_report(&report);
            }
            Commands::Catalog => {
                let report = Pipeline::new(config)?.run_catalog_only().await?;
                self.output_report(&report);
            }
            Commands::Activity => {
                let report = Pipeline::new(config)?.run_activity_only().await?;
                self.output_report(&report);
            }
            Commands::Validate => self.validate(&config)?,
            Commands::Preview { table, limit } => {
                for msg in preview_messages(config, table, limit).await? {
                    self.output_message(&msg);
                }
            }
        }
        Ok(())
    }

    /// Load the config file and apply command-line overrides
    fn load_config(&self) -> Result<JobConfig> {
        let config = JobConfig::load(self.cli.config.as_deref())?;
        Ok(config.with_overrides(self.cli.overrides()))
    }

    fn validate(&self, config: &JobConfig) -> Result<()> {
        match self.cli.format {
            OutputFormat::Json => {
                for msg in validation_messages(config)? {
                    self.output_message(&msg);
                }
            }
            OutputFormat::Pretty => {
                config.validate()?;
                print!(
                    "{}",
                    serde_yaml::to_string(config).context("Failed to render configuration")?
                );
            }
        }
        Ok(())
    }

    fn output_report(&self, report: &RunReport) {
        self.output_message(&json!({ "type": "REPORT", "report": report }));
    }

    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// `LOG` and `CONFIG` messages for a valid configuration
fn validation_messages(config: &JobConfig) -> Result<Vec<Value>> {
    config.validate()?;
    Ok(vec![
        json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Configuration is valid: {} -> {}",
                    config.input_root, config.output_root
                )
            }
        }),
        json!({ "type": "CONFIG", "config": config }),
    ])
}

/// `RECORD` messages for up to `limit` rows of a written table
///
/// Partition columns are restored from the directory names.
async fn preview_messages(
    config: JobConfig,
    table: OutputTable,
    limit: usize,
) -> Result<Vec<Value>> {
    let pipeline = Pipeline::new(config)?;
    let root = pipeline.root();
    let dir = table.dir_name();

    if !root.has_parquet(dir).await? {
        return Err(Error::output(format!(
            "No parquet files under {}",
            root.uri_of(dir)
        )));
    }

    let sql = format!(
        "SELECT * FROM read_parquet({}, hive_partitioning = true) LIMIT {limit}",
        quote_literal(&format!("{}/**/*.parquet", root.uri_of(dir)))
    );
    Ok(pipeline
        .session()
        .query_json(&sql)?
        .into_iter()
        .map(|row| json!({ "type": "RECORD", "table": table, "record": row }))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_input(input: &Path) {
        let catalog = input.join("catalog_data/A/A/B");
        let activity = input.join("activity_data/2018/11");
        std::fs::create_dir_all(&catalog).unwrap();
        std::fs::create_dir_all(&activity).unwrap();

        std::fs::write(
            catalog.join("S1.json"),
            json!({"id": "S1", "title": "Song A", "parent_id": "P1",
                   "parent_name": "Artist", "year": 2000, "duration": 180.0})
            .to_string(),
        )
        .unwrap();

        let plays: Vec<String> = (0..3)
            .map(|i| {
                json!({"page": "NextSong", "song": "Song A", "artist": "P1", "length": 180.0,
                       "ts": 1_541_121_934_796_i64 + i * 60_000, "userId": "7", "level": "free",
                       "sessionId": 1, "itemInSession": i})
                .to_string()
            })
            .collect();
        std::fs::write(activity.join("events.json"), plays.join("\n")).unwrap();
    }

    fn cli(dir: &TempDir, args: &[&str]) -> Cli {
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        let mut argv = vec![
            "playlog-etl".to_string(),
            "--input".to_string(),
            input.to_str().unwrap().to_string(),
            "--output".to_string(),
            output.to_str().unwrap().to_string(),
        ];
        argv.extend(args.iter().map(|a| (*a).to_string()));
        Cli::parse_from(argv)
    }

    #[test]
    fn test_validation_messages() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Runner::new(cli(&dir, &["--mode", "overwrite", "validate"]));
        let config = runner.load_config().unwrap();

        let messages = validation_messages(&config).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["type"], "LOG");
        assert_eq!(messages[1]["type"], "CONFIG");
        assert_eq!(messages[1]["config"]["write_mode"], "overwrite");
        assert_eq!(messages[1]["config"]["play_action"], "NextSong");

        // the pretty form is the same config as YAML
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert_eq!(JobConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_validation_rejects_shared_roots() {
        let runner = Runner::new(Cli::parse_from([
            "playlog-etl",
            "--input",
            "/data/lake",
            "--output",
            "/data/lake/",
            "validate",
        ]));
        let config = runner.load_config().unwrap();
        assert!(matches!(
            validation_messages(&config),
            Err(Error::InvalidConfigValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_preview_restores_partition_columns() {
        let dir = tempfile::tempdir().unwrap();
        write_input(&dir.path().join("in"));

        let runner = Runner::new(cli(&dir, &["run"]));
        runner.run().await.unwrap();

        let config = runner.load_config().unwrap();
        let messages = preview_messages(config, OutputTable::Facts, 2).await.unwrap();

        assert_eq!(messages.len(), 2);
        for msg in &messages {
            assert_eq!(msg["type"], "RECORD");
            assert_eq!(msg["table"], "facts");
            let record = msg["record"].as_object().unwrap();
            assert!(record.contains_key("year"));
            assert!(record.contains_key("month"));
            assert_eq!(record["entity_id"], "S1");
            assert_eq!(record["user_id"], "7");
        }
    }

    #[tokio::test]
    async fn test_preview_of_unwritten_table_fails() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Runner::new(cli(&dir, &["preview", "actors"]));
        let config = runner.load_config().unwrap();

        let err = preview_messages(config, OutputTable::Actors, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Output { .. }));
    }
}

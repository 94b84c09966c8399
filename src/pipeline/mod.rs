//! Pipeline module
//!
//! Staged ETL over catalog and activity data.
//!
//! # Overview
//!
//! The pipeline module provides:
//! - `Pipeline` - Bootstraps the session and runs the stages in order
//! - `CatalogStage` - Entity and attribute tables
//! - `ActivityStage` - Actor, time and fact tables
//! - Reports for stages and runs
//!
//! The activity stage depends on the catalog stage's entity table. In a
//! combined run the dependency is the `CatalogOutput` value; when the
//! activity stage runs alone it is the entity table's completion marker.

mod activity;
mod catalog;
pub mod schema;
mod types;

pub use activity::ActivityStage;
pub use catalog::CatalogStage;
pub use types::{CatalogOutput, EntitySource, RunReport, StageReport, TableReport};

use crate::config::JobConfig;
use crate::credentials;
use crate::error::Result;
use crate::output::{StorageRoot, TableWriter, WriteOptions};
use crate::session::Session;
use std::time::Instant;

/// A configured job: engine session, output root and settings
pub struct Pipeline {
    /// Query session
    session: Session,
    /// Output root
    root: StorageRoot,
    /// Job configuration
    config: JobConfig,
}

impl Pipeline {
    /// Bootstrap a pipeline from configuration
    ///
    /// Validates the config, loads storage credentials when a root is
    /// remote, opens the engine session and the output root.
    pub fn new(config: JobConfig) -> Result<Self> {
        config.validate()?;

        let remote = config.uses_remote_storage()?;
        let credentials = if remote {
            credentials::load_optional(&config.credentials_file)?
        } else {
            None
        };
        let region = config.region.as_deref();

        let session = Session::open(&config.engine, &config.timezone)?;
        if remote {
            session.configure_cloud_storage(region, credentials.as_ref())?;
        }

        let root = StorageRoot::open_with(&config.output_uri()?, credentials.as_ref(), region)?;
        tracing::info!(
            "Pipeline ready: input {}, output {} ({} mode, timezone {})",
            config.input_uri()?,
            root.uri(),
            config.write_mode,
            config.timezone
        );

        Ok(Self::from_parts(session, root, config))
    }

    /// Assemble from an existing session and root
    pub fn from_parts(session: Session, root: StorageRoot, config: JobConfig) -> Self {
        Self {
            session,
            root,
            config,
        }
    }

    /// Engine session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Output root
    pub fn root(&self) -> &StorageRoot {
        &self.root
    }

    /// Job configuration
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    fn writer(&self) -> TableWriter<'_> {
        TableWriter::new(
            &self.session,
            &self.root,
            WriteOptions::from_config(&self.config.output, self.config.write_mode),
        )
    }

    /// Run the catalog stage
    pub async fn run_catalog(&self) -> Result<CatalogOutput> {
        let stage = CatalogStage::new(&self.session, self.config.catalog_glob()?);
        stage.run(&self.writer()).await
    }

    /// Run the activity stage against the given entity source
    pub async fn run_activity(&self, entities: EntitySource<'_>) -> Result<StageReport> {
        let stage = ActivityStage::new(
            &self.session,
            self.config.activity_glob()?,
            self.config.play_action.clone(),
        );
        stage.run(&self.writer(), entities).await
    }

    /// Run both stages in order
    pub async fn run(&self) -> Result<RunReport> {
        let start = Instant::now();
        let catalog = self.run_catalog().await?;
        let activity = self.run_activity(EntitySource::Session(&catalog)).await?;
        Ok(self.report(vec![catalog.into_report(), activity], start))
    }

    /// Run only the catalog stage
    pub async fn run_catalog_only(&self) -> Result<RunReport> {
        let start = Instant::now();
        let catalog = self.run_catalog().await?;
        Ok(self.report(vec![catalog.into_report()], start))
    }

    /// Run only the activity stage, reading entities back from storage
    pub async fn run_activity_only(&self) -> Result<RunReport> {
        let start = Instant::now();
        let activity = self.run_activity(EntitySource::Storage).await?;
        Ok(self.report(vec![activity], start))
    }

    fn report(&self, stages: Vec<StageReport>, start: Instant) -> RunReport {
        let report = RunReport {
            write_mode: self.config.write_mode,
            stages,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        tracing::info!(
            "Run finished in {}ms, {} tables written",
            report.duration_ms,
            report.tables().count()
        );
        report
    }
}

//! Catalog stage
//!
//! Reads catalog-entry JSON and derives the entity and attribute tables.

use super::schema::{read_json_sql, CATALOG_SOURCE};
use super::types::{CatalogOutput, StageReport, TableReport};
use crate::error::Result;
use crate::output::TableWriter;
use crate::session::Session;
use crate::types::{OutputTable, Stage};
use std::time::Instant;

/// Session table holding the raw catalog records
pub const RAW_TABLE: &str = "catalog_raw";

const ENTITIES_SQL: &str = "CREATE OR REPLACE TABLE entities AS \
     SELECT DISTINCT id, title, parent_id, \"year\", duration \
     FROM catalog_raw;";

const ATTRIBUTES_SQL: &str = "CREATE OR REPLACE TABLE attributes AS \
     SELECT DISTINCT parent_id, \
            parent_name AS \"name\", \
            parent_location AS \"location\", \
            parent_lat AS \"lat\", \
            parent_long AS \"long\" \
     FROM catalog_raw;";

/// Derives and writes the catalog tables
pub struct CatalogStage<'a> {
    session: &'a Session,
    source_glob: String,
}

impl<'a> CatalogStage<'a> {
    /// Create a stage reading `source_glob`
    pub fn new(session: &'a Session, source_glob: impl Into<String>) -> Self {
        Self {
            session,
            source_glob: source_glob.into(),
        }
    }

    /// Materialize the raw records, returning how many were read
    pub fn load_source(&self) -> Result<usize> {
        self.session.execute(
            "reading catalog records",
            &format!(
                "CREATE OR REPLACE TABLE {RAW_TABLE} AS SELECT * FROM {};",
                read_json_sql(&self.source_glob, CATALOG_SOURCE)
            ),
        )?;
        self.session.table_rows(RAW_TABLE)
    }

    /// Derive one table, returning its build time in milliseconds
    fn build(&self, table: OutputTable, sql: &str) -> Result<u64> {
        let start = Instant::now();
        self.session
            .execute(&format!("building {table} table"), sql)?;
        let build_ms = start.elapsed().as_millis() as u64;
        tracing::info!(table = %table, build_ms, "Extracted columns for {table} table");
        Ok(build_ms)
    }

    /// Build the entity table from the loaded records
    pub fn build_entities(&self) -> Result<u64> {
        self.build(OutputTable::Entities, ENTITIES_SQL)
    }

    /// Build the attribute table from the loaded records
    pub fn build_attributes(&self) -> Result<u64> {
        self.build(OutputTable::Attributes, ATTRIBUTES_SQL)
    }

    /// Run the whole stage
    pub async fn run(&self, writer: &TableWriter<'_>) -> Result<CatalogOutput> {
        let start = Instant::now();
        tracing::info!("Processing catalog data from {}", self.source_glob);

        let input_rows = self.load_source()?;
        tracing::info!("Read {input_rows} catalog records");

        let mut tables = Vec::with_capacity(2);

        let build_ms = self.build_entities()?;
        tables.push(TableReport::new(
            build_ms,
            writer.write(OutputTable::Entities).await?,
        ));

        let build_ms = self.build_attributes()?;
        tables.push(TableReport::new(
            build_ms,
            writer.write(OutputTable::Attributes).await?,
        ));

        Ok(CatalogOutput::new(StageReport {
            stage: Stage::Catalog,
            source: self.source_glob.clone(),
            input_rows,
            kept_rows: input_rows,
            tables,
            duration_ms: start.elapsed().as_millis() as u64,
        }))
    }
}

//! Pipeline types
//!
//! Stage handoff and run reports.

use crate::output::WrittenTable;
use crate::types::{OutputTable, Stage, WriteMode};
use serde::Serialize;

/// Report for one written table
#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    /// Which table
    pub table: OutputTable,
    /// Rows written
    pub rows: usize,
    /// Where the table was written
    pub location: String,
    /// Time spent deriving the table (ms)
    pub build_ms: u64,
    /// Time spent writing the table (ms)
    pub write_ms: u64,
    /// Files removed before writing (overwrite mode)
    pub removed_files: usize,
}

impl TableReport {
    /// Combine build timing with the writer's outcome
    pub fn new(build_ms: u64, written: WrittenTable) -> Self {
        Self {
            table: written.table,
            rows: written.rows,
            location: written.location,
            build_ms,
            write_ms: written.write_ms,
            removed_files: written.removed_files,
        }
    }
}

/// Report for one stage
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    /// Which stage
    pub stage: Stage,
    /// Input glob the stage read
    pub source: String,
    /// Records read from the input
    pub input_rows: usize,
    /// Records left after filtering
    pub kept_rows: usize,
    /// Tables written, in order
    pub tables: Vec<TableReport>,
    /// Stage wall time (ms)
    pub duration_ms: u64,
}

impl StageReport {
    /// Report for a given table, if the stage wrote it
    pub fn table(&self, table: OutputTable) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == table)
    }

    /// Rows written for a table, 0 when the stage did not write it
    pub fn rows(&self, table: OutputTable) -> usize {
        self.table(table).map_or(0, |t| t.rows)
    }
}

/// Report for a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Write mode used for every table
    pub write_mode: WriteMode,
    /// Stages in execution order
    pub stages: Vec<StageReport>,
    /// Total wall time (ms)
    pub duration_ms: u64,
}

impl RunReport {
    /// Rows written for a table across all stages
    pub fn rows(&self, table: OutputTable) -> usize {
        self.stages.iter().map(|s| s.rows(table)).sum()
    }

    /// Every table report in write order
    pub fn tables(&self) -> impl Iterator<Item = &TableReport> {
        self.stages.iter().flat_map(|s| s.tables.iter())
    }
}

/// Proof that the catalog stage completed in this session
///
/// Only the catalog stage constructs this value. The activity stage takes it
/// to join against the entity table built in the same session.
#[derive(Debug, Clone)]
pub struct CatalogOutput {
    report: StageReport,
}

impl CatalogOutput {
    pub(crate) fn new(report: StageReport) -> Self {
        Self { report }
    }

    /// The catalog stage's report
    pub fn report(&self) -> &StageReport {
        &self.report
    }

    /// Rows in the entity table
    pub fn entity_rows(&self) -> usize {
        self.report.rows(OutputTable::Entities)
    }

    /// Consume into the stage report
    pub fn into_report(self) -> StageReport {
        self.report
    }
}

/// Where the activity stage gets the entity table from
#[derive(Debug, Clone, Copy)]
pub enum EntitySource<'a> {
    /// Built earlier in this session by the catalog stage
    Session(&'a CatalogOutput),
    /// Read back from the output root, after checking its completion marker
    Storage,
}

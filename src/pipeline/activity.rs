//! Activity stage
//!
//! Reads activity-log JSON, keeps play events and derives the actor, time
//! and fact tables. The fact table joins plays to the entity table produced
//! by the catalog stage.

use super::schema::{column_list, create_empty_sql, read_json_sql, ACTIVITY_SOURCE, ENTITY_TABLE};
use super::types::{EntitySource, StageReport, TableReport};
use crate::error::Result;
use crate::output::{CompletionMarker, StorageRoot, TableWriter};
use crate::session::{quote_literal, Session};
use crate::types::{OutputTable, Stage};
use std::time::Instant;

/// Session table holding the raw activity records
pub const RAW_TABLE: &str = "activity_raw";

/// Session table holding the filtered play events
pub const PLAYS_TABLE: &str = "plays";

const ACTORS_SQL: &str = "CREATE OR REPLACE TABLE actors AS \
     SELECT DISTINCT userId AS user_id, \
            firstName AS first_name, \
            lastName AS last_name, \
            gender, \
            \"level\" AS tier \
     FROM plays;";

const TIME_SQL: &str = "CREATE OR REPLACE TABLE time_dim AS \
     SELECT DISTINCT \"timestamp\", \
            day(\"timestamp\") AS \"day\", \
            weekofyear(\"timestamp\") AS week, \
            month(\"timestamp\") AS \"month\", \
            year(\"timestamp\") AS \"year\", \
            dayofweek(\"timestamp\") + 1 AS weekday \
     FROM plays;";

// Surrogate keys follow the derived timestamp; the raw epoch and the
// session position break ties so reruns number rows identically.
const FACTS_SQL: &str = "CREATE OR REPLACE TABLE facts AS \
     WITH numbered AS ( \
         SELECT p.*, \
                row_number() OVER ( \
                    ORDER BY p.\"timestamp\", p.ts, p.sessionId, p.itemInSession, p.userId \
                ) AS surrogate_id \
         FROM plays p \
     ) \
     SELECT n.surrogate_id, \
            n.\"timestamp\", \
            n.userId AS user_id, \
            n.\"level\" AS tier, \
            e.id AS entity_id, \
            e.parent_id, \
            n.sessionId AS session_id, \
            n.\"location\", \
            n.userAgent AS user_agent, \
            year(n.\"timestamp\") AS \"year\", \
            month(n.\"timestamp\") AS \"month\" \
     FROM numbered n \
     LEFT JOIN entities e \
       ON n.song = e.title \
      AND n.artist = e.parent_id \
      AND n.\"length\" = e.duration;";

/// Derives and writes the activity tables
pub struct ActivityStage<'a> {
    session: &'a Session,
    source_glob: String,
    play_action: String,
}

impl<'a> ActivityStage<'a> {
    /// Create a stage reading `source_glob` and keeping `play_action` events
    pub fn new(
        session: &'a Session,
        source_glob: impl Into<String>,
        play_action: impl Into<String>,
    ) -> Self {
        Self {
            session,
            source_glob: source_glob.into(),
            play_action: play_action.into(),
        }
    }

    /// Materialize the raw records, returning how many were read
    pub fn load_source(&self) -> Result<usize> {
        self.session.execute(
            "reading activity records",
            &format!(
                "CREATE OR REPLACE TABLE {RAW_TABLE} AS SELECT * FROM {};",
                read_json_sql(&self.source_glob, ACTIVITY_SOURCE)
            ),
        )?;
        self.session.table_rows(RAW_TABLE)
    }

    /// Keep play events and derive their wall-clock timestamp
    pub fn filter_plays(&self) -> Result<usize> {
        self.session.execute(
            "filtering play events",
            &format!(
                "CREATE OR REPLACE TABLE {PLAYS_TABLE} AS \
                 SELECT *, {} AS \"timestamp\" \
                 FROM {RAW_TABLE} \
                 WHERE page = {};",
                self.session.local_timestamp_expr("ts"),
                quote_literal(&self.play_action)
            ),
        )?;
        self.session.table_rows(PLAYS_TABLE)
    }

    fn build(&self, table: OutputTable, sql: &str) -> Result<u64> {
        let start = Instant::now();
        self.session
            .execute(&format!("building {table} table"), sql)?;
        let build_ms = start.elapsed().as_millis() as u64;
        tracing::info!(table = %table, build_ms, "Extracted columns for {table} table");
        Ok(build_ms)
    }

    /// Build the actor table from the play events
    pub fn build_actors(&self) -> Result<u64> {
        self.build(OutputTable::Actors, ACTORS_SQL)
    }

    /// Build the time table from the play events
    pub fn build_time(&self) -> Result<u64> {
        self.build(OutputTable::Time, TIME_SQL)
    }

    /// Build the fact table; the `entities` session table must exist
    pub fn build_facts(&self) -> Result<u64> {
        self.build(OutputTable::Facts, FACTS_SQL)
    }

    /// Make the entity table available in the session
    pub async fn prepare_entities(
        &self,
        source: EntitySource<'_>,
        root: &StorageRoot,
    ) -> Result<usize> {
        let table = OutputTable::Entities.session_table();
        match source {
            EntitySource::Session(catalog) => {
                let rows = self.session.table_rows(table)?;
                tracing::debug!(
                    "Using {rows} entity rows from this run (catalog wrote {})",
                    catalog.entity_rows()
                );
                Ok(rows)
            }
            EntitySource::Storage => {
                let marker = CompletionMarker::require(root, OutputTable::Entities).await?;
                tracing::info!(
                    "Entity table completed at {} ({} rows, {})",
                    marker.completed_at,
                    marker.rows,
                    marker.write_mode
                );

                let dir = OutputTable::Entities.dir_name();
                let sql = if root.has_parquet(dir).await? {
                    format!(
                        "CREATE OR REPLACE TABLE {table} AS \
                         SELECT DISTINCT {} \
                         FROM read_parquet({}, hive_partitioning = true, \
                              hive_types = {{'year': BIGINT, 'parent_id': VARCHAR}});",
                        column_list(ENTITY_TABLE),
                        quote_literal(&format!("{}/**/*.parquet", root.uri_of(dir)))
                    )
                } else {
                    create_empty_sql(table, ENTITY_TABLE)
                };
                self.session.execute("reading back entity table", &sql)?;
                self.session.table_rows(table)
            }
        }
    }

    /// Run the whole stage
    pub async fn run(
        &self,
        writer: &TableWriter<'_>,
        entities: EntitySource<'_>,
    ) -> Result<StageReport> {
        let start = Instant::now();
        tracing::info!("Processing activity data from {}", self.source_glob);

        // No table of this stage is written until the entity table is available
        let entity_rows = self.prepare_entities(entities, writer.root()).await?;

        let input_rows = self.load_source()?;
        let kept_rows = self.filter_plays()?;
        tracing::info!(
            "Read {input_rows} activity records, kept {kept_rows} '{}' events",
            self.play_action
        );

        let mut tables = Vec::with_capacity(3);

        let build_ms = self.build_actors()?;
        tables.push(TableReport::new(
            build_ms,
            writer.write(OutputTable::Actors).await?,
        ));

        let build_ms = self.build_time()?;
        tables.push(TableReport::new(
            build_ms,
            writer.write(OutputTable::Time).await?,
        ));

        tracing::debug!("Joining plays against {entity_rows} entities");

        let build_ms = self.build_facts()?;
        tables.push(TableReport::new(
            build_ms,
            writer.write(OutputTable::Facts).await?,
        ));

        Ok(StageReport {
            stage: Stage::Activity,
            source: self.source_glob.clone(),
            input_rows,
            kept_rows,
            tables,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

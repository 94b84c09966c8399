//! DuckDB-based query session
//!
//! Opens an in-memory DuckDB connection, applies engine settings and loads
//! the extensions the job needs: `httpfs` for S3 roots and `icu` for
//! non-UTC timezone conversion.

use crate::config::EngineConfig;
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::types::TimeZone;
use duckdb::types::{TimeUnit, Value as DuckValue};
use duckdb::Connection;
use serde_json::Value;

/// Query session backed by DuckDB
pub struct Session {
    /// DuckDB connection
    conn: Connection,
    /// Zone for wall-clock timestamp derivation
    timezone: TimeZone,
}

impl Session {
    /// Open a session with the given engine settings
    pub fn open(engine: &EngineConfig, timezone: &TimeZone) -> Result<Self> {
        let conn = Connection::open_in_memory()?;

        let session = Self {
            conn,
            timezone: timezone.clone(),
        };

        if let Some(threads) = engine.threads {
            session.execute("applying engine settings", &format!("SET threads = {threads};"))?;
        }
        if let Some(ref limit) = engine.memory_limit {
            session.execute(
                "applying engine settings",
                &format!("SET memory_limit = {};", quote_literal(limit)),
            )?;
        }

        if !timezone.is_utc() {
            session.load_timezone_support()?;
        }

        tracing::debug!("Opened engine session (timezone {})", session.timezone);
        Ok(session)
    }

    /// Open a session with default settings in UTC
    pub fn open_default() -> Result<Self> {
        Self::open(&EngineConfig::default(), &TimeZone::utc())
    }

    /// Configure S3 access
    ///
    /// Keys come from `credentials`, falling back to `AWS_ACCESS_KEY_ID` and
    /// `AWS_SECRET_ACCESS_KEY`. The region comes from `region`, then
    /// `AWS_DEFAULT_REGION`, then `us-east-1`. `AWS_ENDPOINT` selects an
    /// S3-compatible store.
    pub fn configure_cloud_storage(
        &self,
        region: Option<&str>,
        credentials: Option<&Credentials>,
    ) -> Result<()> {
        self.conn
            .execute_batch("INSTALL httpfs; LOAD httpfs;")
            .map_err(|e| Error::config(format!("Failed to load httpfs extension: {e}")))?;

        let region = region
            .map(String::from)
            .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok())
            .unwrap_or_else(|| "us-east-1".to_string());
        self.conn
            .execute_batch(&format!("SET s3_region = {};", quote_literal(&region)))
            .map_err(|e| Error::config(format!("Failed to configure S3 region: {e}")))?;

        let keys = match credentials {
            Some(credentials) => Some((
                credentials.access_key_id.clone(),
                credentials.secret_access_key.clone(),
            )),
            None => std::env::var("AWS_ACCESS_KEY_ID")
                .ok()
                .zip(std::env::var("AWS_SECRET_ACCESS_KEY").ok()),
        };
        if let Some((key_id, secret)) = keys {
            self.conn
                .execute_batch(&format!(
                    "SET s3_access_key_id = {}; SET s3_secret_access_key = {};",
                    quote_literal(&key_id),
                    quote_literal(&secret)
                ))
                .map_err(|e| Error::config(format!("Failed to configure S3: {e}")))?;
        } else {
            tracing::warn!("No S3 credentials configured, relying on anonymous access");
        }

        // R2, MinIO and other S3-compatible stores
        if let Ok(endpoint) = std::env::var("AWS_ENDPOINT") {
            self.conn
                .execute_batch(&format!(
                    "SET s3_endpoint = {}; SET s3_url_style = 'path';",
                    quote_literal(
                        endpoint
                            .trim_start_matches("https://")
                            .trim_start_matches("http://")
                    )
                ))
                .map_err(|e| Error::config(format!("Failed to configure S3 endpoint: {e}")))?;
        }

        tracing::info!("Configured S3 storage access (region {region})");
        Ok(())
    }

    /// Load ICU so timestamps can be converted to named zones
    fn load_timezone_support(&self) -> Result<()> {
        self.conn
            .execute_batch("INSTALL icu; LOAD icu;")
            .map_err(|e| Error::config(format!("Failed to load icu extension: {e}")))?;
        Ok(())
    }

    /// Configured timezone
    pub fn timezone(&self) -> &TimeZone {
        &self.timezone
    }

    /// SQL expression turning an epoch-millisecond column into a wall-clock
    /// `TIMESTAMP` in the session zone, truncated to whole seconds
    pub fn local_timestamp_expr(&self, epoch_ms_column: &str) -> String {
        if self.timezone.is_utc() {
            format!("date_trunc('second', epoch_ms({epoch_ms_column}))")
        } else {
            format!(
                "date_trunc('second', timezone({}, to_timestamp({epoch_ms_column} / 1000.0)))",
                quote_literal(self.timezone.name())
            )
        }
    }

    /// Run one or more statements
    pub fn execute(&self, step: &str, sql: &str) -> Result<()> {
        tracing::debug!("Executing ({step}): {sql}");
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::query(step, e))
    }

    /// Run a query returning a single count
    pub fn count(&self, step: &str, sql: &str) -> Result<usize> {
        tracing::debug!("Counting ({step}): {sql}");
        let count: i64 = self
            .conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(|e| Error::query(step, e))?;
        Ok(count as usize)
    }

    /// Number of rows in a session table
    pub fn table_rows(&self, table: &str) -> Result<usize> {
        self.count(
            &format!("counting rows of {table}"),
            &format!("SELECT count(*) FROM {table}"),
        )
    }

    /// Run a query and return every row as a JSON object
    pub fn query_json(&self, sql: &str) -> Result<Vec<Value>> {
        let step = "fetching rows";
        let mut stmt = self.conn.prepare(sql).map_err(|e| Error::query(step, e))?;
        let mut rows = stmt.query([]).map_err(|e| Error::query(step, e))?;
        let names: Vec<String> = rows
            .as_ref()
            .ok_or_else(|| Error::query(step, "statement was not executed"))?
            .column_names();

        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(|e| Error::query(step, e))? {
            let mut record = serde_json::Map::with_capacity(names.len());
            for (idx, name) in names.iter().enumerate() {
                let value: DuckValue = row.get(idx).map_err(|e| Error::query(step, e))?;
                record.insert(name.clone(), duckdb_value_to_json(value));
            }
            records.push(Value::Object(record));
        }
        Ok(records)
    }
}

/// Quote a string as a SQL literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Convert DuckDB Value to JSON Value
fn duckdb_value_to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::Number(i.into()),
        DuckValue::SmallInt(i) => Value::Number(i.into()),
        DuckValue::Int(i) => Value::Number(i.into()),
        DuckValue::BigInt(i) => Value::Number(i.into()),
        DuckValue::HugeInt(i) => Value::String(i.to_string()),
        DuckValue::UTinyInt(i) => Value::Number(i.into()),
        DuckValue::USmallInt(i) => Value::Number(i.into()),
        DuckValue::UInt(i) => Value::Number(i.into()),
        DuckValue::UBigInt(i) => Value::Number(i.into()),
        DuckValue::Float(f) => {
            serde_json::Number::from_f64(f64::from(f)).map_or(Value::Null, Value::Number)
        }
        DuckValue::Double(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        DuckValue::Text(s) => Value::String(s),
        DuckValue::Timestamp(unit, i) => {
            // Wall-clock value, no zone suffix
            let micros = match unit {
                TimeUnit::Second => i.checked_mul(1_000_000),
                TimeUnit::Millisecond => i.checked_mul(1_000),
                TimeUnit::Microsecond => Some(i),
                TimeUnit::Nanosecond => Some(i / 1_000),
            };
            micros
                .and_then(chrono::DateTime::from_timestamp_micros)
                .map(|dt| Value::String(dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string()))
                .unwrap_or(Value::Number(i.into()))
        }
        DuckValue::Date32(d) => {
            // 719163 days from 0001-01-01 to 1970-01-01
            chrono::NaiveDate::from_num_days_from_ce_opt(d + 719_163)
                .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Number(d.into()))
        }
        _ => Value::String(format!("{value:?}")),
    }
}

//! Query engine session
//!
//! Wraps an in-memory DuckDB connection. All relational work of the job
//! (JSON parsing, dedup, window numbering, joins, partitioned Parquet
//! writes) runs inside this session.

mod engine;

pub use engine::{quote_literal, Session};

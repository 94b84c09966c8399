//! CLI module
//!
//! Command-line interface for running the job.
//!
//! # Commands
//!
//! - `run` - Both stages in order (the default)
//! - `catalog` - Catalog stage only
//! - `activity` - Activity stage only, against a completed entity table
//! - `validate` - Check and print the resolved configuration
//! - `preview` - Print rows of a written table

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;

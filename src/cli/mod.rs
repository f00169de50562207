//! Command-line interface for agent-bench.
//!
//! Provides commands for running a benchmark, listing the tasks it would run,
//! and summarizing a persisted results file.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};

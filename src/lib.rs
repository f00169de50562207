//! agent-bench: benchmark harness for external autonomous coding agents.
//!
//! This library runs an agent CLI against natural-language tasks under a
//! time budget, isolates each run in its own working directory, and reduces
//! the agent's output into a persisted pass/fail summary.

pub mod cli;
pub mod error;
pub mod runner;

pub use error::{BenchError, ConfigError};

//! Benchmark runner for external coding agents.
//!
//! This module runs an opaque agent executable against benchmark tasks and
//! reduces what it observes into pass/fail metrics.
//!
//! # Architecture
//!
//! ```text
//! Driver → (per task) Sandbox context → TaskRunner → agent process
//!        → OutputReducer → ExecutionResult → BenchmarkSummary → results.json
//! ```
//!
//! The runner:
//! 1. Gives each task a private working directory and a sanitized environment
//! 2. Spawns the agent with the instruction under a hard timeout
//! 3. Matches known status markers in the agent's output
//! 4. Counts the files the agent left behind
//! 5. Persists the ordered results and prints per-category totals
//!
//! # Example
//!
//! ```ignore
//! use agent_bench::runner::{sample_tasks, BenchConfig, BenchmarkDriver};
//!
//! let config = BenchConfig::new()
//!     .with_root("/tmp/krenk-bench")
//!     .with_timeout(Duration::from_secs(600));
//!
//! let driver = BenchmarkDriver::new(config)?;
//! let summary = driver.run(&sample_tasks()).await?;
//!
//! println!("{}/{} passed", summary.passed(), summary.total());
//! ```

pub mod agents;
pub mod aggregate;
pub mod config;
pub mod driver;
pub mod executor;
pub mod reducer;
pub mod result;
pub mod sandbox;
pub mod task;

pub use agents::{create_adapter, AgentAdapter, AgentError, GenericAdapter, KrenkAdapter};
pub use aggregate::{BenchmarkSummary, CategoryStats};
pub use config::BenchConfig;
pub use driver::{resolve_api_key, BenchmarkDriver};
pub use executor::TaskRunner;
pub use reducer::{Marker, MarkerReducer, OutputReducer, ReducedOutput};
pub use result::{derive_success, ExecutionOutcome, ExecutionResult};
pub use sandbox::{ExecutionContext, Sandbox};
pub use task::{load_tasks, sample_tasks, Task};

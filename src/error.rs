//! Error types for agent-bench operations.
//!
//! Defines the errors that abort a benchmark run:
//! - Configuration loading and validation
//! - Task list loading
//! - Provisioning (the agent under test is not usable)
//! - Persistence of the results artifact
//!
//! Failures intrinsic to a single task (timeouts, spawn faults, unparseable
//! output) are not errors at this level; they are recorded in the task's
//! result and the run continues.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort a benchmark run.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The agent under test is missing or not runnable; raised before any task executes.
    #[error("Provisioning failed: {0}")]
    Provisioning(String),

    #[error("Invalid task list: {0}")]
    InvalidTask(String),

    #[error("Failed to load tasks from '{path}': {message}")]
    TaskLoad { path: String, message: String },

    /// The results artifact could not be written.
    #[error("Failed to persist results to '{}': {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

//! Raw process outcomes and the per-task results derived from them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::reducer::{Marker, ReducedOutput};
use super::task::Task;

/// Exit code reserved for "did not exit normally".
pub const ABNORMAL_EXIT: i32 = -1;

/// Error text recorded for a task that hit the timeout.
pub const TIMEOUT_ERROR: &str = "timeout";

/// What the runner observed for one process invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    /// Exit code, or [`ABNORMAL_EXIT`] on timeout, signal or harness fault.
    pub exit_code: i32,
    /// Captured standard output (possibly partial on timeout).
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Elapsed wall-clock seconds, rounded to one decimal.
    pub duration_sec: f64,
    /// Whether the process was killed for exceeding the timeout.
    pub timed_out: bool,
    /// Fault raised by the harness itself (spawn failure, wait failure).
    pub harness_error: Option<String>,
}

impl ExecutionOutcome {
    /// A process that ran to completion.
    pub fn exited(exit_code: i32, stdout: String, stderr: String, elapsed: Duration) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration_sec: round_secs(elapsed),
            timed_out: false,
            harness_error: None,
        }
    }

    /// A process killed at the timeout; whatever output it produced is kept.
    pub fn timed_out(stdout: String, stderr: String, elapsed: Duration) -> Self {
        Self {
            exit_code: ABNORMAL_EXIT,
            stdout,
            stderr,
            duration_sec: round_secs(elapsed),
            timed_out: true,
            harness_error: None,
        }
    }

    /// The harness failed to run or observe the process.
    pub fn harness_fault(error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            exit_code: ABNORMAL_EXIT,
            stdout: String::new(),
            stderr: String::new(),
            duration_sec: round_secs(elapsed),
            timed_out: false,
            harness_error: Some(error.into()),
        }
    }

    /// Error text for the result: `"timeout"`, the harness fault, or nothing.
    pub fn error(&self) -> Option<String> {
        if self.timed_out {
            Some(TIMEOUT_ERROR.to_string())
        } else {
            self.harness_error.clone()
        }
    }
}

/// Decides whether a task passed.
///
/// Process-level signals are authoritative: a non-zero exit, a timeout or a
/// harness fault always fails the task, whatever the output says. A clean
/// exit additionally needs the agent's completion marker; a failure marker or
/// unparseable output fails the task.
pub fn derive_success(
    exit_code: i32,
    timed_out: bool,
    harness_error: Option<&str>,
    marker: Marker,
) -> bool {
    exit_code == 0 && !timed_out && harness_error.is_none() && marker == Marker::Completed
}

/// The stored result for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub task_id: String,
    pub category: String,
    pub success: bool,
    pub exit_code: i32,
    pub duration_sec: f64,
    /// Regular files left in the workspace, bookkeeping directory excluded.
    pub files_created: usize,
    pub stdout_len: usize,
    pub stderr_len: usize,
    /// Set only on timeout or harness fault.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages_completed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_str: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ExecutionResult {
    /// Builds the result for `task` from the raw outcome and the reducer's findings.
    pub fn from_outcome(
        task: &Task,
        outcome: &ExecutionOutcome,
        reduced: &ReducedOutput,
        files_created: usize,
    ) -> Self {
        let success = derive_success(
            outcome.exit_code,
            outcome.timed_out,
            outcome.harness_error.as_deref(),
            reduced.marker,
        );

        Self {
            task_id: task.id.clone(),
            category: task.category.clone(),
            success,
            exit_code: outcome.exit_code,
            duration_sec: outcome.duration_sec,
            files_created,
            stdout_len: outcome.stdout.len(),
            stderr_len: outcome.stderr.len(),
            error: outcome.error(),
            stages_completed: reduced.stages_completed,
            duration_str: reduced.duration_str.clone(),
            note: reduced.note.clone(),
        }
    }

    /// Short status word for progress output.
    pub fn status_label(&self) -> &'static str {
        match (self.success, self.error.as_deref()) {
            (true, _) => "PASS",
            (false, Some(TIMEOUT_ERROR)) => "TIMEOUT",
            (false, Some(_)) => "ERROR",
            (false, None) => "FAIL",
        }
    }
}

/// Rounds a duration to seconds with one decimal.
pub fn round_secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 10.0).round() / 10.0
}

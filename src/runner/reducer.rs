//! Reduces the agent's free-text output to a structured record.
//!
//! The agent's output format carries no contract, so reduction is pattern
//! matching against a couple of known markers and never fails: output without
//! a recognizable marker is recorded as such.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Note recorded when no marker is found.
pub const UNPARSED_NOTE: &str = "could not parse output";

static DONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Completed (\d+) stages? in (.+)").unwrap());

static FAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[fail\] Workflow failed after (\d+) stages?").unwrap());

/// Which status marker the output carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    /// "Completed N stages in ..."
    Completed,
    /// "[fail] Workflow failed after N stages"
    Failed,
    /// Neither marker was present.
    Unparsed,
}

/// Structured view of one run's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedOutput {
    pub marker: Marker,
    /// Marker-level verdict; the final verdict is `result::derive_success`.
    pub success: bool,
    pub stages_completed: Option<u32>,
    pub duration_str: Option<String>,
    pub note: Option<String>,
    pub output_length: usize,
    pub stderr_length: usize,
}

/// Strategy turning raw output into a [`ReducedOutput`].
///
/// Implementations must not panic for any input.
pub trait OutputReducer: Send + Sync {
    fn reduce(&self, stdout: &str, stderr: &str) -> ReducedOutput;
}

/// Default reducer matching the agent's completion and failure lines.
#[derive(Debug, Clone)]
pub struct MarkerReducer {
    done: Regex,
    fail: Regex,
}

impl MarkerReducer {
    /// Creates a reducer for the default marker patterns.
    pub fn new() -> Self {
        Self {
            done: DONE_PATTERN.clone(),
            fail: FAIL_PATTERN.clone(),
        }
    }

    /// Creates a reducer for custom patterns.
    ///
    /// `done` must capture the stage count and the duration text; `fail` must
    /// capture the stage count.
    pub fn with_patterns(done: &str, fail: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            done: Regex::new(done)?,
            fail: Regex::new(fail)?,
        })
    }
}

impl Default for MarkerReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputReducer for MarkerReducer {
    fn reduce(&self, stdout: &str, stderr: &str) -> ReducedOutput {
        let mut reduced = ReducedOutput {
            marker: Marker::Unparsed,
            success: false,
            stages_completed: None,
            duration_str: None,
            note: None,
            output_length: stdout.len(),
            stderr_length: stderr.len(),
        };

        let done = self.done.captures(stdout);
        if let Some(caps) = &done {
            reduced.stages_completed = caps.get(1).and_then(|m| m.as_str().parse().ok());
            reduced.duration_str = caps.get(2).map(|m| m.as_str().trim().to_string());
        }

        // A failure line wins over a completion line.
        if let Some(caps) = self.fail.captures(stdout) {
            reduced.marker = Marker::Failed;
            reduced.stages_completed = caps.get(1).and_then(|m| m.as_str().parse().ok());
            reduced.duration_str = None;
        } else if done.is_some() {
            reduced.marker = Marker::Completed;
            reduced.success = true;
        } else {
            reduced.note = Some(UNPARSED_NOTE.to_string());
        }

        reduced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reduce(stdout: &str) -> ReducedOutput {
        MarkerReducer::new().reduce(stdout, "")
    }

    #[test]
    fn test_completion_marker() {
        let r = reduce("planning...\n[done] Completed 3 stages in 45s\n");
        assert_eq!(r.marker, Marker::Completed);
        assert!(r.success);
        assert_eq!(r.stages_completed, Some(3));
        assert_eq!(r.duration_str.as_deref(), Some("45s"));
        assert!(r.note.is_none());
    }

    #[test]
    fn test_singular_stage_and_compound_duration() {
        let r = reduce("Completed 1 stage in 2m 13s");
        assert_eq!(r.stages_completed, Some(1));
        assert_eq!(r.duration_str.as_deref(), Some("2m 13s"));
    }

    #[test]
    fn test_failure_marker() {
        let r = reduce("[fail] Workflow failed after 2 stages");
        assert_eq!(r.marker, Marker::Failed);
        assert!(!r.success);
        assert_eq!(r.stages_completed, Some(2));
        assert!(r.note.is_none());
    }

    #[test]
    fn test_failure_wins_over_completion() {
        let r = reduce("Completed 4 stages in 10s\n[fail] Workflow failed after 5 stages\n");
        assert_eq!(r.marker, Marker::Failed);
        assert!(!r.success);
        assert_eq!(r.stages_completed, Some(5));
        assert_eq!(r.duration_str, None);
    }

    #[test]
    fn test_unparseable_output() {
        for input in ["", "hello world", "Completed stages", "\u{0}\u{fffd}garbage"] {
            let r = reduce(input);
            assert_eq!(r.marker, Marker::Unparsed);
            assert!(!r.success);
            assert_eq!(r.note.as_deref(), Some(UNPARSED_NOTE));
        }
    }

    #[test]
    fn test_records_lengths() {
        let r = MarkerReducer::new().reduce("abc", "de");
        assert_eq!(r.output_length, 3);
        assert_eq!(r.stderr_length, 2);
    }

    #[test]
    fn test_overflowing_stage_count_does_not_panic() {
        let r = reduce("Completed 99999999999999999999 stages in 1s");
        assert_eq!(r.marker, Marker::Completed);
        assert_eq!(r.stages_completed, None);
    }

    #[test]
    fn test_custom_patterns() {
        let reducer = MarkerReducer::with_patterns(r"OK (\d+) steps? \((.+)\)", r"ERR after (\d+)").unwrap();
        let r = reducer.reduce("OK 7 steps (3s)", "");
        assert_eq!(r.marker, Marker::Completed);
        assert_eq!(r.stages_completed, Some(7));
        assert_eq!(r.duration_str.as_deref(), Some("3s"));

        assert!(MarkerReducer::with_patterns("(", "x").is_err());
    }
}

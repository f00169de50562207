//! Folding per-task results into a summary and persisting them.
//!
//! Every aggregate is computed from `results` on demand, so the numbers can
//! never drift from the records they describe.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::result::ExecutionResult;
use crate::error::BenchError;

/// Pass/total counts for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub passed: usize,
    pub total: usize,
}

/// Ordered results of one benchmark run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenchmarkSummary {
    results: Vec<ExecutionResult>,
}

impl BenchmarkSummary {
    /// Wraps results that are already in task order.
    pub fn new(results: Vec<ExecutionResult>) -> Self {
        Self { results }
    }

    /// Appends the next task's result.
    pub fn push(&mut self, result: ExecutionResult) {
        self.results.push(result);
    }

    /// Results in task order.
    pub fn results(&self) -> &[ExecutionResult] {
        &self.results
    }

    /// Consumes the summary, returning the results.
    pub fn into_results(self) -> Vec<ExecutionResult> {
        self.results
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// Fraction of passing tasks; `0.0` when there are none.
    pub fn pass_rate(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            self.passed() as f64 / self.total() as f64
        }
    }

    pub fn total_duration_sec(&self) -> f64 {
        self.results.iter().map(|r| r.duration_sec).sum()
    }

    pub fn total_files_created(&self) -> usize {
        self.results.iter().map(|r| r.files_created).sum()
    }

    /// Per-category counts, sorted by category name.
    pub fn by_category(&self) -> BTreeMap<String, CategoryStats> {
        let mut categories: BTreeMap<String, CategoryStats> = BTreeMap::new();
        for result in &self.results {
            let stats = categories.entry(result.category.clone()).or_default();
            stats.total += 1;
            if result.success {
                stats.passed += 1;
            }
        }
        categories
    }

    /// Writes the full ordered result list as pretty JSON, replacing any
    /// previous file at `path`.
    pub fn persist(&self, path: &Path) -> Result<(), BenchError> {
        let json = serde_json::to_string_pretty(&self.results)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| BenchError::Persistence {
                path: path.to_path_buf(),
                source,
            })?;
        }

        fs::write(path, json).map_err(|source| BenchError::Persistence {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), results = self.results.len(), "Results persisted");
        Ok(())
    }

    /// Reads a results file written by [`persist`](Self::persist).
    pub fn load(path: &Path) -> Result<Self, BenchError> {
        let content = fs::read_to_string(path)?;
        let results: Vec<ExecutionResult> = serde_json::from_str(&content)?;
        Ok(Self::new(results))
    }

    /// Human-readable report block.
    pub fn render(&self) -> String {
        let rule = "=".repeat(60);
        let mut out = String::new();

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(
            out,
            "  RESULTS: {}/{} passed ({:.0}%)",
            self.passed(),
            self.total(),
            self.pass_rate() * 100.0
        );
        let _ = writeln!(out, "  Total time: {:.0}s", self.total_duration_sec());
        let _ = writeln!(out, "  Total files created: {}", self.total_files_created());
        let _ = writeln!(out, "{}", rule);

        let categories = self.by_category();
        if !categories.is_empty() {
            let _ = writeln!(out, "\n  By category:");
            for (category, stats) in &categories {
                let _ = writeln!(out, "    {}: {}/{}", category, stats.passed, stats.total);
            }
        }

        out
    }
}

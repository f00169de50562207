//! Benchmark driver: runs a task list through the pipeline, one task at a time.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use super::agents::{create_adapter, AgentAdapter};
use super::aggregate::BenchmarkSummary;
use super::config::BenchConfig;
use super::executor::TaskRunner;
use super::reducer::{MarkerReducer, OutputReducer};
use super::result::{ExecutionOutcome, ExecutionResult};
use super::sandbox::{is_safe_task_id, Sandbox};
use super::task::{validate_tasks, Task};
use crate::error::BenchError;

/// Upper bound for the `--version` check; a shorter task timeout applies instead.
const PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sequences tasks through runner, reducer and aggregator.
pub struct BenchmarkDriver {
    config: BenchConfig,
    sandbox: Sandbox,
    runner: TaskRunner,
    reducer: Box<dyn OutputReducer>,
    quiet: bool,
}

impl BenchmarkDriver {
    /// Creates a driver for the agent named in `config`.
    pub fn new(config: BenchConfig) -> Result<Self, BenchError> {
        let adapter: Arc<dyn AgentAdapter> = Arc::from(create_adapter(&config.agent_command));
        Self::with_adapter(config, adapter)
    }

    /// Creates a driver for an explicit adapter.
    pub fn with_adapter(config: BenchConfig, adapter: Arc<dyn AgentAdapter>) -> Result<Self, BenchError> {
        config.validate()?;

        let sandbox = Sandbox::new(&config.bench_root)
            .with_strip_env(config.strip_env.iter().cloned())
            .with_bookkeeping_dir(config.bookkeeping_dir.clone());
        let runner = TaskRunner::new(adapter).with_api_key_var(config.api_key_var.clone());

        Ok(Self {
            config,
            sandbox,
            runner,
            reducer: Box::new(MarkerReducer::new()),
            quiet: false,
        })
    }

    /// Replaces the output reducer.
    pub fn with_reducer(mut self, reducer: Box<dyn OutputReducer>) -> Self {
        self.reducer = reducer;
        self
    }

    /// Suppresses console progress lines.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Fails with [`BenchError::Provisioning`] unless the agent can be run.
    pub async fn preflight(&self) -> Result<(), BenchError> {
        let adapter = self.runner.adapter();
        let limit = self.config.timeout.min(PREFLIGHT_TIMEOUT);
        match timeout(limit, adapter.version()).await {
            Ok(Some(version)) => {
                info!(agent = %adapter.name(), version = %version, "Agent available");
                Ok(())
            }
            Ok(None) => Err(BenchError::Provisioning(format!(
                "agent '{}' is not runnable ('{} --version' failed)",
                adapter.name(),
                adapter.program()
            ))),
            Err(_) => {
                warn!(agent = %adapter.name(), timeout_secs = limit.as_secs_f64(), "Version check timed out");
                Err(BenchError::Provisioning(format!(
                    "agent '{}' did not answer '{} --version' within {:.1}s",
                    adapter.name(),
                    adapter.program(),
                    limit.as_secs_f64()
                )))
            }
        }
    }

    /// Runs every task in order and persists the results.
    ///
    /// Per-task failures are recorded and never stop the run; a failed
    /// preflight or a failed write of the results file does.
    pub async fn run(&self, tasks: &[Task]) -> Result<BenchmarkSummary, BenchError> {
        validate_tasks(tasks)?;

        if self.config.preflight {
            self.preflight().await?;
        }

        let api_key = resolve_api_key(&self.config.api_key_var);
        let run_id = Uuid::new_v4();
        info!(
            run_id = %run_id,
            started_at = %Utc::now().to_rfc3339(),
            tasks = tasks.len(),
            agent = %self.runner.adapter().name(),
            "Benchmark run started"
        );

        self.print_header(tasks.len());

        let mut summary = BenchmarkSummary::default();
        for (idx, task) in tasks.iter().enumerate() {
            self.progress(format!("[{}/{}] {} ({})", idx + 1, tasks.len(), task.id, task.category));
            self.progress(format!("  Task: {}", task.instruction_preview(80)));

            let result = self.run_one(task, &api_key).await;

            let mut line = format!(
                "  Result: {} | {}s | {} files created",
                result.status_label(),
                result.duration_sec,
                result.files_created
            );
            if let Some(err) = &result.error {
                line.push_str(&format!(" | {}", err));
            } else if let Some(note) = &result.note {
                line.push_str(&format!(" | {}", note));
            }
            self.progress(line);
            self.progress(String::new());

            summary.push(result);
        }

        self.progress(summary.render());
        summary.persist(&self.config.results_path)?;
        self.progress(format!("\n  Results saved to: {}", self.config.results_path.display()));

        info!(
            run_id = %run_id,
            passed = summary.passed(),
            total = summary.total(),
            "Benchmark run finished"
        );

        Ok(summary)
    }

    /// Runs one task through context, runner and reducer. Never fails.
    pub async fn run_one(&self, task: &Task, api_key: &str) -> ExecutionResult {
        let (outcome, files_created) = match self.sandbox.context(&task.id) {
            Ok(ctx) => {
                let outcome = self
                    .runner
                    .run_task(task, &ctx, api_key, self.config.timeout)
                    .await;
                (outcome, ctx.count_user_files())
            }
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Could not prepare working directory");
                (
                    ExecutionOutcome::harness_fault(
                        format!("failed to prepare working directory: {}", e),
                        Duration::ZERO,
                    ),
                    0,
                )
            }
        };

        if let Some(dir) = &self.config.log_dir {
            if let Err(e) = write_task_log(dir, &task.id, &outcome) {
                warn!(task_id = %task.id, error = %e, "Failed to write task log");
            }
        }

        let reduced = self.reducer.reduce(&outcome.stdout, &outcome.stderr);
        let result = ExecutionResult::from_outcome(task, &outcome, &reduced, files_created);

        info!(
            task_id = %result.task_id,
            success = result.success,
            exit_code = result.exit_code,
            duration_sec = result.duration_sec,
            files_created = result.files_created,
            "Task finished"
        );

        result
    }

    fn print_header(&self, count: usize) {
        let rule = "=".repeat(60);
        self.progress(format!("\n{}", rule));
        self.progress(format!("  {} Standalone Benchmark", self.runner.adapter().name()));
        self.progress(format!("  Tasks: {}", count));
        self.progress(format!("  Timeout per task: {}s", self.config.timeout.as_secs()));
        self.progress(format!("{}\n", rule));
    }

    fn progress(&self, line: String) {
        if !self.quiet {
            println!("{}", line);
        }
    }
}

/// Reads the credential from `var`; a missing value is a warning, not an error.
pub fn resolve_api_key(var: &str) -> String {
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => key,
        _ => {
            warn!(var = %var, "Credential not set; the agent will run with an empty key");
            String::new()
        }
    }
}

/// Writes the raw output of one task to `<dir>/<task_id>.log`.
fn write_task_log(dir: &Path, task_id: &str, outcome: &ExecutionOutcome) -> std::io::Result<()> {
    if !is_safe_task_id(task_id) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("task id '{}' is not a valid file name", task_id),
        ));
    }
    fs::create_dir_all(dir)?;
    let content = format!(
        "=== STDOUT ===\n{}\n\n=== STDERR ===\n{}\n\n=== EXIT CODE ===\n{}\n",
        outcome.stdout, outcome.stderr, outcome.exit_code
    );
    fs::write(dir.join(format!("{}.log", task_id)), content)
}

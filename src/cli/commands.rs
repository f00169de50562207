//! CLI command definitions for agent-bench.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::runner::aggregate::CategoryStats;
use crate::runner::config::DEFAULT_BENCH_ROOT;
use crate::runner::{
    load_tasks, sample_tasks, BenchConfig, BenchmarkDriver, BenchmarkSummary, ExecutionResult,
    Task,
};

/// Benchmark an external coding agent against natural-language tasks.
#[derive(Parser)]
#[command(name = "agent-bench")]
#[command(about = "Run a coding agent against benchmark tasks and summarize pass/fail metrics")]
#[command(version)]
#[command(
    long_about = "agent-bench feeds tasks to an agent CLI one at a time, each in its own working directory under a hard timeout, and writes the ordered results to a JSON file.\n\nExample usage:\n  agent-bench run --tasks tasks.yaml --timeout 600\n  agent-bench summary --results /tmp/krenk-bench/results.json"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the benchmark.
    ///
    /// Tasks run sequentially. Timeouts and agent crashes are recorded per
    /// task; the run only aborts if the agent is not runnable or the results
    /// file cannot be written.
    #[command(alias = "bench")]
    Run(RunArgs),

    /// List the tasks a run would execute.
    Tasks(TasksArgs),

    /// Print the summary of a persisted results file.
    Summary(SummaryArgs),
}

/// Arguments for `agent-bench run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// YAML or JSON task list; the built-in samples are used when omitted.
    #[arg(short = 't', long)]
    pub tasks: Option<String>,

    /// YAML config file applied on top of environment settings.
    #[arg(short = 'c', long)]
    pub config: Option<String>,

    /// Timeout in seconds per task.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Root directory for per-task workspaces.
    #[arg(long)]
    pub root: Option<String>,

    /// Output file for results (JSON format).
    #[arg(short = 'o', long)]
    pub results: Option<String>,

    /// Agent executable to benchmark.
    #[arg(short = 'a', long)]
    pub agent: Option<String>,

    /// Environment variable holding the agent's API key.
    #[arg(long)]
    pub api_key_var: Option<String>,

    /// Directory for per-task raw output logs.
    #[arg(long)]
    pub log_dir: Option<String>,

    /// Skip the agent availability check.
    #[arg(long)]
    pub skip_preflight: bool,

    /// Output JSON to stdout instead of interactive progress.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `agent-bench tasks`.
#[derive(Parser, Debug)]
pub struct TasksArgs {
    /// YAML or JSON task list; the built-in samples are listed when omitted.
    #[arg(short = 't', long)]
    pub tasks: Option<String>,

    /// Output JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `agent-bench summary`.
#[derive(Parser, Debug)]
pub struct SummaryArgs {
    /// Results file written by a previous run.
    #[arg(short = 'r', long, default_value_t = default_results_path())]
    pub results: String,

    /// Output JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

fn default_results_path() -> String {
    Path::new(DEFAULT_BENCH_ROOT)
        .join("results.json")
        .display()
        .to_string()
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_benchmark_command(args).await,
        Commands::Tasks(args) => run_tasks_command(args),
        Commands::Summary(args) => run_summary_command(args),
    }
}

// ============================================================================
// Output types
// ============================================================================

/// JSON output structure for a benchmark summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
    pub total_duration_sec: f64,
    pub total_files_created: usize,
    pub by_category: BTreeMap<String, CategoryStats>,
    pub results: Vec<ExecutionResult>,
}

impl From<&BenchmarkSummary> for SummaryOutput {
    fn from(summary: &BenchmarkSummary) -> Self {
        Self {
            total: summary.total(),
            passed: summary.passed(),
            failed: summary.failed(),
            pass_rate: summary.pass_rate(),
            total_duration_sec: summary.total_duration_sec(),
            total_files_created: summary.total_files_created(),
            by_category: summary.by_category(),
            results: summary.results().to_vec(),
        }
    }
}

// ============================================================================
// Command implementations
// ============================================================================

/// Layers environment, config file and flags into one configuration.
fn build_config(args: &RunArgs) -> anyhow::Result<BenchConfig> {
    let mut config = BenchConfig::from_env()?;

    if let Some(path) = &args.config {
        config = config.merge_file(Path::new(path))?;
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(root) = &args.root {
        config = config.with_root(root);
    }
    if let Some(results) = &args.results {
        config = config.with_results_path(PathBuf::from(results));
    }
    if let Some(agent) = &args.agent {
        config = config.with_agent(agent);
    }
    if let Some(var) = &args.api_key_var {
        config = config.with_api_key_var(var);
    }
    if let Some(dir) = &args.log_dir {
        config = config.with_log_dir(dir);
    }
    if args.skip_preflight {
        config = config.without_preflight();
    }

    config.validate()?;
    Ok(config)
}

fn resolve_tasks(path: Option<&str>) -> anyhow::Result<Vec<Task>> {
    match path {
        Some(path) => {
            let tasks = load_tasks(Path::new(path))?;
            if tasks.is_empty() {
                return Err(anyhow::anyhow!("No tasks found in {}", path));
            }
            info!(count = tasks.len(), path = %path, "Loaded tasks");
            Ok(tasks)
        }
        None => Ok(sample_tasks()),
    }
}

async fn run_benchmark_command(args: RunArgs) -> anyhow::Result<()> {
    let config = build_config(&args)?;
    let tasks = resolve_tasks(args.tasks.as_deref())?;

    let driver = BenchmarkDriver::new(config)?.quiet(args.json);
    let summary = driver.run(&tasks).await?;

    if args.json {
        let output = SummaryOutput::from(&summary);
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}

fn run_tasks_command(args: TasksArgs) -> anyhow::Result<()> {
    let tasks = resolve_tasks(args.tasks.as_deref())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    for task in &tasks {
        println!("{} ({})", task.id, task.category);
        println!("  {}", task.instruction_preview(100));
    }
    println!("\n{} task(s)", tasks.len());
    Ok(())
}

fn run_summary_command(args: SummaryArgs) -> anyhow::Result<()> {
    let summary = BenchmarkSummary::load(Path::new(&args.results))
        .map_err(|e| anyhow::anyhow!("Failed to read results from {}: {}", args.results, e))?;

    if args.json {
        let output = SummaryOutput::from(&summary);
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", summary.render());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_command_defaults() {
        let cli = Cli::try_parse_from(["agent-bench", "run"]).expect("should parse");

        match cli.command {
            Commands::Run(args) => {
                assert!(args.tasks.is_none());
                assert!(args.timeout.is_none());
                assert!(args.results.is_none());
                assert!(!args.skip_preflight);
                assert!(!args.json);
            }
            _ => panic!("Expected Run command"),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_run_command_with_all_options() {
        let args = vec![
            "agent-bench",
            "run",
            "-t",
            "./tasks.yaml",
            "--timeout",
            "600",
            "--root",
            "/srv/bench",
            "-o",
            "./results.json",
            "-a",
            "/opt/krenk",
            "--log-dir",
            "./logs",
            "--skip-preflight",
            "-j",
            "--log-level",
            "debug",
        ];
        let cli = Cli::try_parse_from(args).expect("should parse");
        assert_eq!(cli.log_level, "debug");

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.tasks.as_deref(), Some("./tasks.yaml"));
                assert_eq!(args.timeout, Some(600));
                assert_eq!(args.root.as_deref(), Some("/srv/bench"));
                assert_eq!(args.results.as_deref(), Some("./results.json"));
                assert_eq!(args.agent.as_deref(), Some("/opt/krenk"));
                assert_eq!(args.log_dir.as_deref(), Some("./logs"));
                assert!(args.skip_preflight);
                assert!(args.json);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_bench_alias() {
        let cli = Cli::try_parse_from(["agent-bench", "bench", "--timeout", "5"]).expect("should parse with alias");
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn test_summary_default_path() {
        let cli = Cli::try_parse_from(["agent-bench", "summary"]).expect("should parse");
        match cli.command {
            Commands::Summary(args) => assert_eq!(args.results, "/tmp/krenk-bench/results.json"),
            _ => panic!("Expected Summary command"),
        }
    }

    #[test]
    fn test_build_config_flags_override() {
        let cli = Cli::try_parse_from([
            "agent-bench",
            "run",
            "--timeout",
            "42",
            "--root",
            "/srv/bench",
            "--agent",
            "other",
            "--skip-preflight",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("Expected Run command");
        };

        let config = build_config(&args).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(42));
        assert_eq!(config.bench_root, PathBuf::from("/srv/bench"));
        assert_eq!(config.results_path, PathBuf::from("/srv/bench/results.json"));
        assert_eq!(config.agent_command, "other");
        assert!(!config.preflight);
    }

    #[test]
    fn test_summary_output_from_summary() {
        let summary = BenchmarkSummary::new(vec![ExecutionResult {
            task_id: "t1".into(),
            category: "coding".into(),
            success: true,
            exit_code: 0,
            duration_sec: 12.5,
            files_created: 3,
            stdout_len: 100,
            stderr_len: 0,
            error: None,
            stages_completed: Some(2),
            duration_str: Some("12s".into()),
            note: None,
        }]);

        let output = SummaryOutput::from(&summary);
        let json = serde_json::to_string_pretty(&output).expect("serialization should succeed");
        assert!(json.contains("\"total\": 1"));
        assert!(json.contains("\"pass_rate\": 1.0"));
        assert!(json.contains("\"coding\": {"));
        assert!(json.contains("\"task_id\": \"t1\""));
    }

    #[test]
    fn test_resolve_tasks_defaults_to_samples() {
        let tasks = resolve_tasks(None).unwrap();
        assert_eq!(tasks.len(), 5);
    }
}

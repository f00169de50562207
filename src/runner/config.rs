//! Configuration for benchmark runs.
//!
//! A [`BenchConfig`] is built once and handed to the driver and runner at
//! construction, so separate runs with different settings can coexist in one
//! process. Values are layered: defaults, then environment, then an optional
//! YAML file, then explicit builder calls (the CLI flags).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default per-task timeout (15 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 900;

/// Default root under which per-task working directories are created.
pub const DEFAULT_BENCH_ROOT: &str = "/tmp/krenk-bench";

/// Default agent executable.
pub const DEFAULT_AGENT: &str = "krenk";

/// Variable carrying the agent's credential.
pub const DEFAULT_API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Directory the agent keeps its own state in; never counted as user output.
pub const DEFAULT_BOOKKEEPING_DIR: &str = ".krenk";

/// Variables that make the agent believe it is already inside a session.
pub const NESTED_SESSION_MARKERS: &[&str] = &["CLAUDECODE", "CLAUDE_CODE_ENTRYPOINT"];

/// Configuration for a benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    /// Hard wall-clock ceiling per task.
    pub timeout: Duration,
    /// Root directory for per-task working directories.
    pub bench_root: PathBuf,
    /// Where the results artifact is written.
    pub results_path: PathBuf,
    /// Agent executable (looked up on PATH).
    pub agent_command: String,
    /// Environment variable holding the credential.
    pub api_key_var: String,
    /// Variables stripped from the agent's environment.
    pub strip_env: Vec<String>,
    /// Directory inside each workspace owned by the agent.
    pub bookkeeping_dir: String,
    /// Optional directory for per-task raw output logs.
    pub log_dir: Option<PathBuf>,
    /// Whether to check the agent is runnable before the first task.
    pub preflight: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        let root = PathBuf::from(DEFAULT_BENCH_ROOT);
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            results_path: root.join("results.json"),
            bench_root: root,
            agent_command: DEFAULT_AGENT.to_string(),
            api_key_var: DEFAULT_API_KEY_VAR.to_string(),
            strip_env: NESTED_SESSION_MARKERS.iter().map(|s| s.to_string()).collect(),
            bookkeeping_dir: DEFAULT_BOOKKEEPING_DIR.to_string(),
            log_dir: None,
            preflight: true,
        }
    }
}

impl BenchConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BENCH_TIMEOUT_SECS`: per-task timeout in seconds (default: 900)
    /// - `BENCH_ROOT`: benchmark root (default: /tmp/krenk-bench); also moves
    ///   the results file to `<root>/results.json`
    /// - `BENCH_RESULTS_PATH`: results artifact path
    /// - `BENCH_AGENT`: agent executable (default: krenk)
    /// - `BENCH_API_KEY_VAR`: credential variable (default: ANTHROPIC_API_KEY)
    /// - `BENCH_LOG_DIR`: directory for per-task raw output logs
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("BENCH_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "BENCH_TIMEOUT_SECS")?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("BENCH_ROOT") {
            config = config.with_root(val);
        }

        if let Ok(val) = std::env::var("BENCH_RESULTS_PATH") {
            config.results_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("BENCH_AGENT") {
            config.agent_command = val;
        }

        if let Ok(val) = std::env::var("BENCH_API_KEY_VAR") {
            config.api_key_var = val;
        }

        if let Ok(val) = std::env::var("BENCH_LOG_DIR") {
            config.log_dir = Some(PathBuf::from(val));
        }

        config.validate()?;
        Ok(config)
    }

    /// Applies the settings present in a YAML config file on top of `self`.
    pub fn merge_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let file: ConfigFile = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(root) = file.bench_root {
            self = self.with_root(root);
        }
        if let Some(results) = file.results_path {
            self.results_path = results;
        }
        if let Some(agent) = file.agent {
            self.agent_command = agent;
        }
        if let Some(var) = file.api_key_var {
            self.api_key_var = var;
        }
        if let Some(strip) = file.strip_env {
            self.strip_env = strip;
        }
        if let Some(dir) = file.bookkeeping_dir {
            self.bookkeeping_dir = dir;
        }
        if let Some(dir) = file.log_dir {
            self.log_dir = Some(dir);
        }
        if let Some(preflight) = file.preflight {
            self.preflight = preflight;
        }

        self.validate()?;
        Ok(self)
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the benchmark root. The results file follows the root unless it
    /// was moved explicitly somewhere else.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        if self.results_path == self.bench_root.join("results.json") {
            self.results_path = root.join("results.json");
        }
        self.bench_root = root;
        self
    }

    /// Sets the results artifact path.
    pub fn with_results_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_path = path.into();
        self
    }

    /// Sets the agent executable.
    pub fn with_agent(mut self, command: impl Into<String>) -> Self {
        self.agent_command = command.into();
        self
    }

    /// Sets the credential variable name.
    pub fn with_api_key_var(mut self, var: impl Into<String>) -> Self {
        self.api_key_var = var.into();
        self
    }

    /// Sets the per-task log directory.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Skips the agent availability check.
    pub fn without_preflight(mut self) -> Self {
        self.preflight = false;
        self
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "timeout must be greater than 0".to_string(),
            ));
        }

        if self.agent_command.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "agent command cannot be empty".to_string(),
            ));
        }

        if self.bench_root.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "bench root cannot be empty".to_string(),
            ));
        }

        if self.api_key_var.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "api key variable cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// On-disk shape of a config file; every field is optional.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    timeout_secs: Option<u64>,
    bench_root: Option<PathBuf>,
    results_path: Option<PathBuf>,
    agent: Option<String>,
    api_key_var: Option<String>,
    strip_env: Option<Vec<String>>,
    bookkeeping_dir: Option<String>,
    log_dir: Option<PathBuf>,
    preflight: Option<bool>,
}

fn parse_env_value<T: std::str::FromStr>(val: &str, key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    val.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

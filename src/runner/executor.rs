//! Task runner: one agent invocation under a hard timeout.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::agents::{AgentAdapter, AgentError};
use super::config::DEFAULT_API_KEY_VAR;
use super::result::{ExecutionOutcome, ABNORMAL_EXIT};
use super::sandbox::ExecutionContext;
use super::task::Task;

/// Grace period for draining output pipes after the process ended or was killed.
const IO_CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs a single task against the agent.
///
/// `run_task` never returns an error: timeouts and harness faults are part of
/// the returned [`ExecutionOutcome`], so a batch always moves on to the next
/// task. This is also the primitive an external orchestrator calls per sandbox.
pub struct TaskRunner {
    adapter: Arc<dyn AgentAdapter>,
    api_key_var: String,
}

impl TaskRunner {
    /// Creates a runner for the given agent.
    pub fn new(adapter: Arc<dyn AgentAdapter>) -> Self {
        Self {
            adapter,
            api_key_var: DEFAULT_API_KEY_VAR.to_string(),
        }
    }

    /// Sets the variable the credential is passed in.
    pub fn with_api_key_var(mut self, var: impl Into<String>) -> Self {
        self.api_key_var = var.into();
        self
    }

    /// Returns the adapter this runner invokes.
    pub fn adapter(&self) -> &dyn AgentAdapter {
        self.adapter.as_ref()
    }

    /// Runs `task` inside `ctx`, killing the agent once `limit` elapses.
    pub async fn run_task(
        &self,
        task: &Task,
        ctx: &ExecutionContext,
        api_key: &str,
        limit: Duration,
    ) -> ExecutionOutcome {
        let start = Instant::now();
        let program = self.adapter.program();

        let mut cmd = Command::new(program);
        cmd.args(self.adapter.args(&task.instruction))
            .current_dir(&ctx.working_dir)
            .env_clear()
            .envs(&ctx.env)
            .env(&self.api_key_var, api_key)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a timeout can take down everything the agent started.
        #[cfg(unix)]
        cmd.process_group(0);

        info!(
            task_id = %task.id,
            agent = %self.adapter.name(),
            dir = %ctx.working_dir.display(),
            timeout_secs = limit.as_secs(),
            "Starting agent"
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let err = AgentError::from_spawn(program, e);
                warn!(task_id = %task.id, error = %err, "Agent failed to start");
                return ExecutionOutcome::harness_fault(err.to_string(), start.elapsed());
            }
        };

        let stdout_task = child.stdout.take().map(|out| tokio::spawn(read_all(out)));
        let stderr_task = child.stderr.take().map(|err| tokio::spawn(read_all(err)));

        let waited = timeout(limit, child.wait()).await;
        let elapsed = start.elapsed();

        let exit = match waited {
            Ok(Ok(status)) => Ok(status.code().unwrap_or(ABNORMAL_EXIT)),
            Ok(Err(e)) => {
                kill_process_group(&child, &task.id).await;
                if let Err(kill_err) = child.kill().await {
                    debug!(task_id = %task.id, error = %kill_err, "Kill after wait failure failed");
                }
                Err(Some(AgentError::Wait(e)))
            }
            Err(_) => {
                warn!(task_id = %task.id, timeout_secs = limit.as_secs(), "Agent timed out; killing");
                kill_process_group(&child, &task.id).await;
                if let Err(e) = child.kill().await {
                    warn!(task_id = %task.id, error = %e, "Failed to kill timed-out agent");
                }
                Err(None)
            }
        };

        // Pipes close once the process is gone; the readers finish quickly.
        let stdout = collect(stdout_task, &task.id, "stdout").await;
        let stderr = collect(stderr_task, &task.id, "stderr").await;

        match exit {
            Ok(code) => {
                debug!(task_id = %task.id, exit_code = code, "Agent exited");
                ExecutionOutcome::exited(code, stdout, stderr, elapsed)
            }
            Err(None) => ExecutionOutcome::timed_out(stdout, stderr, elapsed),
            Err(Some(err)) => {
                warn!(task_id = %task.id, error = %err, "Lost track of agent process");
                ExecutionOutcome::harness_fault(err.to_string(), elapsed)
            }
        }
    }
}

/// Sends SIGKILL to the child's process group; the child itself is reaped by the caller.
#[cfg(unix)]
async fn kill_process_group(child: &tokio::process::Child, task_id: &str) {
    let Some(pgid) = child.id() else {
        return;
    };
    let status = Command::new("kill")
        .args(["-KILL", "--", &format!("-{}", pgid)])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) if status.success() => {}
        Ok(status) => debug!(task_id = %task_id, pgid, code = ?status.code(), "Process group kill failed"),
        Err(e) => debug!(task_id = %task_id, pgid, error = %e, "Could not run kill"),
    }
}

#[cfg(not(unix))]
async fn kill_process_group(_child: &tokio::process::Child, _task_id: &str) {}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

async fn collect(
    task: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    task_id: &str,
    stream: &str,
) -> String {
    let Some(mut handle) = task else {
        return String::new();
    };

    match timeout(IO_CAPTURE_TIMEOUT, &mut handle).await {
        Ok(Ok(Ok(buf))) => String::from_utf8_lossy(&buf).into_owned(),
        Ok(Ok(Err(e))) => {
            warn!(task_id = %task_id, stream, error = %e, "Output capture failed");
            String::new()
        }
        Ok(Err(e)) => {
            warn!(task_id = %task_id, stream, error = %e, "Output reader panicked");
            String::new()
        }
        Err(_) => {
            // A grandchild may still hold the pipe open.
            warn!(task_id = %task_id, stream, "Output capture timed out");
            handle.abort();
            String::new()
        }
    }
}

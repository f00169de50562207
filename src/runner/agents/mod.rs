//! Agent adapters.
//!
//! An adapter knows how to invoke one agent executable: which program, which
//! arguments for a given instruction, and how to ask it for its version. The
//! runner owns process handling (environment, timeout, capture).

pub mod generic;
pub mod krenk;

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

pub use generic::GenericAdapter;
pub use krenk::KrenkAdapter;

/// Trait for agent adapters.
#[async_trait]
pub trait AgentAdapter: Send + Sync {
    /// Display name used in logs and progress output.
    fn name(&self) -> &str;

    /// Executable to spawn.
    fn program(&self) -> &str;

    /// Arguments for running `instruction`; the instruction is one argument.
    fn args(&self, instruction: &str) -> Vec<String>;

    /// Returns the agent's version, or `None` if it cannot be run.
    ///
    /// Dropping the future kills the probe, so callers can bound it with a timeout.
    async fn version(&self) -> Option<String> {
        let output = Command::new(self.program())
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .ok()?;

        if output.status.success() {
            Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            None
        }
    }

    /// Checks if this agent is available on the system.
    async fn is_available(&self) -> bool {
        self.version().await.is_some()
    }
}

/// Errors raised while starting or observing an agent process.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Agent executable not found: {0}")]
    NotFound(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process error: {0}")]
    Wait(#[source] std::io::Error),
}

impl AgentError {
    /// Classifies a spawn failure.
    pub fn from_spawn(program: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            AgentError::NotFound(program.to_string())
        } else {
            AgentError::Spawn {
                program: program.to_string(),
                source,
            }
        }
    }
}

/// Creates the adapter for an agent command: `krenk` gets its dedicated
/// adapter, anything else runs with the instruction as its only argument.
pub fn create_adapter(command: &str) -> Box<dyn AgentAdapter> {
    let is_krenk = std::path::Path::new(command)
        .file_name()
        .map(|name| name == krenk::KRENK_COMMAND)
        .unwrap_or(false);

    if is_krenk {
        Box::new(KrenkAdapter::with_command(command))
    } else {
        Box::new(GenericAdapter::new(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_adapter() {
        assert_eq!(create_adapter("krenk").name(), "krenk");
        assert_eq!(create_adapter("/usr/local/bin/krenk").program(), "/usr/local/bin/krenk");
        assert_eq!(create_adapter("/usr/local/bin/krenk").name(), "krenk");
        assert_eq!(create_adapter("my-agent").name(), "my-agent");
    }

    #[test]
    fn test_agent_error_from_spawn() {
        let err = AgentError::from_spawn(
            "krenk",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(matches!(err, AgentError::NotFound(_)));

        let err = AgentError::from_spawn(
            "krenk",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("Failed to spawn krenk"));
    }

    #[tokio::test]
    async fn test_missing_agent_is_unavailable() {
        let adapter = GenericAdapter::new("definitely-not-an-agent-binary-7c1f");
        assert!(!adapter.is_available().await);
        assert!(adapter.version().await.is_none());
    }
}

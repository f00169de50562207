//! Krenk adapter.
//!
//! Runs the multi-agent Krenk CLI headless, restricted to its planning and
//! build stages so a task finishes well inside the timeout.

use async_trait::async_trait;

use super::AgentAdapter;

/// Executable name of the Krenk CLI.
pub const KRENK_COMMAND: &str = "krenk";

/// Workflow phases skipped on every run.
pub const SKIPPED_PHASES: &[&str] = &[
    "analyzing",
    "designing",
    "qa-planning",
    "testing",
    "reviewing",
    "securing",
    "documenting",
    "deploying",
];

/// Adapter for Krenk.
pub struct KrenkAdapter {
    command: String,
}

impl KrenkAdapter {
    /// Creates an adapter using `krenk` from PATH.
    pub fn new() -> Self {
        Self::with_command(KRENK_COMMAND)
    }

    /// Creates with a custom command path.
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for KrenkAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentAdapter for KrenkAdapter {
    fn name(&self) -> &str {
        KRENK_COMMAND
    }

    fn program(&self) -> &str {
        &self.command
    }

    fn args(&self, instruction: &str) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            instruction.to_string(),
            "--no-ui".to_string(),
            "--skip".to_string(),
        ];
        args.extend(SKIPPED_PHASES.iter().map(|phase| phase.to_string()));
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_creation() {
        let adapter = KrenkAdapter::new();
        assert_eq!(adapter.name(), "krenk");
        assert_eq!(adapter.program(), "krenk");
    }

    #[test]
    fn test_custom_command() {
        let adapter = KrenkAdapter::with_command("/opt/krenk/bin/krenk");
        assert_eq!(adapter.program(), "/opt/krenk/bin/krenk");
    }

    #[test]
    fn test_args_keep_instruction_whole() {
        let instruction = "Write a script; don't use 'rm -rf' && exit";
        let args = KrenkAdapter::new().args(instruction);

        assert_eq!(args[0], "run");
        assert_eq!(args[1], instruction);
        assert_eq!(args[2], "--no-ui");
        assert_eq!(args[3], "--skip");
        assert_eq!(&args[4..], SKIPPED_PHASES);
    }
}

//! Generic agent adapter.
//!
//! Runs any command-line agent that takes the instruction as its last
//! positional argument, after a fixed list of leading arguments.

use async_trait::async_trait;

use super::AgentAdapter;

/// Generic adapter that works with any CLI-based agent.
pub struct GenericAdapter {
    /// Base command to run.
    command: String,
    /// Arguments placed before the instruction.
    args: Vec<String>,
    /// Display name.
    name: String,
}

impl GenericAdapter {
    /// Creates a new generic adapter with the given command.
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        let name = std::path::Path::new(&command)
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| command.clone());
        Self {
            command,
            args: Vec::new(),
            name,
        }
    }

    /// Creates with custom leading arguments.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl AgentAdapter for GenericAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn program(&self) -> &str {
        &self.command
    }

    fn args(&self, instruction: &str) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(instruction.to_string());
        args
    }
}

//! External Command Abstraction
//!
//! Runs operator-configured shell commands. Used by the authorization flow
//! when URL delivery or code collection is delegated to an outside program.

use async_trait::async_trait;

use crate::error::Result;

/// Captured result of one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the process exited with a zero status
    pub success: bool,
    /// Everything the process wrote to standard output, lossily decoded
    pub stdout: String,
}

impl CommandOutput {
    pub fn new(success: bool, stdout: impl Into<String>) -> Self {
        Self {
            success,
            stdout: stdout.into(),
        }
    }

    /// First line of standard output with trailing whitespace removed.
    ///
    /// Empty output yields an empty string.
    pub fn first_line(&self) -> &str {
        self.stdout.lines().next().unwrap_or("").trim_end()
    }

    /// Whole standard output with trailing whitespace removed.
    pub fn trimmed(&self) -> &str {
        self.stdout.trim_end()
    }
}

/// Shell command runner.
///
/// `command` is a complete command line, interpreted by the platform shell.
/// Every call spawns a fresh process.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<CommandOutput>;
}

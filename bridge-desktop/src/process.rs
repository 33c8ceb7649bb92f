//! Shell command execution via `tokio::process`

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    process::{CommandOutput, CommandRunner},
};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runs command lines through the platform shell (`sh -c` on Unix,
/// `cmd /C` on Windows).
///
/// Child processes are killed if the future driving them is dropped, so a
/// cancelled wait does not leave stray helpers behind.
#[derive(Debug, Clone, Default)]
pub struct ShellCommandRunner;

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self
    }

    fn shell_command(command: &str) -> Command {
        #[cfg(windows)]
        {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        }

        #[cfg(not(windows))]
        {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        let output = Self::shell_command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BridgeError::CommandFailed {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        debug!(
            status = ?output.status.code(),
            bytes = output.stdout.len(),
            "External command finished"
        );

        Ok(CommandOutput::new(
            output.status.success(),
            String::from_utf8_lossy(&output.stdout),
        ))
    }
}

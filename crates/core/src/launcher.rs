use std::process::{Child, Command, Stdio};

use crate::error::LaunchError;

/// Runs the shell command of a command cue.
pub trait ProcessLauncher {
    /// Start `command` without waiting for it.
    fn run(&mut self, command: &str) -> Result<(), LaunchError>;

    /// Collect finished processes. Called from the control loop.
    fn reap(&mut self) {}
}

/// Launches commands through a shell, `sh -c <command>` by default.
#[derive(Debug)]
pub struct ShellLauncher {
    shell: String,
    children: Vec<(String, Child)>,
}

impl Default for ShellLauncher {
    fn default() -> Self {
        Self::new("sh")
    }
}

impl ShellLauncher {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            children: Vec::new(),
        }
    }

    /// Number of launched commands that have not been reaped yet.
    pub fn running(&self) -> usize {
        self.children.len()
    }
}

impl ProcessLauncher for ShellLauncher {
    fn run(&mut self, command: &str) -> Result<(), LaunchError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(LaunchError::EmptyCommand);
        }

        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                command: command.to_string(),
                source,
            })?;

        log::info!("Launched `{}` (pid {})", command, child.id());
        self.children.push((command.to_string(), child));
        Ok(())
    }

    fn reap(&mut self) {
        self.children.retain_mut(|(command, child)| match child.try_wait() {
            Ok(Some(status)) => {
                if status.success() {
                    log::debug!("`{}` finished", command);
                } else {
                    log::warn!("`{}` exited with {}", command, status);
                }
                false
            }
            Ok(None) => true,
            Err(e) => {
                log::warn!("Lost track of `{}`: {}", command, e);
                false
            }
        });
    }
}

impl Drop for ShellLauncher {
    fn drop(&mut self) {
        self.reap();
        if !self.children.is_empty() {
            log::debug!(
                "{} launched commands still running at exit",
                self.children.len()
            );
        }
    }
}

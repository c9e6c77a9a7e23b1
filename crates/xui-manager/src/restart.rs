//! Restarting the panel service after a commit.

use std::env;
use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

/// Name of the management helper installed by the panel.
pub const PANEL_HELPER: &str = "x-ui";

#[derive(Debug, thiserror::Error)]
pub enum RestartError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Something that can restart the panel.
#[async_trait]
pub trait PanelRestarter: Send + Sync {
    /// Restart and return the command that was run.
    async fn restart(&self) -> Result<String, RestartError>;
}

/// `program` and its arguments for a restart.
pub fn restart_command(service: &str, helper_available: bool) -> (String, Vec<String>) {
    if helper_available {
        (PANEL_HELPER.to_string(), vec!["restart".to_string()])
    } else {
        (
            "systemctl".to_string(),
            vec!["restart".to_string(), service.to_string()],
        )
    }
}

/// Whether `program` is an executable file somewhere on `PATH`.
pub fn on_path(program: &str) -> bool {
    env::var_os("PATH").is_some_and(|paths| {
        env::split_paths(&paths).any(|dir| Path::new(&dir).join(program).is_file())
    })
}

/// Restarts through the `x-ui` helper, or systemd when it is missing.
#[derive(Debug, Clone)]
pub struct SystemRestarter {
    service: String,
}

impl SystemRestarter {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

#[async_trait]
impl PanelRestarter for SystemRestarter {
    async fn restart(&self) -> Result<String, RestartError> {
        let (program, args) = restart_command(&self.service, on_path(PANEL_HELPER));
        let command = format!("{program} {}", args.join(" "));
        info!(command = %command, "restarting panel");

        let output = Command::new(&program)
            .args(&args)
            .output()
            .await
            .map_err(|source| RestartError::Spawn {
                command: command.clone(),
                source,
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(command = %command, status = %output.status, "panel restart failed");
            return Err(RestartError::Failed {
                command,
                status: output.status,
                stderr,
            });
        }
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_is_preferred() {
        assert_eq!(
            restart_command("x-ui", true),
            ("x-ui".to_string(), vec!["restart".to_string()])
        );
        assert_eq!(
            restart_command("3x-ui", false),
            (
                "systemctl".to_string(),
                vec!["restart".to_string(), "3x-ui".to_string()]
            )
        );
    }

    #[test]
    fn path_lookup_misses_unknown_programs() {
        assert!(!on_path("definitely-not-a-real-program-name"));
    }
}

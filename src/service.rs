//! Starting the external service.
//!
//! The start command is run once to completion. It is expected to launch the
//! service in the background and exit; nothing about the running service is
//! retained here. From then on it is only reachable through its HTTP endpoint.
//!
//! The command's stdout is sent to our stderr so stdout carries only the
//! ready line.

use std::process::{ExitStatus, Stdio};

use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Exit { command: String, status: ExitStatus },
}

/// Run the start command and wait for it to exit.
///
/// An empty command means the service is managed elsewhere; nothing is run.
pub async fn start(command: &[String]) -> Result<(), ServiceError> {
    let Some((program, args)) = command.split_first() else {
        tracing::info!("No start command configured, assuming service is started externally");
        return Ok(());
    };

    let command_line = command.join(" ");
    tracing::info!(command = %command_line, "Starting service");

    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(std::io::stderr())
        .status()
        .await
        .map_err(|source| ServiceError::Spawn {
            command: command_line.clone(),
            source,
        })?;

    if !status.success() {
        tracing::error!(command = %command_line, %status, "Start command failed");
        return Err(ServiceError::Exit {
            command: command_line,
            status,
        });
    }

    tracing::info!(command = %command_line, "Start command completed");
    Ok(())
}

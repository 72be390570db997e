//! Post-readiness hold and signal handling.
//!
//! After the service is ready the process stays alive so a supervisor (a
//! container runtime, systemd) keeps the service running. The hold ends after
//! a fixed duration if one is configured, and on SIGINT/SIGTERM in any case.

use std::time::Duration;

/// Why the hold ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldEnd {
    Elapsed,
    Interrupted,
    Terminated,
}

/// Hold until `duration` elapses (forever when `None`) or a shutdown signal arrives.
pub async fn hold(duration: Option<Duration>) -> HoldEnd {
    match duration {
        Some(d) => tracing::info!(duration = ?d, "Holding"),
        None => tracing::info!("Holding until SIGINT or SIGTERM"),
    }

    let end = hold_until(duration, shutdown_signal()).await;

    match end {
        HoldEnd::Elapsed => tracing::info!("Hold elapsed, exiting"),
        HoldEnd::Interrupted => tracing::info!("Received Ctrl+C, exiting"),
        HoldEnd::Terminated => tracing::info!("Received SIGTERM, exiting"),
    }
    end
}

async fn hold_until<S>(duration: Option<Duration>, signal: S) -> HoldEnd
where
    S: std::future::Future<Output = HoldEnd>,
{
    let elapsed = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = elapsed => HoldEnd::Elapsed,
        end = signal => end,
    }
}

/// Resolves on the first SIGINT or SIGTERM. If a handler cannot be
/// installed that signal is simply never observed.
async fn shutdown_signal() -> HoldEnd {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => HoldEnd::Interrupted,
        _ = terminate => HoldEnd::Terminated,
    }
}

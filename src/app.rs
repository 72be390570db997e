//! The start → wait → report → hold sequence.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::hold::{hold, HoldEnd};
use crate::poller::{Readiness, ReadinessPoller};
use crate::probe::HttpProbe;
use crate::service;

/// Start the service and block until its endpoint reports ready.
///
/// Waits forever unless `readiness.timeout_seconds` is set.
pub async fn wait_for_service(config: &AppConfig) -> Result<Readiness, AppError> {
    service::start(&config.service.start_command).await?;

    let readiness = &config.readiness;
    let probe = HttpProbe::new(readiness.url.clone(), readiness.request_timeout())?;
    let poller = ReadinessPoller::new(probe, readiness.success_code, readiness.interval());

    tracing::info!(
        url = %readiness.url,
        success_code = readiness.success_code,
        interval = ?readiness.interval(),
        timeout = ?readiness.timeout(),
        "Waiting for service"
    );

    let ready = match readiness.timeout() {
        Some(deadline) => poller.wait_until_ready_within(deadline).await?,
        None => poller.wait_until_ready().await,
    };

    Ok(ready)
}

/// Line printed to stdout once the service is ready
pub fn ready_message(config: &AppConfig) -> String {
    format!("{} is ready at {}", config.service.name, config.readiness.url)
}

/// Full run: start, wait, print status, then hold.
pub async fn run(config: &AppConfig) -> Result<HoldEnd, AppError> {
    let ready = wait_for_service(config).await?;

    println!("{}", ready_message(config));
    tracing::info!(
        service = %config.service.name,
        attempts = ready.attempts,
        elapsed = ?ready.elapsed,
        "Service ready"
    );

    Ok(hold(config.hold.duration()).await)
}

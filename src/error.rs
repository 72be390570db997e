use crate::config::ConfigError;
use crate::poller::PollError;
use crate::service::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service start failed: {0}")]
    Service(#[from] ServiceError),

    #[error("Service did not become ready: {0}")]
    NotReady(#[from] PollError),

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

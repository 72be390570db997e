//! Single readiness attempts.
//!
//! A [`Probe`] performs one check against the target and reports what it saw.
//! The poller only ever talks to the trait, so it can be driven by the real
//! HTTP probe or by a scripted sequence of outcomes.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

/// What one attempt observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The endpoint answered with this status code
    Status(u16),
    /// No HTTP response: refused, timed out, DNS failure, TLS error
    ConnectionFailed(String),
}

impl PollOutcome {
    pub fn is_success(&self, success_code: u16) -> bool {
        matches!(self, PollOutcome::Status(code) if *code == success_code)
    }
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollOutcome::Status(code) => write!(f, "HTTP {}", code),
            PollOutcome::ConnectionFailed(reason) => write!(f, "connection failed: {}", reason),
        }
    }
}

#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self) -> PollOutcome;

    /// Human-readable target, for logs
    fn target(&self) -> &str;
}

/// Issues a GET against a fixed URL and reports the status code
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
}

impl HttpProbe {
    /// Build a probe with a per-request timeout. Redirects are not followed,
    /// so a 3xx is observed as-is rather than chased.
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self) -> PollOutcome {
        match self.client.get(&self.url).send().await {
            Ok(response) => PollOutcome::Status(response.status().as_u16()),
            Err(e) => PollOutcome::ConnectionFailed(e.to_string()),
        }
    }

    fn target(&self) -> &str {
        &self.url
    }
}

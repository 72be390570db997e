//! Readiness polling loop.
//!
//! Probes the target at a fixed interval until it reports the success status.
//! Connection failures and unexpected statuses are handled the same way: log,
//! sleep for the interval, try again. There is no backoff and no jitter.
//!
//! [`ReadinessPoller::wait_until_ready`] never gives up.
//! [`ReadinessPoller::wait_until_ready_within`] is the bounded variant and
//! reports [`PollError::TimedOut`] once the deadline passes.

use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tracing::instrument;

use crate::config::READINESS_WARN_EVERY;
use crate::probe::{PollOutcome, Probe};

/// Returned once the target is ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    /// Attempts made, including the successful one
    pub attempts: u32,
    /// Time from the first attempt to the successful response
    pub elapsed: Duration,
}

impl Readiness {
    /// Interval sleeps performed before the successful attempt
    pub fn sleeps(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("not ready after {attempts} attempts in {elapsed:?} (last: {})", last_outcome(.last))]
    TimedOut {
        attempts: u32,
        elapsed: Duration,
        last: Option<PollOutcome>,
    },
}

fn last_outcome(last: &Option<PollOutcome>) -> String {
    match last {
        Some(outcome) => outcome.to_string(),
        None => "no attempt completed".to_string(),
    }
}

#[derive(Debug, Default)]
struct Progress {
    attempts: u32,
    last: Option<PollOutcome>,
}

pub struct ReadinessPoller<P> {
    probe: P,
    success_code: u16,
    interval: Duration,
}

impl<P: Probe> ReadinessPoller<P> {
    pub fn new(probe: P, success_code: u16, interval: Duration) -> Self {
        Self {
            probe,
            success_code,
            interval,
        }
    }

    /// Block until the target returns the success code. Never returns otherwise.
    pub async fn wait_until_ready(&self) -> Readiness {
        let mut progress = Progress::default();
        self.poll_loop(&mut progress).await
    }

    /// Like [`wait_until_ready`](Self::wait_until_ready) but gives up after
    /// `deadline`, including while a probe or sleep is in flight.
    pub async fn wait_until_ready_within(&self, deadline: Duration) -> Result<Readiness, PollError> {
        let started = Instant::now();
        let mut progress = Progress::default();

        let result = timeout(deadline, self.poll_loop(&mut progress)).await;

        match result {
            Ok(readiness) => Ok(readiness),
            Err(_) => {
                tracing::error!(
                    target_url = %self.probe.target(),
                    attempts = progress.attempts,
                    deadline = ?deadline,
                    "Readiness deadline reached"
                );
                Err(PollError::TimedOut {
                    attempts: progress.attempts,
                    elapsed: started.elapsed(),
                    last: progress.last,
                })
            }
        }
    }

    #[instrument(
        name = "readiness.poll",
        skip(self, progress),
        fields(target_url = %self.probe.target(), success_code = self.success_code)
    )]
    async fn poll_loop(&self, progress: &mut Progress) -> Readiness {
        let started = Instant::now();

        loop {
            progress.attempts += 1;
            let outcome = self.probe.probe().await;

            if outcome.is_success(self.success_code) {
                let readiness = Readiness {
                    attempts: progress.attempts,
                    elapsed: started.elapsed(),
                };
                tracing::info!(
                    attempts = readiness.attempts,
                    elapsed = ?readiness.elapsed,
                    "Target ready"
                );
                return readiness;
            }

            if progress.attempts % READINESS_WARN_EVERY == 0 {
                tracing::warn!(
                    attempt = progress.attempts,
                    outcome = %outcome,
                    waited = ?started.elapsed(),
                    "Still waiting for target"
                );
            } else {
                tracing::debug!(attempt = progress.attempts, outcome = %outcome, "Not ready");
            }

            progress.last = Some(outcome);
            sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    const INTERVAL: Duration = Duration::from_secs(1);

    /// Plays back a fixed script, then repeats `fallback` forever
    struct ScriptedProbe {
        script: Mutex<VecDeque<PollOutcome>>,
        fallback: PollOutcome,
        calls: Arc<AtomicU32>,
    }

    impl ScriptedProbe {
        fn new(script: Vec<PollOutcome>, fallback: PollOutcome) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            let probe = Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: calls.clone(),
            };
            (probe, calls)
        }
    }

    #[async_trait]
    impl Probe for ScriptedProbe {
        async fn probe(&self) -> PollOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone())
        }

        fn target(&self) -> &str {
            "scripted"
        }
    }

    fn refused() -> PollOutcome {
        PollOutcome::ConnectionFailed("connection refused".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_first_attempt_returns_without_sleeping() {
        let (probe, calls) = ScriptedProbe::new(vec![], PollOutcome::Status(200));
        let poller = ReadinessPoller::new(probe, 200, INTERVAL);

        let started = Instant::now();
        let readiness = poller.wait_until_ready().await;

        assert_eq!(readiness.attempts, 1);
        assert_eq!(readiness.sleeps(), 0);
        assert_eq!(readiness.elapsed, Duration::ZERO);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_refusals_then_ready() {
        let (probe, calls) =
            ScriptedProbe::new(vec![refused(), refused(), refused()], PollOutcome::Status(200));
        let poller = ReadinessPoller::new(probe, 200, INTERVAL);

        let started = Instant::now();
        let readiness = poller.wait_until_ready().await;

        assert_eq!(readiness.attempts, 4);
        assert_eq!(readiness.sleeps(), 3);
        // Exactly one interval per failed attempt
        assert_eq!(started.elapsed(), INTERVAL * 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_status_is_retried_like_connection_failure() {
        let script = vec![
            PollOutcome::Status(503),
            refused(),
            PollOutcome::Status(404),
            PollOutcome::Status(302),
        ];
        let (probe, _calls) = ScriptedProbe::new(script, PollOutcome::Status(200));
        let poller = ReadinessPoller::new(probe, 200, Duration::from_millis(250));

        let readiness = poller.wait_until_ready().await;

        assert_eq!(readiness.attempts, 5);
        assert_eq!(readiness.elapsed, Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_on_first_success_only() {
        // A later 200 in the script must never be consumed
        let script = vec![refused(), PollOutcome::Status(200), PollOutcome::Status(200)];
        let (probe, calls) = ScriptedProbe::new(script, PollOutcome::Status(503));
        let poller = ReadinessPoller::new(probe, 200, INTERVAL);

        let readiness = poller.wait_until_ready().await;

        assert_eq!(readiness.attempts, 2);
        // The trailing 200 was never requested
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_success_code() {
        let (probe, _calls) = ScriptedProbe::new(vec![PollOutcome::Status(200)], PollOutcome::Status(204));
        let poller = ReadinessPoller::new(probe, 204, INTERVAL);

        let readiness = poller.wait_until_ready().await;

        assert_eq!(readiness.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_503_never_returns() {
        let (probe, calls) = ScriptedProbe::new(vec![], PollOutcome::Status(503));
        let poller = ReadinessPoller::new(probe, 200, INTERVAL);

        // Bound the observation to 50 intervals
        let bound = INTERVAL * 50 + INTERVAL / 2;
        let result = timeout(bound, poller.wait_until_ready()).await;

        assert!(result.is_err(), "poller returned without a success status");
        // One attempt at t=0 plus one after each of the 50 sleeps: no busy loop
        assert_eq!(calls.load(Ordering::SeqCst), 51);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_refusal_never_returns() {
        let (probe, calls) = ScriptedProbe::new(vec![], refused());
        let poller = ReadinessPoller::new(probe, 200, INTERVAL);

        let result = timeout(INTERVAL * 10 + INTERVAL / 2, poller.wait_until_ready()).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_wait_times_out_with_last_outcome() {
        let (probe, _calls) = ScriptedProbe::new(vec![], PollOutcome::Status(503));
        let poller = ReadinessPoller::new(probe, 200, INTERVAL);

        let err = poller
            .wait_until_ready_within(Duration::from_millis(4500))
            .await
            .unwrap_err();

        match err {
            PollError::TimedOut {
                attempts,
                elapsed,
                last,
            } => {
                assert_eq!(attempts, 5);
                assert_eq!(elapsed, Duration::from_millis(4500));
                assert_eq!(last, Some(PollOutcome::Status(503)));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_wait_succeeds_before_deadline() {
        let (probe, _calls) = ScriptedProbe::new(vec![refused(), refused()], PollOutcome::Status(200));
        let poller = ReadinessPoller::new(probe, 200, INTERVAL);

        let readiness = poller
            .wait_until_ready_within(Duration::from_secs(30))
            .await
            .unwrap();

        assert_eq!(readiness.attempts, 3);
        assert_eq!(readiness.elapsed, INTERVAL * 2);
    }

    #[test]
    fn test_timed_out_message_names_last_outcome() {
        let err = PollError::TimedOut {
            attempts: 3,
            elapsed: Duration::from_secs(2),
            last: Some(PollOutcome::Status(503)),
        };
        assert_eq!(err.to_string(), "not ready after 3 attempts in 2s (last: HTTP 503)");

        let err = PollError::TimedOut {
            attempts: 1,
            elapsed: Duration::from_secs(1),
            last: None,
        };
        assert!(err.to_string().ends_with("(last: no attempt completed)"));
    }
}

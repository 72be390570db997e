//! awaitdb - start a local database service and wait for it to come up
//!
//! Runs the service's start command, polls its HTTP endpoint at a fixed
//! interval until it answers with the expected status, prints a status line,
//! then holds the process open.

pub mod app;
pub mod config;
pub mod error;
pub mod hold;
pub mod poller;
pub mod probe;
pub mod service;

pub use app::{run, wait_for_service};
pub use error::AppError;
pub use poller::{PollError, Readiness, ReadinessPoller};
pub use probe::{HttpProbe, PollOutcome, Probe};

//! Fail-fast guard in front of the completion API.
//!
//! After `failure_threshold` consecutive failed calls, qualification stops
//! calling out and takes the fallback score until the backoff elapses. One
//! trial call is then let through; a success closes the breaker again.

use failsafe::{backoff, failure_policy, CircuitBreaker, Config, StateMachine};
use serde::Serialize;
use std::time::Duration;

pub type CompletionCircuitBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::Exponential>, ()>;

/// Thresholds for [`completion_breaker`], read from `COMPLETION_BREAKER_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            initial_backoff: Duration::from_secs(10),
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// Whether qualification calls currently reach the completion API.
///
/// Half-open reports as `Closed` since the trial call goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BreakerState {
    Closed,
    Open,
}

pub fn completion_breaker(settings: &BreakerSettings) -> CompletionCircuitBreaker {
    let backoff_strategy = backoff::exponential(
        settings.initial_backoff,
        settings.max_backoff.max(settings.initial_backoff),
    );
    let policy =
        failure_policy::consecutive_failures(settings.failure_threshold.max(1), backoff_strategy);

    Config::new().failure_policy(policy).build()
}

pub fn breaker_state(breaker: &CompletionCircuitBreaker) -> BreakerState {
    if breaker.is_call_permitted() {
        BreakerState::Closed
    } else {
        BreakerState::Open
    }
}

//! Breaker guarding the remote knowledge service.
//!
//! ```text
//! Closed   --threshold consecutive failures-->  Open
//! Open     --cool-down elapsed, next allow()--> HalfOpen (one probe admitted)
//! HalfOpen --probe ok-->                        Closed
//! HalfOpen --probe failed-->                    Open, cool-down restarts
//! ```
//!
//! Only calls that were actually issued get reported. A call refused by
//! `allow()` is never reported, otherwise an open breaker could not cool down.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker; at least 1.
    pub failure_threshold: u32,
    /// How long Open lasts before a probe is let through.
    pub recovery_timeout: Duration,
}

impl CircuitBreakerConfig {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(30))
    }
}

/// Shared by every caller of the guarded dependency.
///
/// Implementations are synchronous and must not await or do I/O under their
/// internal lock. Usage:
///
/// ```ignore
/// if breaker.allow() {
///     match client.search_knowledge(request).await {
///         Ok(_) => breaker.on_success(),
///         Err(_) => breaker.on_failure(),
///     }
/// }
/// ```
pub trait CircuitBreaker: Send + Sync {
    /// Timer-aware view that never mutates: an Open breaker past its
    /// cool-down reads as `HalfOpen`.
    fn state(&self) -> CircuitState;

    /// Admission check. The first call after the cool-down becomes the probe;
    /// everything else is refused until the probe reports back.
    fn allow(&self) -> bool;

    fn on_success(&self);

    fn on_failure(&self);

    /// Operator override back to Closed. Lifetime counters are kept.
    fn reset(&self);

    fn metrics(&self) -> CircuitBreakerMetrics;
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub total_successes: u64,
    pub total_failures: u64,
    pub times_opened: u64,
    /// Consecutive failures since the last success or reset.
    pub current_failures: u32,
    /// Remaining cool-down while Open.
    #[serde(skip)]
    pub time_until_half_open: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_never_drops_below_one() {
        assert_eq!(CircuitBreakerConfig::new(0, Duration::ZERO).failure_threshold, 1);
        assert_eq!(
            CircuitBreakerConfig::default(),
            CircuitBreakerConfig::new(5, Duration::from_secs(30))
        );
    }

    #[test]
    fn state_names_match_status_payload() {
        for state in [CircuitState::Closed, CircuitState::Open, CircuitState::HalfOpen] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json.trim_matches('"'), state.to_string());
        }
    }
}

//! Process-local circuit breaker.
//!
//! All state lives in one mutex-guarded cell. Every operation is a short
//! critical section with no I/O, so a std mutex is used rather than an async
//! one.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::ports::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};

/// In-memory three-state circuit breaker.
#[derive(Debug)]
pub struct InMemoryCircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    cell: Mutex<BreakerCell>,
}

#[derive(Debug)]
struct BreakerCell {
    state: CircuitState,
    consecutive_failures: u32,
    last_transition: Instant,
    probe_in_flight: bool,
    total_successes: u64,
    total_failures: u64,
    times_opened: u64,
}

impl BreakerCell {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_transition: Instant::now(),
            probe_in_flight: false,
            total_successes: 0,
            total_failures: 0,
            times_opened: 0,
        }
    }

    fn transition(&mut self, to: CircuitState) {
        self.state = to;
        self.last_transition = Instant::now();
        self.probe_in_flight = false;
    }

    fn cool_down_elapsed(&self, recovery_timeout: Duration) -> bool {
        self.last_transition.elapsed() >= recovery_timeout
    }
}

impl InMemoryCircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            cell: Mutex::new(BreakerCell::new()),
        }
    }

    /// Create a breaker with default configuration.
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(name, CircuitBreakerConfig::default())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // Every transition leaves the cell consistent, so a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, BreakerCell> {
        self.cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open(&self, cell: &mut BreakerCell) {
        cell.transition(CircuitState::Open);
        cell.times_opened += 1;
        tracing::warn!(
            breaker = %self.name,
            failures = cell.consecutive_failures,
            recovery_timeout_secs = self.config.recovery_timeout.as_secs(),
            "Circuit breaker opened"
        );
    }
}

impl CircuitBreaker for InMemoryCircuitBreaker {
    fn state(&self) -> CircuitState {
        let cell = self.lock();
        match cell.state {
            CircuitState::Open if cell.cool_down_elapsed(self.config.recovery_timeout) => {
                CircuitState::HalfOpen
            }
            state => state,
        }
    }

    fn allow(&self) -> bool {
        let mut cell = self.lock();
        match cell.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if !cell.cool_down_elapsed(self.config.recovery_timeout) {
                    return false;
                }
                cell.transition(CircuitState::HalfOpen);
                cell.probe_in_flight = true;
                tracing::info!(breaker = %self.name, "Circuit breaker half-open, probing");
                true
            }
            CircuitState::HalfOpen => {
                if cell.probe_in_flight {
                    false
                } else {
                    cell.probe_in_flight = true;
                    true
                }
            }
        }
    }

    fn on_success(&self) {
        let mut cell = self.lock();
        cell.total_successes += 1;
        cell.consecutive_failures = 0;
        if cell.state != CircuitState::Closed {
            cell.transition(CircuitState::Closed);
            tracing::info!(breaker = %self.name, "Circuit breaker closed");
        }
    }

    fn on_failure(&self) {
        let mut cell = self.lock();
        cell.total_failures += 1;
        cell.consecutive_failures = cell.consecutive_failures.saturating_add(1);
        match cell.state {
            CircuitState::Closed => {
                if cell.consecutive_failures >= self.config.failure_threshold {
                    self.open(&mut cell);
                }
            }
            CircuitState::HalfOpen => self.open(&mut cell),
            // Late report from a call admitted before the circuit opened.
            CircuitState::Open => {}
        }
    }

    fn reset(&self) {
        let mut cell = self.lock();
        cell.consecutive_failures = 0;
        cell.transition(CircuitState::Closed);
        tracing::info!(breaker = %self.name, "Circuit breaker reset");
    }

    fn metrics(&self) -> CircuitBreakerMetrics {
        let cell = self.lock();
        let time_until_half_open = match cell.state {
            CircuitState::Open => Some(
                self.config
                    .recovery_timeout
                    .saturating_sub(cell.last_transition.elapsed()),
            ),
            _ => None,
        };
        let state = match cell.state {
            CircuitState::Open if time_until_half_open == Some(Duration::ZERO) => {
                CircuitState::HalfOpen
            }
            state => state,
        };
        CircuitBreakerMetrics {
            state,
            total_successes: cell.total_successes,
            total_failures: cell.total_failures,
            times_opened: cell.times_opened,
            current_failures: cell.consecutive_failures,
            time_until_half_open,
        }
    }
}

//! Circuit breaker configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::ports::CircuitBreakerConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ResilienceConfig {
    /// Consecutive remote failures before the breaker opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_recovery_timeout")]
    pub recovery_timeout_secs: u64,
}

impl ResilienceConfig {
    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new(
            self.failure_threshold,
            Duration::from_secs(self.recovery_timeout_secs),
        )
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.failure_threshold == 0 {
            return Err(ValidationError::OutOfRange {
                field: "resilience.failure_threshold",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout() -> u64 {
    30
}

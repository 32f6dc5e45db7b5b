//! Message router configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::routing::{
    RouterConfig as RoutingSettings, DEFAULT_MAX_IN_FLIGHT, DEFAULT_MAX_SESSIONS,
    DEFAULT_TURNS_PER_SESSION,
};

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    /// End-to-end budget for answering one message
    #[serde(default = "default_route_timeout")]
    pub route_timeout_secs: u64,

    #[serde(default = "default_history_turns")]
    pub history_turns: usize,

    #[serde(default = "default_history_sessions")]
    pub history_sessions: usize,

    /// Concurrent routes across all adapters
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl RouterConfig {
    pub fn routing_settings(&self) -> RoutingSettings {
        RoutingSettings {
            route_timeout: Duration::from_secs(self.route_timeout_secs),
            history_turns: self.history_turns,
            history_sessions: self.history_sessions,
            max_in_flight: self.max_in_flight,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.route_timeout_secs == 0 || self.route_timeout_secs > 300 {
            return Err(ValidationError::OutOfRange {
                field: "router.route_timeout_secs",
                reason: "must be between 1 and 300",
            });
        }
        if self.max_in_flight == 0 {
            return Err(ValidationError::OutOfRange {
                field: "router.max_in_flight",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            route_timeout_secs: default_route_timeout(),
            history_turns: default_history_turns(),
            history_sessions: default_history_sessions(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

fn default_route_timeout() -> u64 {
    30
}

fn default_history_turns() -> usize {
    DEFAULT_TURNS_PER_SESSION
}

fn default_history_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

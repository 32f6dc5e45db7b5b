//! Websocket hub configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::websocket::{ConnectionSettings, DEFAULT_QUEUE_CAPACITY};

#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Per-connection outbound queue depth; a full queue evicts the connection
    #[serde(default = "default_queue_capacity")]
    pub outbound_queue_capacity: usize,

    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Silence allowed on a socket before it is dropped
    #[serde(default = "default_read_deadline")]
    pub read_deadline_secs: u64,
}

impl HubConfig {
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            queue_capacity: self.outbound_queue_capacity,
            ping_interval: Duration::from_secs(self.ping_interval_secs),
            read_deadline: Duration::from_secs(self.read_deadline_secs),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.outbound_queue_capacity == 0 {
            return Err(ValidationError::OutOfRange {
                field: "hub.outbound_queue_capacity",
                reason: "must be at least 1",
            });
        }
        if self.ping_interval_secs == 0 {
            return Err(ValidationError::OutOfRange {
                field: "hub.ping_interval_secs",
                reason: "must be at least 1",
            });
        }
        // Pings must land inside the deadline or idle clients get dropped.
        if self.read_deadline_secs <= self.ping_interval_secs {
            return Err(ValidationError::OutOfRange {
                field: "hub.read_deadline_secs",
                reason: "must exceed the ping interval",
            });
        }
        Ok(())
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: default_queue_capacity(),
            ping_interval_secs: default_ping_interval(),
            read_deadline_secs: default_read_deadline(),
        }
    }
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_ping_interval() -> u64 {
    30
}

fn default_read_deadline() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_connection_settings() {
        let settings = HubConfig::default().connection_settings();
        assert_eq!(settings.queue_capacity, 256);
        assert_eq!(settings.ping_interval, Duration::from_secs(30));
        assert_eq!(settings.read_deadline, Duration::from_secs(60));
    }

    #[test]
    fn deadline_must_exceed_ping_interval() {
        let config = HubConfig {
            ping_interval_secs: 30,
            read_deadline_secs: 30,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(HubConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_queue_is_rejected() {
        let config = HubConfig {
            outbound_queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

//! Data transfer objects for operator endpoints.

use serde::{Deserialize, Serialize};

use crate::application::routing::RouterStats;
use crate::ports::ServiceStatus;

/// `enable` / `disable` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Enable,
    Disable,
}

impl ToggleAction {
    pub fn enabled(self) -> bool {
        matches!(self, ToggleAction::Enable)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Everything an operator dashboard polls.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub query_service: ServiceStatus,
    pub connections: usize,
    pub router: RouterStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleResponse {
    pub tier: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    pub ok: bool,
    pub action: &'static str,
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_action_deserializes_lowercase() {
        let action: ToggleAction = serde_json::from_str("\"enable\"").unwrap();
        assert!(action.enabled());
        let action: ToggleAction = serde_json::from_str("\"disable\"").unwrap();
        assert!(!action.enabled());
        assert!(serde_json::from_str::<ToggleAction>("\"toggle\"").is_err());
    }
}

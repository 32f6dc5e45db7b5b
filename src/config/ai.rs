//! Generation backend configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::query::GenerationSettings;

/// OpenAI-compatible chat completion backend
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// API key; without one the mock provider is used
    pub api_key: Option<Secret<String>>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Generation timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().is_empty())
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ValidationError::InvalidUrl("ai.base_url"));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(ValidationError::OutOfRange {
                field: "ai.timeout_secs",
                reason: "must be between 1 and 300",
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::OutOfRange {
                field: "ai.temperature",
                reason: "must be within [0, 2]",
            });
        }
        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_config_defaults() {
        let config = AiConfig::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(!config.has_api_key());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_key_counts_as_missing() {
        let config = AiConfig {
            api_key: Some(Secret::new(String::new())),
            ..Default::default()
        };
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_generation_settings() {
        let config = AiConfig {
            max_tokens: 256,
            timeout_secs: 10,
            ..Default::default()
        };
        let settings = config.generation_settings();
        assert_eq!(settings.max_tokens, 256);
        assert_eq!(settings.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_validation_bad_temperature() {
        let config = AiConfig {
            temperature: 3.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

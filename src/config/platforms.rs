//! External chat platform configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::platforms::{TelegramConfig as TelegramSettings, WebhookConfig};

/// Optional platform adapters; the web adapter is always present
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformsConfig {
    pub telegram: Option<TelegramConfig>,
    pub webhook: Option<WebhookPlatformConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Secret<String>,

    /// Long-poll wait per getUpdates call
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPlatformConfig {
    /// Adapter id, also the `/platforms/webhook/{id}` path segment
    #[serde(default = "default_webhook_id")]
    pub id: String,

    pub callback_url: String,

    /// HMAC-SHA256 key for both directions
    pub signing_secret: Secret<String>,
}

impl TelegramConfig {
    pub fn settings(&self) -> TelegramSettings {
        TelegramSettings::new(self.bot_token.clone())
            .with_poll_timeout(Duration::from_secs(self.poll_timeout_secs))
    }
}

impl WebhookPlatformConfig {
    pub fn settings(&self) -> WebhookConfig {
        WebhookConfig::new(
            self.id.clone(),
            self.callback_url.clone(),
            self.signing_secret.clone(),
        )
    }
}

impl PlatformsConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(telegram) = &self.telegram {
            if telegram.bot_token.expose_secret().trim().is_empty() {
                return Err(ValidationError::MissingRequired("platforms.telegram.bot_token"));
            }
            if telegram.poll_timeout_secs == 0 || telegram.poll_timeout_secs > 50 {
                return Err(ValidationError::OutOfRange {
                    field: "platforms.telegram.poll_timeout_secs",
                    reason: "must be between 1 and 50",
                });
            }
        }
        if let Some(webhook) = &self.webhook {
            if webhook.id.trim().is_empty() {
                return Err(ValidationError::MissingRequired("platforms.webhook.id"));
            }
            if !(webhook.callback_url.starts_with("http://")
                || webhook.callback_url.starts_with("https://"))
            {
                return Err(ValidationError::InvalidUrl("platforms.webhook.callback_url"));
            }
            if webhook.signing_secret.expose_secret().is_empty() {
                return Err(ValidationError::MissingRequired(
                    "platforms.webhook.signing_secret",
                ));
            }
        }
        Ok(())
    }
}

fn default_poll_timeout() -> u64 {
    25
}

fn default_webhook_id() -> String {
    "webhook".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook(callback_url: &str, secret: &str) -> WebhookPlatformConfig {
        WebhookPlatformConfig {
            id: "partner".to_string(),
            callback_url: callback_url.to_string(),
            signing_secret: Secret::new(secret.to_string()),
        }
    }

    #[test]
    fn empty_platforms_are_valid() {
        assert!(PlatformsConfig::default().validate().is_ok());
    }

    #[test]
    fn webhook_requires_secret_and_http_callback() {
        let config = PlatformsConfig {
            webhook: Some(webhook("https://partner.example/cb", "")),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PlatformsConfig {
            webhook: Some(webhook("partner.example/cb", "s3cret")),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidUrl("platforms.webhook.callback_url"))
        );

        let config = PlatformsConfig {
            webhook: Some(webhook("https://partner.example/cb", "s3cret")),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn telegram_poll_timeout_bounds() {
        let config = PlatformsConfig {
            telegram: Some(TelegramConfig {
                bot_token: Secret::new("123:abc".to_string()),
                poll_timeout_secs: 90,
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

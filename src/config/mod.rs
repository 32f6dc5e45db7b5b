//! Settings for the fabric, read from the process environment.
//!
//! Every key is `HELPDESK_FABRIC__<SECTION>__<FIELD>`, for example
//! `HELPDESK_FABRIC__KNOWLEDGE__BASE_URL` or
//! `HELPDESK_FABRIC__PLATFORMS__TELEGRAM__BOT_TOKEN`. A `.env` file in the
//! working directory is honoured for local runs. Nothing is mandatory: an
//! empty environment gives a local-only service answering through the mock
//! generation backend.
//!
//! ```no_run
//! use helpdesk_fabric::config::AppConfig;
//!
//! let config = AppConfig::load().expect("unreadable settings");
//! config.validate().expect("invalid settings");
//! ```

mod ai;
mod error;
mod hub;
mod knowledge;
mod platforms;
mod resilience;
mod router;
mod server;

pub use ai::AiConfig;
pub use error::{ConfigError, ValidationError};
pub use hub::HubConfig;
pub use knowledge::KnowledgeConfig;
pub use platforms::{PlatformsConfig, TelegramConfig, WebhookPlatformConfig};
pub use resilience::ResilienceConfig;
pub use router::RouterConfig;
pub use server::{Environment, LogFormat, ServerConfig};

use serde::Deserialize;

const ENV_PREFIX: &str = "HELPDESK_FABRIC";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Websocket queueing and keepalive.
    pub hub: HubConfig,
    pub router: RouterConfig,
    /// Breaker in front of the remote knowledge service.
    pub resilience: ResilienceConfig,
    pub knowledge: KnowledgeConfig,
    pub ai: AiConfig,
    pub platforms: PlatformsConfig,
}

impl AppConfig {
    /// Reads `.env` (if any) and the environment. Only parse failures are
    /// reported here; call [`AppConfig::validate`] for range checks.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let source = config::Environment::default()
            .prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true);

        Ok(config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?)
    }

    /// Stops at the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.hub.validate()?;
        self.router.validate()?;
        self.resilience.validate()?;
        self.knowledge.validate()?;
        self.ai.validate()?;
        self.platforms.validate()?;

        // A route cancelled mid-search would otherwise abandon the remote call.
        if self.knowledge.search_timeout_secs >= self.router.route_timeout_secs {
            return Err(ValidationError::OutOfRange {
                field: "knowledge.search_timeout_secs",
                reason: "must be shorter than router.route_timeout_secs",
            });
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

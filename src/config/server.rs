//! Listener and log output settings.

use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to listen on; must be an IP literal.
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Log line format; when unset, JSON in production and pretty elsewhere.
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ValidationError> {
        let ip: IpAddr = self
            .host
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidSocketAddr(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn effective_log_format(&self) -> LogFormat {
        match (self.log_format, self.environment) {
            (Some(format), _) => format,
            (None, Environment::Production) => LogFormat::Json,
            (None, _) => LogFormat::Pretty,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if self.log_level.trim().is_empty() {
            return Err(ValidationError::MissingRequired("server.log_level"));
        }
        self.socket_addr().map(|_| ())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            environment: Environment::Development,
            log_level: "info,helpdesk_fabric=debug,tower_http=info".to_string(),
            log_format: None,
        }
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment value could not be parsed into its field type.
    #[error("could not read HELPDESK_FABRIC__* settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// First offending setting, named by its dotted path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingRequired(&'static str),

    #[error("server.port must be non-zero")]
    InvalidPort,

    #[error("{field} {reason}")]
    OutOfRange {
        field: &'static str,
        reason: &'static str,
    },

    #[error("{0} must be an http(s) URL")]
    InvalidUrl(&'static str),

    #[error("server.host '{0}' is not an IP address")]
    InvalidSocketAddr(String),
}

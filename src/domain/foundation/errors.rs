use thiserror::Error;

/// Rejected input while constructing a domain value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be blank")]
    Blank(&'static str),

    #[error("metadata key '{0}' given more than once")]
    DuplicateMetadata(String),
}

impl ValidationError {
    pub fn blank(field: &'static str) -> Self {
        Self::Blank(field)
    }
}

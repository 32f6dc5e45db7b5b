//! MessageArchive port - best-effort audit log of inbound messages.
//!
//! Failures are logged by the caller and never affect routing.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::messaging::UnifiedMessage;

#[async_trait]
pub trait MessageArchive: Send + Sync {
    async fn record(&self, message: &UnifiedMessage) -> Result<(), ArchiveError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    #[error("archive unavailable: {0}")]
    Unavailable(String),

    #[error("archive rejected message: {0}")]
    Rejected(String),
}

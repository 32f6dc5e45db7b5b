//! PlatformAdapter port - one implementation per messaging platform.
//!
//! Each adapter owns its own transport. The router treats all adapters
//! uniformly: it starts them, takes their inbound stream once, and calls
//! `send_message` to reply on non-web platforms.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

use crate::domain::messaging::{PlatformType, UnifiedMessage};

/// Inbound normalized messages. Ends when the adapter is stopped.
pub type MessageStream = Pin<Box<dyn Stream<Item = UnifiedMessage> + Send>>;

#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Platform tag used for routing decisions.
    fn platform_type(&self) -> PlatformType;

    /// Acquire transport resources and open a fresh inbound stream.
    async fn start(&self) -> Result<(), AdapterError>;

    /// Release transport resources and end the inbound stream.
    async fn stop(&self) -> Result<(), AdapterError>;

    /// Deliver `content` to `target` (session id, chat id, ...).
    async fn send_message(&self, target: &str, content: &str) -> Result<(), AdapterError>;

    /// Take the inbound stream opened by the last `start()`.
    ///
    /// Can be taken once per start.
    fn receive_messages(&self) -> Result<MessageStream, AdapterError>;
}

/// Platform adapter errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("adapter not started")]
    NotStarted,

    #[error("inbound stream already taken")]
    StreamTaken,

    #[error("adapter failed to start: {0}")]
    StartFailed(String),

    #[error("failed to send message: {0}")]
    SendFailed(String),

    #[error("invalid target '{0}'")]
    InvalidTarget(String),

    #[error("invalid inbound payload: {0}")]
    InvalidPayload(String),

    #[error("platform rejected credentials")]
    Unauthorized,

    #[error("network error: {0}")]
    Network(String),

    #[error("inbound queue is full")]
    Overloaded,
}

//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the core to external systems:
//! - `ai` - Language-generation backends (OpenAI-compatible, mock)
//! - `archive` - Audit log of inbound messages
//! - `http` - Operator REST endpoints
//! - `knowledge` - Remote knowledge service client and local fallback index
//! - `platforms` - Telegram and signed-webhook chat platforms
//! - `resilience` - Circuit breaker
//! - `websocket` - Connection hub, socket handler and web adapter

pub mod ai;
pub mod archive;
pub mod http;
pub mod inbound_channel;
pub mod knowledge;
pub mod platforms;
pub mod resilience;
pub mod websocket;

pub use ai::{MockAIProvider, OpenAIConfig, OpenAIProvider};
pub use archive::InMemoryMessageArchive;
pub use knowledge::{HttpKnowledgeClient, HttpKnowledgeConfig, InMemoryKnowledgeIndex, MockKnowledgeClient};
pub use platforms::{TelegramAdapter, TelegramConfig, WebhookChatAdapter, WebhookConfig};
pub use resilience::InMemoryCircuitBreaker;
pub use websocket::{ConnectionHub, HubHandle, WebAdapter};

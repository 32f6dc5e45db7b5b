//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the core and the outside world. Adapters implement these ports.
//!
//! ## Knowledge Ports
//!
//! - `RemoteKnowledgeClient` - Preferred remote retrieval tier
//! - `KnowledgeIndex` - Local fallback index
//! - `AIProvider` - Language-generation backend
//! - `QueryService` - The answering capability consumed by the router
//!
//! ## Messaging Ports
//!
//! - `PlatformAdapter` - One implementation per messaging platform
//! - `MessageArchive` - Best-effort audit log
//!
//! ## Resilience
//!
//! - `CircuitBreaker` - Remote dependency guard

mod ai_provider;
mod circuit_breaker;
mod knowledge_client;
mod knowledge_index;
mod message_archive;
mod platform_adapter;
mod query_service;

pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, TokenUsage, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE,
};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};
pub use knowledge_client::{KnowledgeError, RemoteKnowledgeClient, SearchRequest, SearchStrategy};
pub use knowledge_index::KnowledgeIndex;
pub use message_archive::{ArchiveError, MessageArchive};
pub use platform_adapter::{AdapterError, MessageStream, PlatformAdapter};
pub use query_service::{QueryError, QueryRequest, QueryService, ServiceStatus};

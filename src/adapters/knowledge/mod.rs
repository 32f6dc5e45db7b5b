//! Knowledge adapters.
//!
//! - `HttpKnowledgeClient` - Remote knowledge service over HTTP
//! - `MockKnowledgeClient` - Configurable mock for testing
//! - `InMemoryKnowledgeIndex` - Local keyword fallback index

mod http_client;
mod in_memory_index;
mod mock_client;

pub use http_client::{HttpKnowledgeClient, HttpKnowledgeConfig};
pub use in_memory_index::{builtin_faq, tokenize, InMemoryKnowledgeIndex};
pub use mock_client::{snippet, MockKnowledgeClient};

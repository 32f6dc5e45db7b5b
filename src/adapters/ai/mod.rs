//! Generation backends implementing the `AIProvider` port.
//!
//! - `OpenAIProvider` - OpenAI-compatible chat completions over HTTP
//! - `MockAIProvider` - scripted replies, used in tests and when no API key is set

mod mock_provider;
mod openai_provider;

pub use mock_provider::MockAIProvider;
pub use openai_provider::{OpenAIConfig, OpenAIProvider};

//! AI Provider Port - the language-generation step of the query pipeline.
//!
//! Generation here is always single-turn and grounded: the pipeline hands
//! over fixed support-agent instructions plus a prompt that already embeds
//! the retrieved documents and the customer's question. Conversation memory
//! lives in the router, not in this port.
//!
//! Any error is absorbed by the pipeline and replaced with the canned
//! degraded reply, so implementations make one attempt and report failures
//! as they are.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::foundation::SessionId;

pub const DEFAULT_MAX_TOKENS: u32 = 512;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

#[async_trait]
pub trait AIProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError>;

    /// Model identifier, for startup logs.
    fn model(&self) -> &str;
}

/// One grounded generation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Standing instructions (system role).
    pub instructions: String,
    /// Documents plus the customer question (user role).
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Only used to correlate logs.
    pub session_id: Option<SessionId>,
}

impl CompletionRequest {
    pub fn new(instructions: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            prompt: prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            session_id: None,
        }
    }

    pub fn with_limits(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn for_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
    /// Generation stopped at `max_tokens`.
    pub truncated: bool,
}

impl CompletionResponse {
    /// Whitespace-only output is treated like a failed generation.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AIError {
    #[error("generation backend rate limited the request")]
    RateLimited { retry_after: Option<Duration> },

    #[error("generation backend unavailable: {0}")]
    Unavailable(String),

    #[error("generation backend rejected credentials")]
    Unauthorized,

    #[error("generation backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed generation response: {0}")]
    Malformed(String),

    #[error("generation client setup failed: {0}")]
    Setup(String),
}

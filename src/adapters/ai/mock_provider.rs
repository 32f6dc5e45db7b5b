//! Scripted generation backend for tests and key-less local runs.
//!
//! ```ignore
//! let provider = MockAIProvider::new()
//!     .with_response("Refunds take 3 days.")
//!     .with_error(AIError::Unavailable("down".into()));
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{AIError, AIProvider, CompletionRequest, CompletionResponse, TokenUsage};

const MOCK_MODEL: &str = "mock-support-1";

/// Replays scripted outcomes in order, then answers by echoing the last
/// line of the prompt (the customer question).
///
/// Clones share the script and the call log.
#[derive(Debug, Clone, Default)]
pub struct MockAIProvider {
    script: Arc<Mutex<VecDeque<Result<String, AIError>>>>,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
    delay: Duration,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockAIProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, content: impl Into<String>) -> Self {
        lock(&self.script).push_back(Ok(content.into()));
        self
    }

    pub fn with_error(self, error: AIError) -> Self {
        lock(&self.script).push_back(Err(error));
        self
    }

    /// Queues `count` outages.
    pub fn failing(self, count: usize) -> Self {
        (0..count).fold(self, |p, _| {
            p.with_error(AIError::Unavailable("mock outage".to_string()))
        })
    }

    /// Simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        lock(&self.calls).clone()
    }

    fn echo(request: &CompletionRequest) -> String {
        let question = request.prompt.lines().last().unwrap_or_default();
        format!("Mock answer. {}", question)
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let outcome = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Ok(Self::echo(&request)));
        let usage = TokenUsage {
            prompt_tokens: request.prompt.split_whitespace().count() as u32,
            completion_tokens: 0,
        };
        lock(&self.calls).push(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let content = outcome?;
        Ok(CompletionResponse {
            usage: TokenUsage {
                completion_tokens: content.split_whitespace().count() as u32,
                ..usage
            },
            content,
            model: MOCK_MODEL.to_string(),
            truncated: false,
        })
    }

    fn model(&self) -> &str {
        MOCK_MODEL
    }
}

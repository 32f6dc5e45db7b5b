//! OpenAI-compatible chat completions backend.
//!
//! Works against OpenAI and any gateway exposing the same
//! `POST {base}/chat/completions` contract. Each grounded request becomes a
//! two-message chat: the instructions as `system`, the prompt as `user`.
//!
//! A single attempt is made per call; the pipeline degrades on failure and
//! owns the timeout budget.

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{AIError, AIProvider, CompletionRequest, CompletionResponse, TokenUsage};

#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    api_key: Secret<String>,
    pub model: String,
    /// Without trailing slash.
    pub base_url: String,
    /// Client-side ceiling; the pipeline applies its own, usually shorter, budget.
    pub timeout: Duration,
}

impl OpenAIConfig {
    pub fn new(api_key: Secret<String>) -> Self {
        Self {
            api_key,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::Setup(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn wire_request<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> AIError {
        if e.is_timeout() {
            AIError::Timeout(self.config.timeout)
        } else {
            AIError::Network(e.without_url().to_string())
        }
    }

    async fn check_status(response: Response) -> Result<Response, AIError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AIError::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => AIError::RateLimited { retry_after },
            s if s.is_server_error() => {
                AIError::Unavailable(format!("{}: {}", s, error_message(&body)))
            }
            s => AIError::Rejected {
                status: s.as_u16(),
                message: error_message(&body),
            },
        })
    }
}

/// `error.message` from an OpenAI-style error body, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[async_trait]
impl AIProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&self.wire_request(&request))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let body: ChatResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| AIError::Malformed(e.without_url().to_string()))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AIError::Malformed("response carried no choices".to_string()))?;
        let usage = body.usage.unwrap_or_default();

        tracing::debug!(
            model = %body.model,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            session_id = ?request.session_id.as_ref().map(|s| s.as_str()),
            "Completion received"
        );

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            model: body.model,
            usage: TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            },
            truncated: choice.finish_reason.as_deref() == Some("length"),
        })
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

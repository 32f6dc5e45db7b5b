//! Signed-webhook adapter for generic external chat platforms.
//!
//! The platform POSTs messages to `/platforms/webhook/:id` with an
//! `X-Signature` header carrying the hex HMAC-SHA256 of the raw body.
//! Replies are POSTed as `{target, content}` to the configured callback URL.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::adapters::inbound_channel::InboundChannel;
use crate::domain::foundation::{MessageId, SessionId, Timestamp, UserId, ValidationError};
use crate::domain::messaging::{MessageType, PlatformType, UnifiedMessage};
use crate::ports::{AdapterError, MessageStream, PlatformAdapter};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature";

/// Configuration for one webhook-connected platform.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub id: String,
    pub callback_url: String,
    signing_secret: Secret<String>,
    pub timeout: Duration,
}

impl WebhookConfig {
    pub fn new(
        id: impl Into<String>,
        callback_url: impl Into<String>,
        signing_secret: Secret<String>,
    ) -> Self {
        Self {
            id: id.into(),
            callback_url: callback_url.into(),
            signing_secret,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Hex HMAC-SHA256 of `body` under `secret`.
pub fn sign_payload(secret: &[u8], body: &[u8]) -> Result<String, AdapterError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| AdapterError::Unauthorized)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Inbound payload posted by the platform.
#[derive(Debug, Deserialize)]
struct InboundPayload {
    session_id: String,
    user_id: String,
    content: String,
    #[serde(default)]
    message_type: MessageType,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct OutboundPayload<'a> {
    target: &'a str,
    content: &'a str,
}

pub struct WebhookChatAdapter {
    config: WebhookConfig,
    client: Client,
    inbound: InboundChannel,
}

impl WebhookChatAdapter {
    pub fn new(config: WebhookConfig) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AdapterError::StartFailed(format!("HTTP client: {}", e)))?;
        Ok(Self {
            config,
            client,
            inbound: InboundChannel::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// Checks `signature` (hex) against the body in constant time.
    pub fn verify_signature(&self, body: &[u8], signature: &str) -> Result<(), AdapterError> {
        let provided = hex::decode(signature.trim()).map_err(|_| AdapterError::Unauthorized)?;

        let mut mac = HmacSha256::new_from_slice(self.config.signing_secret.expose_secret().as_bytes())
            .map_err(|_| AdapterError::Unauthorized)?;
        mac.update(body);
        let expected = mac.finalize().into_bytes();

        if expected.len() == provided.len() && expected.ct_eq(&provided).unwrap_u8() == 1 {
            Ok(())
        } else {
            Err(AdapterError::Unauthorized)
        }
    }

    /// Verifies, parses and enqueues one inbound delivery.
    pub fn handle_inbound(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<MessageId, AdapterError> {
        self.verify_signature(body, signature.ok_or(AdapterError::Unauthorized)?)?;

        let payload: InboundPayload = serde_json::from_slice(body)
            .map_err(|e| AdapterError::InvalidPayload(e.to_string()))?;
        let message = self.to_message(payload)?;
        let id = message.id();
        self.inbound.push(message)?;
        Ok(id)
    }

    fn to_message(&self, payload: InboundPayload) -> Result<UnifiedMessage, AdapterError> {
        let invalid = |e: ValidationError| {
            AdapterError::InvalidPayload(e.to_string())
        };
        if payload.content.trim().is_empty() {
            return Err(AdapterError::InvalidPayload("content is empty".to_string()));
        }

        let timestamp = payload
            .timestamp
            .and_then(Timestamp::from_unix_millis)
            .unwrap_or_else(Timestamp::now);
        let mut builder = UnifiedMessage::builder(
            PlatformType::Webhook,
            SessionId::new(payload.session_id).map_err(invalid)?,
            UserId::new(payload.user_id).map_err(invalid)?,
        )
        .content(payload.content)
        .message_type(payload.message_type)
        .timestamp(timestamp)
        .metadata("webhook_id", self.config.id.clone())
        .map_err(invalid)?;
        for (key, value) in payload.metadata {
            builder = builder.metadata(key, value).map_err(invalid)?;
        }
        Ok(builder.build())
    }
}

#[async_trait]
impl PlatformAdapter for WebhookChatAdapter {
    fn platform_type(&self) -> PlatformType {
        PlatformType::Webhook
    }

    async fn start(&self) -> Result<(), AdapterError> {
        self.inbound.open();
        tracing::info!(webhook_id = %self.config.id, "Webhook adapter started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), AdapterError> {
        self.inbound.close();
        tracing::info!(webhook_id = %self.config.id, "Webhook adapter stopped");
        Ok(())
    }

    async fn send_message(&self, target: &str, content: &str) -> Result<(), AdapterError> {
        if target.trim().is_empty() {
            return Err(AdapterError::InvalidTarget(target.to_string()));
        }
        let body = serde_json::to_vec(&OutboundPayload { target, content })
            .map_err(|e| AdapterError::SendFailed(e.to_string()))?;
        let signature = sign_payload(self.config.signing_secret.expose_secret().as_bytes(), &body)?;

        let response = self
            .client
            .post(&self.config.callback_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .map_err(|e| AdapterError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(AdapterError::Unauthorized)
        } else {
            Err(AdapterError::SendFailed(format!("callback returned {}", status)))
        }
    }

    fn receive_messages(&self) -> Result<MessageStream, AdapterError> {
        self.inbound.take_stream()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// HTTP endpoint
// ════════════════════════════════════════════════════════════════════════════════

/// Webhook adapters reachable over HTTP, keyed by id.
#[derive(Clone, Default)]
pub struct WebhookState {
    adapters: Arc<HashMap<String, Arc<WebhookChatAdapter>>>,
}

impl WebhookState {
    pub fn new(adapters: impl IntoIterator<Item = Arc<WebhookChatAdapter>>) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|a| (a.id().to_string(), a))
            .collect();
        Self {
            adapters: Arc::new(adapters),
        }
    }
}

#[derive(Debug, Serialize)]
struct Accepted {
    message_id: MessageId,
}

#[derive(Debug, Serialize)]
struct Rejected {
    error: String,
}

fn reject(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(Rejected { error: error.into() })).into_response()
}

/// `POST /platforms/webhook/:id`
pub async fn receive_webhook(
    Path(id): Path<String>,
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(adapter) = state.adapters.get(&id) else {
        return reject(StatusCode::NOT_FOUND, format!("unknown webhook '{}'", id));
    };
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    match adapter.handle_inbound(&body, signature) {
        Ok(message_id) => (StatusCode::ACCEPTED, Json(Accepted { message_id })).into_response(),
        Err(AdapterError::Unauthorized) => reject(StatusCode::UNAUTHORIZED, "invalid signature"),
        Err(e @ AdapterError::InvalidPayload(_)) => reject(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            tracing::warn!(webhook_id = %id, error = %e, "Webhook delivery not accepted");
            reject(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

pub fn webhook_router() -> axum::Router<WebhookState> {
    use axum::routing::post;

    axum::Router::new().route("/platforms/webhook/:id", post(receive_webhook))
}

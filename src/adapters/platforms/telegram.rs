//! Telegram Bot API adapter.
//!
//! Inbound messages come from a `getUpdates` long-poll loop that runs in its
//! own task until `stop()` flips the shutdown watch. Replies go out through
//! `sendMessage`. Each chat maps to the session `telegram:{chat_id}` and the
//! chat id doubles as the reply target.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::adapters::inbound_channel::InboundChannel;
use crate::domain::foundation::{SessionId, Timestamp, UserId};
use crate::domain::messaging::{PlatformType, UnifiedMessage};
use crate::ports::{AdapterError, MessageStream, PlatformAdapter};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Pause before polling again after a failed `getUpdates`.
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Configuration for [`TelegramAdapter`].
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    bot_token: Secret<String>,
    pub api_base: String,
    /// Long-poll window passed to `getUpdates`.
    pub poll_timeout: Duration,
}

impl TelegramConfig {
    pub fn new(bot_token: Secret<String>) -> Self {
        Self {
            bot_token,
            api_base: DEFAULT_API_BASE.to_string(),
            poll_timeout: Duration::from_secs(25),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Bot API wire types
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<Sender>,
    pub date: i64,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

/// Converts a text update into a unified message. Other update kinds yield `None`.
pub fn update_to_message(update: &Update) -> Option<UnifiedMessage> {
    let message = update.message.as_ref()?;
    let text = message.text.as_deref()?.trim();
    if text.is_empty() {
        return None;
    }

    let chat_id = message.chat.id.to_string();
    let session_id = SessionId::new(format!("telegram:{}", chat_id)).ok()?;
    let user_id = UserId::new(chat_id.clone()).ok()?;

    let mut builder = UnifiedMessage::builder(PlatformType::Telegram, session_id, user_id)
        .content(text)
        .timestamp(Timestamp::from_unix_secs(message.date).unwrap_or_default())
        .metadata("chat_id", chat_id)
        .ok()?
        .metadata("message_id", message.message_id.to_string())
        .ok()?;
    if let Some(username) = message.from.as_ref().and_then(|f| f.username.as_deref()) {
        builder = builder.metadata("username", username).ok()?;
    }
    Some(builder.build())
}

#[derive(Clone)]
struct BotApi {
    client: Client,
    base: String,
    token: Secret<String>,
}

impl BotApi {
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &impl Serialize,
    ) -> Result<T, AdapterError> {
        let url = format!("{}/bot{}/{}", self.base, self.token.expose_secret(), method);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            // reqwest errors carry the URL, which embeds the token.
            .map_err(|e| AdapterError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| AdapterError::Network(format!("{} ({})", e.without_url(), status)))?;

        match parsed {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse {
                error_code: Some(401),
                ..
            } => Err(AdapterError::Unauthorized),
            ApiResponse { description, .. } => Err(AdapterError::SendFailed(
                description.unwrap_or_else(|| format!("{} failed with {}", method, status)),
            )),
        }
    }

    async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>, AdapterError> {
        let request = GetUpdates {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: ["message"],
        };
        self.call("getUpdates", &request).await
    }
}

#[derive(Default)]
struct Poller {
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

/// Platform adapter for a Telegram bot.
pub struct TelegramAdapter {
    api: BotApi,
    poll_timeout: Duration,
    inbound: Arc<InboundChannel>,
    poller: Mutex<Poller>,
}

impl TelegramAdapter {
    pub fn new(config: TelegramConfig) -> Result<Self, AdapterError> {
        // Long polls hold the request open for `poll_timeout`.
        let client = Client::builder()
            .timeout(config.poll_timeout + Duration::from_secs(10))
            .build()
            .map_err(|e| AdapterError::StartFailed(format!("HTTP client: {}", e)))?;
        Ok(Self {
            api: BotApi {
                client,
                base: config.api_base,
                token: config.bot_token,
            },
            poll_timeout: config.poll_timeout,
            inbound: Arc::new(InboundChannel::new()),
            poller: Mutex::new(Poller::default()),
        })
    }

    fn poller(&self) -> MutexGuard<'_, Poller> {
        self.poller.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn halt_poller(&self) {
        let mut poller = self.poller();
        if let Some(shutdown) = poller.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(task) = poller.task.take() {
            task.abort();
        }
    }
}

async fn poll_updates(
    api: BotApi,
    inbound: Arc<InboundChannel>,
    poll_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut offset = 0;

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }

            result = api.get_updates(offset, poll_timeout) => match result {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let Some(message) = update_to_message(&update) else {
                            continue;
                        };
                        match inbound.push(message) {
                            Ok(()) => {}
                            Err(AdapterError::Overloaded) => {
                                tracing::warn!("Inbound queue full, dropping Telegram update");
                            }
                            Err(_) => return,
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Telegram getUpdates failed");
                    tokio::select! {
                        _ = shutdown.changed() => return,
                        _ = tokio::time::sleep(RETRY_DELAY) => {}
                    }
                }
            }
        }
    }
}

#[async_trait]
impl PlatformAdapter for TelegramAdapter {
    fn platform_type(&self) -> PlatformType {
        PlatformType::Telegram
    }

    async fn start(&self) -> Result<(), AdapterError> {
        let me: BotUser = self.api.call("getMe", &json!({})).await.map_err(|e| match e {
            AdapterError::Unauthorized => AdapterError::Unauthorized,
            other => AdapterError::StartFailed(other.to_string()),
        })?;

        self.halt_poller();
        self.inbound.open();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(poll_updates(
            self.api.clone(),
            Arc::clone(&self.inbound),
            self.poll_timeout,
            shutdown_rx,
        ));
        let mut poller = self.poller();
        poller.shutdown = Some(shutdown_tx);
        poller.task = Some(task);

        tracing::info!(bot = me.username.as_deref().unwrap_or("unknown"), "Telegram adapter started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), AdapterError> {
        self.halt_poller();
        self.inbound.close();
        tracing::info!("Telegram adapter stopped");
        Ok(())
    }

    async fn send_message(&self, target: &str, content: &str) -> Result<(), AdapterError> {
        let chat_id: i64 = target
            .trim()
            .parse()
            .map_err(|_| AdapterError::InvalidTarget(target.to_string()))?;
        let _: serde_json::Value = self
            .api
            .call("sendMessage", &json!({ "chat_id": chat_id, "text": content }))
            .await?;
        Ok(())
    }

    fn receive_messages(&self) -> Result<MessageStream, AdapterError> {
        self.inbound.take_stream()
    }
}

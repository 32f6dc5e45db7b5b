//! External chat platform adapters.
//!
//! - [`telegram`] - Telegram Bot API (long polling)
//! - [`webhook`] - Generic platforms speaking signed JSON webhooks

pub mod telegram;
pub mod webhook;

pub use telegram::{TelegramAdapter, TelegramConfig};
pub use webhook::{
    sign_payload, webhook_router, WebhookChatAdapter, WebhookConfig, WebhookState,
    SIGNATURE_HEADER,
};

//! Messaging domain - normalized messages shared by every platform.

mod message;

pub use message::{Attachment, MessageType, PlatformType, UnifiedMessage, UnifiedMessageBuilder};

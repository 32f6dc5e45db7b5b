//! UnifiedMessage - the single message shape every origin is normalized into.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::foundation::{MessageId, SessionId, Timestamp, UserId, ValidationError};

/// Platform a message originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformType {
    Web,
    Telegram,
    Webhook,
}

impl PlatformType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformType::Web => "web",
            PlatformType::Telegram => "telegram",
            PlatformType::Webhook => "webhook",
        }
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of content a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
    Audio,
    Video,
}

/// File or media reference attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
    pub size_bytes: Option<u64>,
}

impl Attachment {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mime_type: None,
            file_name: None,
            size_bytes: None,
        }
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }
}

/// Immutable, normalized message passed by value between components.
///
/// Built through [`UnifiedMessage::builder`]; there are no setters once
/// constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedMessage {
    id: MessageId,
    platform: PlatformType,
    session_id: SessionId,
    user_id: UserId,
    content: String,
    message_type: MessageType,
    timestamp: Timestamp,
    attachments: Vec<Attachment>,
    metadata: BTreeMap<String, String>,
}

impl UnifiedMessage {
    /// Starts building a message from the required fields.
    pub fn builder(
        platform: PlatformType,
        session_id: SessionId,
        user_id: UserId,
    ) -> UnifiedMessageBuilder {
        UnifiedMessageBuilder {
            platform,
            session_id,
            user_id,
            content: String::new(),
            message_type: MessageType::Text,
            timestamp: None,
            attachments: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Shorthand for a plain text message stamped now.
    pub fn text(
        platform: PlatformType,
        session_id: SessionId,
        user_id: UserId,
        content: impl Into<String>,
    ) -> Self {
        Self::builder(platform, session_id, user_id)
            .content(content)
            .build()
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn platform(&self) -> PlatformType {
        self.platform
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// Builder for [`UnifiedMessage`].
#[derive(Debug)]
pub struct UnifiedMessageBuilder {
    platform: PlatformType,
    session_id: SessionId,
    user_id: UserId,
    content: String,
    message_type: MessageType,
    timestamp: Option<Timestamp>,
    attachments: Vec<Attachment>,
    metadata: BTreeMap<String, String>,
}

impl UnifiedMessageBuilder {
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn message_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Adds a metadata entry. Keys are unique; a repeated key is rejected.
    pub fn metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let key = key.into();
        if self.metadata.contains_key(&key) {
            return Err(ValidationError::DuplicateMetadata(key));
        }
        self.metadata.insert(key, value.into());
        Ok(self)
    }

    pub fn build(self) -> UnifiedMessage {
        UnifiedMessage {
            id: MessageId::new(),
            platform: self.platform,
            session_id: self.session_id,
            user_id: self.user_id,
            content: self.content,
            message_type: self.message_type,
            timestamp: self.timestamp.unwrap_or_else(Timestamp::now),
            attachments: self.attachments,
            metadata: self.metadata,
        }
    }
}

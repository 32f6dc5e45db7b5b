//! In-memory message archive.
//!
//! Keeps the most recent `capacity` inbound messages. Older entries are
//! dropped first. Used by the binary when no external audit store is wired
//! and by tests to assert on what was archived.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::domain::foundation::SessionId;
use crate::domain::messaging::UnifiedMessage;
use crate::ports::{ArchiveError, MessageArchive};

pub const DEFAULT_ARCHIVE_CAPACITY: usize = 10_000;

pub struct InMemoryMessageArchive {
    capacity: usize,
    messages: Mutex<VecDeque<UnifiedMessage>>,
}

impl InMemoryMessageArchive {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            messages: Mutex::new(VecDeque::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<UnifiedMessage>> {
        self.messages.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Archived messages, oldest first.
    pub fn recorded(&self) -> Vec<UnifiedMessage> {
        self.lock().iter().cloned().collect()
    }

    pub fn for_session(&self, session_id: &SessionId) -> Vec<UnifiedMessage> {
        self.lock()
            .iter()
            .filter(|m| m.session_id() == session_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for InMemoryMessageArchive {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_CAPACITY)
    }
}

#[async_trait]
impl MessageArchive for InMemoryMessageArchive {
    async fn record(&self, message: &UnifiedMessage) -> Result<(), ArchiveError> {
        let mut messages = self.lock();
        if messages.len() == self.capacity {
            messages.pop_front();
        }
        messages.push_back(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::domain::messaging::PlatformType;

    fn msg(session: &str, text: &str) -> UnifiedMessage {
        UnifiedMessage::text(
            PlatformType::Web,
            SessionId::new(session).unwrap(),
            UserId::new("u").unwrap(),
            text,
        )
    }

    #[tokio::test]
    async fn records_in_arrival_order() {
        let archive = InMemoryMessageArchive::default();
        archive.record(&msg("a", "one")).await.unwrap();
        archive.record(&msg("b", "two")).await.unwrap();

        let contents: Vec<_> = archive
            .recorded()
            .iter()
            .map(|m| m.content().to_string())
            .collect();
        assert_eq!(contents, ["one", "two"]);
        assert_eq!(archive.for_session(&SessionId::new("b").unwrap()).len(), 1);
    }

    #[tokio::test]
    async fn drops_oldest_beyond_capacity() {
        let archive = InMemoryMessageArchive::new(2);
        for text in ["1", "2", "3"] {
            archive.record(&msg("s", text)).await.unwrap();
        }
        let recorded = archive.recorded();
        assert_eq!(archive.len(), 2);
        assert_eq!(recorded[0].content(), "2");
        assert_eq!(recorded[1].content(), "3");
    }
}

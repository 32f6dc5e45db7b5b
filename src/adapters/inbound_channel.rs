//! Inbound message channel shared by platform adapters.
//!
//! `open()` creates a fresh channel on every adapter start; the router takes
//! the receiving side once as a [`MessageStream`]. `close()` drops the
//! sender so the stream ends.
//!
//! The channel is bounded. A full queue is reported as
//! [`AdapterError::Overloaded`] so platforms can push back.

use std::sync::{Mutex, MutexGuard};

use futures::stream;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::messaging::UnifiedMessage;
use crate::ports::{AdapterError, MessageStream};

pub const DEFAULT_INBOUND_CAPACITY: usize = 1024;

#[derive(Debug)]
pub struct InboundChannel {
    capacity: usize,
    state: Mutex<InboundState>,
}

#[derive(Debug, Default)]
struct InboundState {
    sender: Option<mpsc::Sender<UnifiedMessage>>,
    receiver: Option<mpsc::Receiver<UnifiedMessage>>,
}

impl Default for InboundChannel {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_INBOUND_CAPACITY)
    }
}

impl InboundChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(InboundState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, InboundState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Opens a new channel, ending any stream from a previous start.
    pub fn open(&self) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut state = self.lock();
        state.sender = Some(tx);
        state.receiver = Some(rx);
    }

    pub fn close(&self) {
        let mut state = self.lock();
        state.sender = None;
        state.receiver = None;
    }

    pub fn is_open(&self) -> bool {
        self.lock().sender.is_some()
    }

    /// Takes the receiving side. Once per `open()`.
    pub fn take_stream(&self) -> Result<MessageStream, AdapterError> {
        let mut state = self.lock();
        if state.sender.is_none() {
            return Err(AdapterError::NotStarted);
        }
        let receiver = state.receiver.take().ok_or(AdapterError::StreamTaken)?;
        Ok(Box::pin(stream::unfold(receiver, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        })))
    }

    /// Pushes a normalized message to the consumer.
    pub fn push(&self, message: UnifiedMessage) -> Result<(), AdapterError> {
        let sender = self.lock().sender.clone().ok_or(AdapterError::NotStarted)?;
        sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => AdapterError::Overloaded,
            TrySendError::Closed(_) => {
                AdapterError::SendFailed("inbound consumer is gone".to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{SessionId, UserId};
    use crate::domain::messaging::PlatformType;
    use futures::StreamExt;

    fn msg(text: &str) -> UnifiedMessage {
        UnifiedMessage::text(
            PlatformType::Web,
            SessionId::new("s").unwrap(),
            UserId::new("u").unwrap(),
            text,
        )
    }

    #[test]
    fn push_before_open_fails() {
        let ch = InboundChannel::new();
        assert_eq!(ch.push(msg("x")), Err(AdapterError::NotStarted));
        assert!(matches!(ch.take_stream(), Err(AdapterError::NotStarted)));
    }

    #[tokio::test]
    async fn stream_yields_pushed_messages_until_closed() {
        let ch = InboundChannel::new();
        ch.open();
        let mut stream = ch.take_stream().unwrap();
        ch.push(msg("a")).unwrap();
        ch.push(msg("b")).unwrap();
        ch.close();

        assert_eq!(stream.next().await.unwrap().content(), "a");
        assert_eq!(stream.next().await.unwrap().content(), "b");
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn full_queue_reports_overload() {
        let ch = InboundChannel::with_capacity(2);
        ch.open();
        let _stream = ch.take_stream().unwrap();
        ch.push(msg("a")).unwrap();
        ch.push(msg("b")).unwrap();
        assert_eq!(ch.push(msg("c")), Err(AdapterError::Overloaded));
    }

    #[test]
    fn stream_can_be_taken_once_per_open() {
        let ch = InboundChannel::new();
        ch.open();
        assert!(ch.take_stream().is_ok());
        assert!(matches!(ch.take_stream(), Err(AdapterError::StreamTaken)));
        ch.open();
        assert!(ch.take_stream().is_ok());
    }
}

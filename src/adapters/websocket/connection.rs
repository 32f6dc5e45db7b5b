//! A single live client connection as seen by the hub.

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::foundation::{ConnectionId, SessionId};

use super::messages::ServerMessage;

/// Default outbound queue capacity per connection.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Hub-side half of a connection: identity plus the bounded outbound queue.
///
/// The transport writer holds the receiving half. Dropping a `Connection`
/// closes the queue, which makes the writer send a Close frame and exit.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    session_id: SessionId,
    outbound: mpsc::Sender<ServerMessage>,
}

/// Outcome of a non-blocking enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// Queue at capacity; the consumer is too slow.
    Full,
    /// Writer has gone away.
    Closed,
}

impl Connection {
    /// Creates a connection and the receiver its writer task drains.
    pub fn new(
        session_id: SessionId,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let conn = Self {
            id: ConnectionId::new(),
            session_id,
            outbound: tx,
        };
        (conn, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Queues a message without waiting.
    pub fn try_enqueue(&self, message: ServerMessage) -> Result<(), EnqueueError> {
        self.outbound.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => EnqueueError::Full,
            TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }
}

//! Platform adapter for browser clients connected over WebSocket.
//!
//! Inbound messages are pushed in by the socket handler; outbound text goes
//! through the hub to every connection of the target session.

use async_trait::async_trait;

use crate::adapters::inbound_channel::InboundChannel;
use crate::domain::foundation::SessionId;
use crate::domain::messaging::{PlatformType, UnifiedMessage};
use crate::ports::{AdapterError, MessageStream, PlatformAdapter};

use super::hub::HubHandle;
use super::messages::ServerMessage;

pub struct WebAdapter {
    hub: HubHandle,
    inbound: InboundChannel,
}

impl WebAdapter {
    pub fn new(hub: HubHandle) -> Self {
        Self {
            hub,
            inbound: InboundChannel::new(),
        }
    }

    /// Hands a message received on a socket to the router.
    pub fn accept(&self, message: UnifiedMessage) -> Result<(), AdapterError> {
        self.inbound.push(message)
    }

    pub fn is_running(&self) -> bool {
        self.inbound.is_open()
    }
}

#[async_trait]
impl PlatformAdapter for WebAdapter {
    fn platform_type(&self) -> PlatformType {
        PlatformType::Web
    }

    async fn start(&self) -> Result<(), AdapterError> {
        self.inbound.open();
        tracing::info!("Web adapter started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), AdapterError> {
        self.inbound.close();
        tracing::info!("Web adapter stopped");
        Ok(())
    }

    async fn send_message(&self, target: &str, content: &str) -> Result<(), AdapterError> {
        let session_id =
            SessionId::new(target).map_err(|_| AdapterError::InvalidTarget(target.to_string()))?;
        self.hub
            .send_to_session(&session_id, ServerMessage::text(&session_id, content));
        Ok(())
    }

    fn receive_messages(&self) -> Result<MessageStream, AdapterError> {
        self.inbound.take_stream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::{Connection, ConnectionHub};
    use crate::domain::foundation::UserId;
    use futures::StreamExt;

    #[tokio::test]
    async fn send_message_reaches_session_connections() {
        let (hub, _) = ConnectionHub::spawn();
        let (conn, mut rx) = Connection::new(SessionId::new("s1").unwrap(), 8);
        hub.register(conn);
        let adapter = WebAdapter::new(hub.clone());

        adapter.send_message("s1", "hello").await.unwrap();
        hub.connection_count().await;

        match rx.try_recv().unwrap() {
            ServerMessage::TextMessage(t) => assert_eq!(t.content, "hello"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn blank_target_is_invalid() {
        let (hub, _) = ConnectionHub::spawn();
        let adapter = WebAdapter::new(hub);
        assert!(matches!(
            adapter.send_message(" ", "x").await,
            Err(AdapterError::InvalidTarget(_))
        ));
    }

    #[tokio::test]
    async fn accepted_messages_flow_to_stream() {
        let (hub, _) = ConnectionHub::spawn();
        let adapter = WebAdapter::new(hub);
        let msg = UnifiedMessage::text(
            PlatformType::Web,
            SessionId::new("s").unwrap(),
            UserId::new("u").unwrap(),
            "hi",
        );
        assert!(adapter.accept(msg.clone()).is_err());

        adapter.start().await.unwrap();
        let mut stream = adapter.receive_messages().unwrap();
        adapter.accept(msg).unwrap();
        assert_eq!(stream.next().await.unwrap().content(), "hi");

        adapter.stop().await.unwrap();
        assert!(stream.next().await.is_none());
        assert!(!adapter.is_running());
    }
}

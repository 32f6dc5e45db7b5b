//! WebSocket upgrade handler for support chat connections.
//!
//! Connection lifecycle:
//! 1. Validate the session id supplied by the authenticated caller
//! 2. Upgrade, create a [`Connection`] and register it with the hub
//! 3. Writer drains the outbound queue and pings on an interval
//! 4. Reader enforces the read deadline and dispatches inbound frames
//! 5. Whichever side ends first tears the connection down

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};

use crate::domain::foundation::{ConnectionId, SessionId, UserId};
use crate::domain::messaging::{PlatformType, UnifiedMessage};
use crate::ports::AdapterError;

use super::connection::{Connection, DEFAULT_QUEUE_CAPACITY};
use super::hub::HubHandle;
use super::messages::{parse_client_message, ClientMessage, ServerMessage};
use super::web_adapter::WebAdapter;

/// Per-connection transport settings.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub queue_capacity: usize,
    pub ping_interval: Duration,
    pub read_deadline: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            ping_interval: Duration::from_secs(30),
            read_deadline: Duration::from_secs(60),
        }
    }
}

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub hub: HubHandle,
    pub web_adapter: Arc<WebAdapter>,
    pub settings: ConnectionSettings,
}

impl WebSocketState {
    pub fn new(hub: HubHandle, web_adapter: Arc<WebAdapter>, settings: ConnectionSettings) -> Self {
        Self {
            hub,
            web_adapter,
            settings,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    session_id: String,
    #[serde(default)]
    user_id: Option<String>,
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /ws?session_id=...&user_id=...`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<WebSocketState>,
) -> Response {
    let session_id = match SessionId::new(params.session_id) {
        Ok(id) => id,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    let user_id = params
        .user_id
        .and_then(|u| UserId::new(u).ok())
        .or_else(|| UserId::new(session_id.as_str()).ok());
    let Some(user_id) = user_id else {
        return (StatusCode::BAD_REQUEST, "invalid user id").into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, session_id, user_id, state))
}

async fn handle_socket(
    socket: WebSocket,
    session_id: SessionId,
    user_id: UserId,
    state: WebSocketState,
) {
    let (sink, stream) = socket.split();
    let (conn, outbound) = Connection::new(session_id.clone(), state.settings.queue_capacity);
    let connection_id = conn.id();

    if conn
        .try_enqueue(ServerMessage::connected(&session_id, connection_id))
        .is_err()
    {
        return;
    }
    state.hub.register(conn);
    tracing::info!(connection_id = %connection_id, session_id = %session_id, "WebSocket connected");

    let mut send_task = tokio::spawn(write_loop(
        sink,
        outbound,
        state.settings.ping_interval,
        connection_id,
    ));

    let reader = Reader {
        connection_id,
        session_id: session_id.clone(),
        user_id,
        hub: state.hub.clone(),
        web_adapter: Arc::clone(&state.web_adapter),
        read_deadline: state.settings.read_deadline,
    };
    let mut recv_task = tokio::spawn(reader.run(stream));

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.unregister(connection_id);
    tracing::info!(connection_id = %connection_id, session_id = %session_id, "WebSocket disconnected");
}

/// Drains the outbound queue into the socket and pings on an interval.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerMessage>,
    ping_interval: Duration,
    connection_id: ConnectionId,
) {
    let mut ping = interval_at(Instant::now() + ping_interval, ping_interval);
    loop {
        tokio::select! {
            next = outbound.recv() => match next {
                Some(msg) => {
                    if let Err(e) = send_message(&mut sink, &msg).await {
                        tracing::debug!(connection_id = %connection_id, error = %e, "Send error, closing connection");
                        break;
                    }
                }
                None => {
                    // Queue closed by unregister or eviction.
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            _ = ping.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn send_message(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    sink.send(Message::Text(json)).await
}

struct Reader {
    connection_id: ConnectionId,
    session_id: SessionId,
    user_id: UserId,
    hub: HubHandle,
    web_adapter: Arc<WebAdapter>,
    read_deadline: Duration,
}

impl Reader {
    async fn run(self, mut stream: SplitStream<WebSocket>) {
        loop {
            let frame = match timeout(self.read_deadline, stream.next()).await {
                Err(_) => {
                    tracing::debug!(connection_id = %self.connection_id, "Read deadline exceeded");
                    break;
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    tracing::debug!(connection_id = %self.connection_id, error = %e, "Receive error");
                    break;
                }
                Ok(Some(Ok(frame))) => frame,
            };

            match frame {
                Message::Text(text) => self.handle_text(&text),
                Message::Binary(_) => {
                    tracing::debug!(connection_id = %self.connection_id, "Ignoring binary frame");
                }
                // Any frame resets the deadline; protocol pings are answered by axum.
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Close(_) => {
                    tracing::debug!(connection_id = %self.connection_id, "Client sent close frame");
                    break;
                }
            }
        }
    }

    fn handle_text(&self, text: &str) {
        let message = match parse_client_message(text) {
            Ok(message) => message,
            Err(e) => {
                self.hub.send_to_connection(
                    self.connection_id,
                    ServerMessage::error(e.code(), e.to_string()),
                );
                return;
            }
        };

        match message {
            ClientMessage::TextMessage { content } => {
                let unified = UnifiedMessage::text(
                    PlatformType::Web,
                    self.session_id.clone(),
                    self.user_id.clone(),
                    content,
                );
                if let Err(e) = self.web_adapter.accept(unified) {
                    tracing::warn!(connection_id = %self.connection_id, error = %e, "Web adapter rejected message");
                    let frame = match e {
                        AdapterError::Overloaded => {
                            ServerMessage::error("overloaded", "too many pending messages, retry shortly")
                        }
                        _ => ServerMessage::error("unavailable", "message routing is not running"),
                    };
                    self.hub.send_to_connection(self.connection_id, frame);
                }
            }
            ClientMessage::Signal { kind, data } => {
                self.hub.send_to_session_except(
                    &self.session_id,
                    self.connection_id,
                    ServerMessage::signal(kind, &self.session_id, self.connection_id, data),
                );
            }
            ClientMessage::Ping => {
                self.hub
                    .send_to_connection(self.connection_id, ServerMessage::pong());
            }
            ClientMessage::Unknown { kind } => {
                tracing::debug!(connection_id = %self.connection_id, kind = %kind, "Dropping unknown message type");
            }
        }
    }
}

/// Create axum router for the WebSocket endpoint.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/ws", get(ws_handler))
}

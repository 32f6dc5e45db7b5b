//! WebSocket adapters for real-time support chat.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        ws_handler                                 │
//! │   per connection: writer task (queue → socket, pings)             │
//! │                   reader task (socket → frames, read deadline)    │
//! └──────────────────────────────────────────────────────────────────┘
//!        │ register / unregister / relay          │ text-message
//!        ▼                                        ▼
//! ┌──────────────────────────┐          ┌───────────────────────────┐
//! │      ConnectionHub        │◀─────────│        WebAdapter          │
//! │  session-1: conn-a conn-b │  answers │  inbound stream → router   │
//! │  session-2: conn-c        │          └───────────────────────────┘
//! └──────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - WebSocket message protocol types
//! - [`connection`] - Hub-side connection with bounded outbound queue
//! - [`hub`] - Single-owner connection registry (actor)
//! - [`handler`] - Axum WebSocket upgrade handler
//! - [`web_adapter`] - `PlatformAdapter` for browser clients

pub mod connection;
pub mod handler;
pub mod hub;
pub mod messages;
pub mod web_adapter;

pub use connection::{Connection, EnqueueError, DEFAULT_QUEUE_CAPACITY};
pub use handler::{websocket_router, ws_handler, ConnectionSettings, WebSocketState};
pub use hub::{ConnectionHub, HubHandle};
pub use messages::{
    parse_client_message, AnswerMessage, ClientMessage, FrameError, ServerMessage, SignalKind,
};
pub use web_adapter::WebAdapter;

//! HTTP adapters - REST endpoints.
//!
//! The chat-facing endpoints live with their transports (`websocket`,
//! `platforms::webhook`); this module holds the operator surface.

pub mod operator;

pub use operator::{operator_router, OperatorAppState};

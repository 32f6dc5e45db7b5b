//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps and validation errors that form the
//! vocabulary of the support fabric.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{ConnectionId, MessageId, SessionId, UserId};
pub use timestamp::Timestamp;

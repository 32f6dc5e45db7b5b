//! Operator HTTP adapter - health, status and runtime controls.
//!
//! Provides endpoints for:
//! - Liveness and aggregated status
//! - Enabling/disabling the remote and fallback knowledge tiers
//! - Resetting the circuit breaker and query metrics
//! - Bulk knowledge sync to the remote service
//!
//! Authorization is left to whatever sits in front of these routes.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::OperatorAppState;
pub use routes::operator_router;

//! Message routing between platform adapters and the query pipeline.

mod history;
mod router;

pub use history::{SessionHistory, DEFAULT_MAX_SESSIONS, DEFAULT_TURNS_PER_SESSION};
pub use router::{
    AdapterInfo, MessageRouter, RouteError, RouterConfig, RouterStats, DEFAULT_MAX_IN_FLIGHT,
    DEFAULT_ROUTE_TIMEOUT,
};

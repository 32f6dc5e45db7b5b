//! Application layer - orchestration over the ports.
//!
//! - `query` - the knowledge-query pipeline and its operator controls
//! - `routing` - the message router
//!
//! Everything here depends on port traits only; concrete adapters are
//! chosen by the binary.

pub mod query;
pub mod routing;

pub use query::{
    BaseQueryService, EnhancedQueryService, EnhancedSettings, KnowledgeControls, SyncReport,
};
pub use routing::{MessageRouter, RouteError, RouterConfig, RouterStats};

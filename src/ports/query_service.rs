//! QueryService port - the query-answering capability the router consumes.
//!
//! Callers depend only on this trait. The base service and the resilient
//! decorator both implement it.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::domain::foundation::{SessionId, UserId};
use crate::domain::knowledge::{MetricsSnapshot, QueryAnswer};

use super::CircuitState;

/// A query to answer.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub text: String,
    /// Recent user turns for this session, oldest first, excluding `text`.
    pub history: Vec<String>,
}

impl QueryRequest {
    pub fn new(session_id: SessionId, user_id: UserId, text: impl Into<String>) -> Self {
        Self {
            session_id,
            user_id,
            text: text.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<String>) -> Self {
        self.history = history;
        self
    }
}

/// Read-only snapshot of the pipeline's health.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub breaker_state: Option<CircuitState>,
    pub failure_count: u32,
    pub times_opened: u64,
    pub remote_enabled: bool,
    /// `None` when the remote tier is disabled or absent.
    pub remote_healthy: Option<bool>,
    pub fallback_enabled: bool,
    pub metrics: Option<MetricsSnapshot>,
}

#[async_trait]
pub trait QueryService: Send + Sync {
    /// Answer a query. Dependency failures degrade the answer instead of
    /// erroring.
    async fn process_query(&self, request: QueryRequest) -> Result<QueryAnswer, QueryError>;

    /// Report health without mutating any state.
    async fn status(&self) -> ServiceStatus;
}

/// Query pipeline errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

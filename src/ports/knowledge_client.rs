//! RemoteKnowledgeClient port - Interface for the remote knowledge service.
//!
//! The remote service is the preferred retrieval tier. It is always called
//! through the circuit breaker and under a search timeout, so
//! implementations do not need their own retry logic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::knowledge::{KnowledgeDocument, SourceSnippet};

/// Retrieval hint passed to the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    #[default]
    Hybrid,
    Semantic,
    Keyword,
}

/// A knowledge search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub knowledge_base_id: String,
    pub limit: usize,
    pub score_threshold: f64,
    #[serde(rename = "strategy")]
    pub strategy_hint: SearchStrategy,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, knowledge_base_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            knowledge_base_id: knowledge_base_id.into(),
            limit: 5,
            score_threshold: 0.0,
            strategy_hint: SearchStrategy::default(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy_hint = strategy;
        self
    }
}

/// Port for the remote knowledge service.
#[async_trait]
pub trait RemoteKnowledgeClient: Send + Sync {
    /// Search the knowledge base. An empty result is not an error.
    async fn search_knowledge(
        &self,
        request: SearchRequest,
    ) -> Result<Vec<SourceSnippet>, KnowledgeError>;

    /// Upload (or replace) a document in a knowledge base.
    async fn upload_document(
        &self,
        knowledge_base_id: &str,
        document: &KnowledgeDocument,
    ) -> Result<(), KnowledgeError>;

    /// Check that the service is reachable and healthy.
    async fn health_check(&self) -> Result<(), KnowledgeError>;
}

/// Knowledge source errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KnowledgeError {
    #[error("knowledge service rejected credentials")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("knowledge service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid knowledge request: {0}")]
    InvalidRequest(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to parse knowledge response: {0}")]
    Parse(String),

    #[error("knowledge request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("knowledge index error: {0}")]
    Index(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_request_serializes_strategy_hint() {
        let req = SearchRequest::new("refund", "kb-1")
            .with_limit(3)
            .with_score_threshold(0.25)
            .with_strategy(SearchStrategy::Semantic);
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["query"], "refund");
        assert_eq!(json["knowledge_base_id"], "kb-1");
        assert_eq!(json["limit"], 3);
        assert_eq!(json["score_threshold"], 0.25);
        assert_eq!(json["strategy"], "semantic");
    }

    #[test]
    fn timeout_error_display() {
        assert_eq!(
            KnowledgeError::Timeout { timeout_ms: 5000 }.to_string(),
            "knowledge request timed out after 5000ms"
        );
    }
}

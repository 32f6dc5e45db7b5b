//! KnowledgeIndex port - local fallback document search.

use async_trait::async_trait;

use crate::domain::knowledge::{KnowledgeDocument, SourceSnippet};

use super::KnowledgeError;

/// Port for the local knowledge index used when the remote tier is
/// unavailable, and as the source set for bulk sync.
#[async_trait]
pub trait KnowledgeIndex: Send + Sync {
    /// Top `limit` documents matching `query`, best first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SourceSnippet>, KnowledgeError>;

    /// Every document currently held.
    async fn documents(&self) -> Result<Vec<KnowledgeDocument>, KnowledgeError>;

    /// Insert or replace a document by id.
    async fn upsert(&self, document: KnowledgeDocument) -> Result<(), KnowledgeError>;
}

//! Operator controls for the knowledge pipeline.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::knowledge::QueryMetrics;
use crate::ports::{CircuitBreaker, KnowledgeError, KnowledgeIndex, RemoteKnowledgeClient};

use super::retrieval::TierToggles;

/// Outcome of a bulk knowledge sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub uploaded: usize,
    pub failed: usize,
}

/// Handle for operator actions. Cheap to clone.
#[derive(Clone)]
pub struct KnowledgeControls {
    toggles: Arc<TierToggles>,
    breaker: Arc<dyn CircuitBreaker>,
    metrics: Arc<QueryMetrics>,
    remote: Option<Arc<dyn RemoteKnowledgeClient>>,
    local: Arc<dyn KnowledgeIndex>,
    knowledge_base_id: String,
}

impl KnowledgeControls {
    pub fn new(
        toggles: Arc<TierToggles>,
        breaker: Arc<dyn CircuitBreaker>,
        metrics: Arc<QueryMetrics>,
        remote: Option<Arc<dyn RemoteKnowledgeClient>>,
        local: Arc<dyn KnowledgeIndex>,
        knowledge_base_id: impl Into<String>,
    ) -> Self {
        Self {
            toggles,
            breaker,
            metrics,
            remote,
            local,
            knowledge_base_id: knowledge_base_id.into(),
        }
    }

    pub fn set_remote_enabled(&self, enabled: bool) {
        self.toggles.set_remote(enabled);
        tracing::info!(enabled, "Remote knowledge tier toggled");
    }

    pub fn set_fallback_enabled(&self, enabled: bool) {
        self.toggles.set_fallback(enabled);
        tracing::info!(enabled, "Local fallback tier toggled");
    }

    /// Forces the breaker Closed. Metrics are left alone.
    pub fn reset_breaker(&self) {
        self.breaker.reset();
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
        tracing::info!("Query metrics reset");
    }

    /// Uploads every local document to the remote knowledge base.
    ///
    /// Individual upload failures are counted, not fatal.
    pub async fn sync_knowledge(&self) -> Result<SyncReport, KnowledgeError> {
        let remote = self.remote.as_ref().ok_or_else(|| {
            KnowledgeError::Unavailable("no remote knowledge service configured".to_string())
        })?;
        let documents = self.local.documents().await?;

        let mut report = SyncReport {
            uploaded: 0,
            failed: 0,
        };
        for document in &documents {
            match remote
                .upload_document(&self.knowledge_base_id, document)
                .await
            {
                Ok(()) => report.uploaded += 1,
                Err(e) => {
                    tracing::warn!(document_id = %document.id, error = %e, "Knowledge upload failed");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            uploaded = report.uploaded,
            failed = report.failed,
            knowledge_base_id = %self.knowledge_base_id,
            "Knowledge sync finished"
        );
        Ok(report)
    }
}

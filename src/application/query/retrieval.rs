//! Document retrieval tiers.
//!
//! A [`DocumentSource`] turns a query into a strategy plus a document set.
//! Two implementations exist:
//!
//! - [`LocalDocumentSource`] - local index only
//! - [`ResilientDocumentSource`] - remote knowledge service behind the
//!   circuit breaker, falling back to the local index
//!
//! Retrieval never fails. Dependency errors degrade the strategy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use crate::domain::knowledge::{SourceSnippet, Strategy};
use crate::ports::{
    CircuitBreaker, CircuitState, KnowledgeIndex, RemoteKnowledgeClient, SearchRequest,
};

/// Outcome of one retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub strategy: Strategy,
    pub documents: Vec<SourceSnippet>,
}

impl Retrieval {
    fn new(strategy: Strategy, documents: Vec<SourceSnippet>) -> Self {
        Self {
            strategy,
            documents,
        }
    }

    fn empty() -> Self {
        Self::new(Strategy::None, Vec::new())
    }
}

/// Health of the retrieval tiers.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStatus {
    pub breaker_state: Option<CircuitState>,
    pub failure_count: u32,
    pub times_opened: u64,
    pub remote_enabled: bool,
    pub remote_healthy: Option<bool>,
    pub fallback_enabled: bool,
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn retrieve(&self, query: &str) -> Retrieval;

    /// Read-only health report. Must not touch breaker state.
    async fn status(&self) -> SourceStatus;
}

/// Operator switches for the two tiers, shared with [`super::KnowledgeControls`].
#[derive(Debug)]
pub struct TierToggles {
    remote: AtomicBool,
    fallback: AtomicBool,
}

impl TierToggles {
    pub fn new(remote: bool, fallback: bool) -> Self {
        Self {
            remote: AtomicBool::new(remote),
            fallback: AtomicBool::new(fallback),
        }
    }

    pub fn remote_enabled(&self) -> bool {
        self.remote.load(Ordering::SeqCst)
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback.load(Ordering::SeqCst)
    }

    pub fn set_remote(&self, enabled: bool) {
        self.remote.store(enabled, Ordering::SeqCst);
    }

    pub fn set_fallback(&self, enabled: bool) {
        self.fallback.store(enabled, Ordering::SeqCst);
    }
}

impl Default for TierToggles {
    fn default() -> Self {
        Self::new(true, true)
    }
}

/// Tuning for the remote and local tiers.
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub knowledge_base_id: String,
    pub search_timeout: Duration,
    pub search_limit: usize,
    pub score_threshold: f64,
    /// Fewer remote documents than this triggers a local top-up (hybrid).
    pub min_remote_documents: usize,
    pub health_check_timeout: Duration,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            knowledge_base_id: "default".to_string(),
            search_timeout: Duration::from_secs(5),
            search_limit: 5,
            score_threshold: 0.2,
            min_remote_documents: 1,
            health_check_timeout: Duration::from_secs(2),
        }
    }
}

async fn search_local(index: &dyn KnowledgeIndex, query: &str, limit: usize) -> Option<Vec<SourceSnippet>> {
    match index.search(query, limit).await {
        Ok(documents) => Some(documents),
        Err(e) => {
            tracing::warn!(error = %e, "Local knowledge search failed");
            None
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Local only
// ════════════════════════════════════════════════════════════════════════════════

/// Local index as the only tier.
pub struct LocalDocumentSource {
    index: Arc<dyn KnowledgeIndex>,
    toggles: Arc<TierToggles>,
    limit: usize,
}

impl LocalDocumentSource {
    pub fn new(index: Arc<dyn KnowledgeIndex>, limit: usize) -> Self {
        Self {
            index,
            toggles: Arc::new(TierToggles::new(false, true)),
            limit,
        }
    }
}

#[async_trait]
impl DocumentSource for LocalDocumentSource {
    async fn retrieve(&self, query: &str) -> Retrieval {
        if !self.toggles.fallback_enabled() {
            return Retrieval::empty();
        }
        match search_local(self.index.as_ref(), query, self.limit).await {
            Some(documents) => Retrieval::new(Strategy::Fallback, documents),
            None => Retrieval::empty(),
        }
    }

    async fn status(&self) -> SourceStatus {
        SourceStatus {
            breaker_state: None,
            failure_count: 0,
            times_opened: 0,
            remote_enabled: false,
            remote_healthy: None,
            fallback_enabled: self.toggles.fallback_enabled(),
        }
    }
}

/// One admitted call. Dropping it without an outcome (the caller's future
/// was cancelled mid-search) reports a failure, so the half-open slot is
/// always released.
struct BreakerAttempt<'a> {
    breaker: &'a dyn CircuitBreaker,
    settled: bool,
}

impl<'a> BreakerAttempt<'a> {
    fn admit(breaker: &'a dyn CircuitBreaker) -> Option<Self> {
        breaker.allow().then_some(Self {
            breaker,
            settled: false,
        })
    }

    fn succeeded(mut self) {
        self.settled = true;
        self.breaker.on_success();
    }

    fn failed(mut self) {
        self.settled = true;
        self.breaker.on_failure();
    }
}

impl Drop for BreakerAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!("Remote knowledge search abandoned, recording failure");
            self.breaker.on_failure();
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Remote with fallback
// ════════════════════════════════════════════════════════════════════════════════

/// Remote tier guarded by a circuit breaker, with the local index behind it.
///
/// The breaker only hears about calls that were actually issued. A query
/// rejected by an Open breaker records nothing, so the cool-down keeps
/// running.
pub struct ResilientDocumentSource {
    remote: Option<Arc<dyn RemoteKnowledgeClient>>,
    breaker: Arc<dyn CircuitBreaker>,
    local: Arc<dyn KnowledgeIndex>,
    toggles: Arc<TierToggles>,
    settings: RetrievalSettings,
}

impl ResilientDocumentSource {
    pub fn new(
        remote: Option<Arc<dyn RemoteKnowledgeClient>>,
        breaker: Arc<dyn CircuitBreaker>,
        local: Arc<dyn KnowledgeIndex>,
        toggles: Arc<TierToggles>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            remote,
            breaker,
            local,
            toggles,
            settings,
        }
    }

    fn remote_active(&self) -> Option<&Arc<dyn RemoteKnowledgeClient>> {
        self.remote
            .as_ref()
            .filter(|_| self.toggles.remote_enabled())
    }

    /// `None` when the call was not made or failed.
    async fn search_remote(&self, query: &str) -> Option<Vec<SourceSnippet>> {
        let remote = self.remote_active()?;
        let Some(attempt) = BreakerAttempt::admit(self.breaker.as_ref()) else {
            tracing::debug!("Circuit open, skipping remote knowledge search");
            return None;
        };

        let request = SearchRequest::new(query, self.settings.knowledge_base_id.as_str())
            .with_limit(self.settings.search_limit)
            .with_score_threshold(self.settings.score_threshold);

        match timeout(self.settings.search_timeout, remote.search_knowledge(request)).await {
            Ok(Ok(documents)) => {
                attempt.succeeded();
                Some(documents)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Remote knowledge search failed");
                attempt.failed();
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.settings.search_timeout.as_millis() as u64,
                    "Remote knowledge search timed out"
                );
                attempt.failed();
                None
            }
        }
    }

    async fn top_up(&self, query: &str, mut documents: Vec<SourceSnippet>) -> Retrieval {
        let wanted = self.settings.search_limit.saturating_sub(documents.len());
        if wanted == 0 || !self.toggles.fallback_enabled() {
            return Retrieval::new(Strategy::Remote, documents);
        }
        let local = search_local(self.local.as_ref(), query, self.settings.search_limit)
            .await
            .unwrap_or_default();
        let before = documents.len();
        for doc in local {
            if documents.len() - before == wanted {
                break;
            }
            if !documents.iter().any(|d| d.document_id == doc.document_id) {
                documents.push(doc);
            }
        }
        let strategy = if documents.len() > before {
            Strategy::Hybrid
        } else {
            Strategy::Remote
        };
        Retrieval::new(strategy, documents)
    }
}

#[async_trait]
impl DocumentSource for ResilientDocumentSource {
    async fn retrieve(&self, query: &str) -> Retrieval {
        if let Some(documents) = self.search_remote(query).await {
            if documents.len() >= self.settings.min_remote_documents.max(1) {
                return Retrieval::new(Strategy::Remote, documents);
            }
            if !documents.is_empty() {
                return self.top_up(query, documents).await;
            }
            tracing::debug!("Remote knowledge search returned nothing, using local index");
        }

        if !self.toggles.fallback_enabled() {
            return Retrieval::empty();
        }
        match search_local(self.local.as_ref(), query, self.settings.search_limit).await {
            Some(documents) => Retrieval::new(Strategy::Fallback, documents),
            None => Retrieval::empty(),
        }
    }

    async fn status(&self) -> SourceStatus {
        let metrics = self.breaker.metrics();
        let remote_healthy = match self.remote_active() {
            Some(remote) => Some(matches!(
                timeout(self.settings.health_check_timeout, remote.health_check()).await,
                Ok(Ok(()))
            )),
            None => None,
        };
        SourceStatus {
            breaker_state: Some(self.breaker.state()),
            failure_count: metrics.current_failures,
            times_opened: metrics.times_opened,
            remote_enabled: self.remote_active().is_some(),
            remote_healthy,
            fallback_enabled: self.toggles.fallback_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::knowledge::{snippet, InMemoryKnowledgeIndex, MockKnowledgeClient};
    use crate::adapters::resilience::InMemoryCircuitBreaker;
    use crate::ports::{CircuitBreakerConfig, KnowledgeError};

    struct Fixture {
        source: ResilientDocumentSource,
        remote: MockKnowledgeClient,
        breaker: Arc<InMemoryCircuitBreaker>,
        toggles: Arc<TierToggles>,
    }

    fn fixture(remote: MockKnowledgeClient, settings: RetrievalSettings) -> Fixture {
        let breaker = Arc::new(InMemoryCircuitBreaker::new(
            "knowledge",
            CircuitBreakerConfig::new(2, Duration::from_secs(60)),
        ));
        let toggles = Arc::new(TierToggles::default());
        let source = ResilientDocumentSource::new(
            Some(Arc::new(remote.clone())),
            breaker.clone(),
            Arc::new(InMemoryKnowledgeIndex::with_builtin_faq(0.1)),
            toggles.clone(),
            settings,
        );
        Fixture {
            source,
            remote,
            breaker,
            toggles,
        }
    }

    fn two_docs() -> Vec<SourceSnippet> {
        vec![
            snippet("r1", "Returns", "Return within 30 days", 0.9),
            snippet("r2", "Refunds", "Refunds take 3-5 days", 0.8),
        ]
    }

    #[tokio::test]
    async fn remote_hit_is_remote_strategy() {
        let f = fixture(
            MockKnowledgeClient::new().with_results(two_docs()),
            RetrievalSettings::default(),
        );
        let r = f.source.retrieve("refund").await;
        assert_eq!(r.strategy, Strategy::Remote);
        assert_eq!(r.documents.len(), 2);
        assert_eq!(f.breaker.metrics().total_successes, 1);
        let sent = &f.remote.searches()[0];
        assert_eq!(sent.limit, 5);
        assert_eq!(sent.knowledge_base_id, "default");
    }

    #[tokio::test]
    async fn thin_remote_result_is_topped_up_locally() {
        let settings = RetrievalSettings {
            min_remote_documents: 2,
            ..RetrievalSettings::default()
        };
        let f = fixture(
            MockKnowledgeClient::new().with_results(vec![snippet("r1", "Returns", "x", 0.9)]),
            settings,
        );
        let r = f.source.retrieve("退款政策 refund").await;
        assert_eq!(r.strategy, Strategy::Hybrid);
        assert_eq!(r.documents[0].document_id, "r1");
        assert!(r.documents.iter().any(|d| d.document_id == "faq-refund"));
        assert_eq!(f.breaker.metrics().total_successes, 1);
    }

    #[tokio::test]
    async fn empty_remote_result_counts_as_success_and_falls_back() {
        let f = fixture(MockKnowledgeClient::new(), RetrievalSettings::default());
        let r = f.source.retrieve("介绍一下服务").await;
        assert_eq!(r.strategy, Strategy::Fallback);
        assert!(!r.documents.is_empty());
        assert_eq!(f.breaker.metrics().total_successes, 1);
        assert_eq!(f.breaker.metrics().total_failures, 0);
    }

    #[tokio::test]
    async fn remote_error_records_failure_and_falls_back() {
        let f = fixture(
            MockKnowledgeClient::new().with_error(KnowledgeError::Unavailable("down".into())),
            RetrievalSettings::default(),
        );
        let r = f.source.retrieve("refund").await;
        assert_eq!(r.strategy, Strategy::Fallback);
        assert_eq!(f.breaker.metrics().current_failures, 1);
    }

    #[tokio::test]
    async fn slow_remote_times_out_as_failure() {
        let settings = RetrievalSettings {
            search_timeout: Duration::from_millis(20),
            ..RetrievalSettings::default()
        };
        let f = fixture(
            MockKnowledgeClient::new()
                .with_results(two_docs())
                .with_delay(Duration::from_millis(500)),
            settings,
        );
        let r = f.source.retrieve("refund").await;
        assert_eq!(r.strategy, Strategy::Fallback);
        assert_eq!(f.breaker.metrics().current_failures, 1);
    }

    #[tokio::test]
    async fn skipped_calls_are_not_reported_to_breaker() {
        let f = fixture(
            MockKnowledgeClient::new()
                .with_error(KnowledgeError::Unavailable("down".into()))
                .with_error(KnowledgeError::Unavailable("down".into())),
            RetrievalSettings::default(),
        );
        f.source.retrieve("refund").await;
        f.source.retrieve("refund").await;
        assert_eq!(f.breaker.state(), CircuitState::Open);
        let before = f.breaker.metrics();

        for _ in 0..5 {
            let r = f.source.retrieve("refund").await;
            assert_eq!(r.strategy, Strategy::Fallback);
        }
        let after = f.breaker.metrics();
        assert_eq!(f.remote.search_count(), 2);
        assert_eq!(after.total_failures, before.total_failures);
        assert_eq!(after.current_failures, before.current_failures);
        assert_eq!(after.times_opened, 1);
    }

    #[tokio::test]
    async fn cancelled_half_open_attempt_is_released() {
        let breaker = Arc::new(InMemoryCircuitBreaker::new(
            "knowledge",
            CircuitBreakerConfig::new(1, Duration::from_millis(20)),
        ));
        let remote = MockKnowledgeClient::new()
            .with_results(two_docs())
            .with_delay(Duration::from_millis(200));
        let source = ResilientDocumentSource::new(
            Some(Arc::new(remote.clone())),
            breaker.clone(),
            Arc::new(InMemoryKnowledgeIndex::with_builtin_faq(0.1)),
            Arc::new(TierToggles::default()),
            RetrievalSettings::default(),
        );
        breaker.on_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        tokio::time::sleep(Duration::from_millis(40)).await;

        let cut_short = timeout(Duration::from_millis(50), source.retrieve("refund")).await;
        assert!(cut_short.is_err());
        assert_eq!(remote.search_count(), 1);
        assert_eq!(breaker.metrics().times_opened, 2);

        tokio::time::sleep(Duration::from_millis(40)).await;
        let r = source.retrieve("refund").await;
        assert_eq!(r.strategy, Strategy::Remote);
        assert_eq!(remote.search_count(), 2);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn disabled_remote_never_calls_out() {
        let f = fixture(
            MockKnowledgeClient::new().with_results(two_docs()),
            RetrievalSettings::default(),
        );
        f.toggles.set_remote(false);
        let r = f.source.retrieve("refund").await;
        assert_eq!(r.strategy, Strategy::Fallback);
        assert_eq!(f.remote.search_count(), 0);
        assert_eq!(f.breaker.metrics().total_successes, 0);
    }

    #[tokio::test]
    async fn both_tiers_disabled_is_none() {
        let f = fixture(MockKnowledgeClient::new(), RetrievalSettings::default());
        f.toggles.set_remote(false);
        f.toggles.set_fallback(false);
        assert_eq!(f.source.retrieve("refund").await, Retrieval::empty());
    }

    #[tokio::test]
    async fn status_reports_health_without_touching_breaker() {
        let f = fixture(MockKnowledgeClient::new(), RetrievalSettings::default());
        f.remote.set_healthy(false);

        let status = f.source.status().await;
        assert_eq!(status.breaker_state, Some(CircuitState::Closed));
        assert_eq!(status.remote_healthy, Some(false));
        assert!(status.remote_enabled);
        assert!(status.fallback_enabled);
        assert_eq!(f.breaker.metrics().total_failures, 0);

        f.toggles.set_remote(false);
        assert_eq!(f.source.status().await.remote_healthy, None);
    }

    #[tokio::test]
    async fn local_source_is_fallback_only() {
        let source = LocalDocumentSource::new(Arc::new(InMemoryKnowledgeIndex::with_builtin_faq(0.1)), 3);
        let r = source.retrieve("介绍一下服务").await;
        assert_eq!(r.strategy, Strategy::Fallback);
        assert!(r.documents.len() <= 3);
        let status = source.status().await;
        assert!(!status.remote_enabled);
        assert_eq!(status.breaker_state, None);
    }
}

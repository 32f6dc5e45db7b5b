//! Enhanced query service.
//!
//! Decorates any [`AnswerCapability`] with process-wide metrics. The usual
//! inner pipeline is a [`BaseQueryService`] over the resilient retrieval
//! tiers, assembled by [`EnhancedQueryService::new`]. Callers only see
//! [`QueryService`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::knowledge::{MetricsSnapshot, QueryAnswer, QueryMetrics};
use crate::ports::{
    AIProvider, CircuitBreaker, KnowledgeIndex, QueryError, QueryRequest, QueryService,
    RemoteKnowledgeClient, ServiceStatus,
};

use super::base_service::{AnswerCapability, BaseQueryService, GenerationSettings};
use super::controls::KnowledgeControls;
use super::retrieval::{ResilientDocumentSource, RetrievalSettings, TierToggles};

/// Construction-time settings.
#[derive(Debug, Clone)]
pub struct EnhancedSettings {
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub remote_enabled: bool,
    pub fallback_enabled: bool,
}

impl Default for EnhancedSettings {
    fn default() -> Self {
        Self {
            retrieval: RetrievalSettings::default(),
            generation: GenerationSettings::default(),
            remote_enabled: true,
            fallback_enabled: true,
        }
    }
}

pub struct EnhancedQueryService {
    inner: Arc<dyn AnswerCapability>,
    metrics: Arc<QueryMetrics>,
    controls: KnowledgeControls,
}

impl EnhancedQueryService {
    pub fn new(
        ai: Arc<dyn AIProvider>,
        remote: Option<Arc<dyn RemoteKnowledgeClient>>,
        breaker: Arc<dyn CircuitBreaker>,
        local: Arc<dyn KnowledgeIndex>,
        metrics: Arc<QueryMetrics>,
        settings: EnhancedSettings,
    ) -> Self {
        let toggles = Arc::new(TierToggles::new(
            settings.remote_enabled,
            settings.fallback_enabled,
        ));
        let controls = KnowledgeControls::new(
            Arc::clone(&toggles),
            Arc::clone(&breaker),
            Arc::clone(&metrics),
            remote.clone(),
            Arc::clone(&local),
            settings.retrieval.knowledge_base_id.clone(),
        );
        let source = ResilientDocumentSource::new(remote, breaker, local, toggles, settings.retrieval);
        let base = BaseQueryService::new(ai, Arc::new(source), settings.generation);
        Self::decorate(Arc::new(base), metrics, controls)
    }

    /// Wraps an already assembled pipeline.
    pub fn decorate(
        inner: Arc<dyn AnswerCapability>,
        metrics: Arc<QueryMetrics>,
        controls: KnowledgeControls,
    ) -> Self {
        Self {
            inner,
            metrics,
            controls,
        }
    }

    pub fn controls(&self) -> KnowledgeControls {
        self.controls.clone()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl QueryService for EnhancedQueryService {
    async fn process_query(&self, request: QueryRequest) -> Result<QueryAnswer, QueryError> {
        let answered = self.inner.answer(request).await?;
        self.metrics.record(&answered.answer, answered.degraded);
        Ok(answered.answer)
    }

    async fn status(&self) -> ServiceStatus {
        ServiceStatus {
            metrics: Some(self.metrics.snapshot()),
            ..self.inner.status().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::knowledge::{snippet, InMemoryKnowledgeIndex, MockKnowledgeClient};
    use crate::adapters::resilience::InMemoryCircuitBreaker;
    use crate::domain::foundation::{SessionId, UserId};
    use crate::domain::knowledge::Strategy;
    use crate::application::query::Answered;
    use crate::ports::{AIError, CircuitState, KnowledgeError};

    fn service(ai: MockAIProvider, remote: MockKnowledgeClient) -> (EnhancedQueryService, Arc<InMemoryCircuitBreaker>) {
        let breaker = Arc::new(InMemoryCircuitBreaker::with_defaults("knowledge"));
        let svc = EnhancedQueryService::new(
            Arc::new(ai),
            Some(Arc::new(remote)),
            breaker.clone(),
            Arc::new(InMemoryKnowledgeIndex::with_builtin_faq(0.1)),
            Arc::new(QueryMetrics::new()),
            EnhancedSettings::default(),
        );
        (svc, breaker)
    }

    fn request(text: &str) -> QueryRequest {
        QueryRequest::new(SessionId::new("s").unwrap(), UserId::new("u").unwrap(), text)
    }

    #[tokio::test]
    async fn metrics_follow_strategies() {
        let remote = MockKnowledgeClient::new()
            .with_results(vec![snippet("a", "A", "a", 0.9)])
            .with_error(KnowledgeError::Unavailable("down".into()));
        let ai = MockAIProvider::new()
            .with_response("ok")
            .with_response("ok")
            .with_error(AIError::Unavailable("x".into()));
        let (svc, _) = service(ai, remote);

        assert_eq!(svc.process_query(request("refund")).await.unwrap().strategy, Strategy::Remote);
        assert_eq!(svc.process_query(request("refund")).await.unwrap().strategy, Strategy::Fallback);
        // Remote returns the empty default, then generation fails.
        assert_eq!(svc.process_query(request("refund")).await.unwrap().strategy, Strategy::Fallback);
        assert_eq!(svc.process_query(request("转人工")).await.unwrap().strategy, Strategy::Transfer);

        let m = svc.metrics();
        assert_eq!(m.total_queries, 4);
        assert_eq!(m.successful_queries, 3);
        assert_eq!(m.remote_uses, 1);
        assert_eq!(m.fallback_uses, 2);
        assert_eq!(m.transfers, 1);
    }

    #[tokio::test]
    async fn breaker_reset_keeps_metrics() {
        let (svc, breaker) = service(MockAIProvider::new(), MockKnowledgeClient::new());
        svc.process_query(request("refund")).await.unwrap();
        for _ in 0..5 {
            breaker.on_failure();
        }

        svc.controls().reset_breaker();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(svc.metrics().total_queries, 1);

        svc.controls().reset_metrics();
        assert_eq!(svc.metrics().total_queries, 0);
    }

    #[tokio::test]
    async fn status_includes_metrics_and_tiers() {
        let (svc, _) = service(MockAIProvider::new(), MockKnowledgeClient::new());
        svc.controls().set_fallback_enabled(false);

        let status = svc.status().await;
        assert_eq!(status.breaker_state, Some(CircuitState::Closed));
        assert!(status.remote_enabled);
        assert_eq!(status.remote_healthy, Some(true));
        assert!(!status.fallback_enabled);
        assert_eq!(status.metrics.unwrap().total_queries, 0);
    }

    struct CannedPipeline;

    #[async_trait]
    impl QueryService for CannedPipeline {
        async fn process_query(&self, request: QueryRequest) -> Result<QueryAnswer, QueryError> {
            self.answer(request).await.map(|a| a.answer)
        }

        async fn status(&self) -> ServiceStatus {
            ServiceStatus {
                breaker_state: None,
                failure_count: 0,
                times_opened: 0,
                remote_enabled: false,
                remote_healthy: None,
                fallback_enabled: true,
                metrics: None,
            }
        }
    }

    #[async_trait]
    impl AnswerCapability for CannedPipeline {
        async fn answer(&self, _request: QueryRequest) -> Result<Answered, QueryError> {
            Ok(Answered {
                answer: QueryAnswer {
                    content: "canned".to_string(),
                    source: Strategy::Fallback.source(),
                    strategy: Strategy::Fallback,
                    confidence: 0.6,
                    duration: std::time::Duration::ZERO,
                    sources: Vec::new(),
                },
                degraded: true,
            })
        }
    }

    #[tokio::test]
    async fn decorates_any_answer_capability() {
        let metrics = Arc::new(QueryMetrics::new());
        let local: Arc<dyn KnowledgeIndex> = Arc::new(InMemoryKnowledgeIndex::with_builtin_faq(0.1));
        let controls = KnowledgeControls::new(
            Arc::new(TierToggles::default()),
            Arc::new(InMemoryCircuitBreaker::with_defaults("knowledge")),
            Arc::clone(&metrics),
            None,
            local,
            "default",
        );
        let svc = EnhancedQueryService::decorate(Arc::new(CannedPipeline), metrics, controls);

        assert_eq!(svc.process_query(request("anything")).await.unwrap().content, "canned");
        let m = svc.metrics();
        assert_eq!(m.total_queries, 1);
        assert_eq!(m.successful_queries, 0);
        assert_eq!(m.fallback_uses, 1);

        let status = svc.status().await;
        assert_eq!(status.breaker_state, None);
        assert_eq!(status.metrics.unwrap().total_queries, 1);
    }

    #[tokio::test]
    async fn all_tiers_disabled_answers_with_none() {
        let (svc, _) = service(MockAIProvider::new(), MockKnowledgeClient::new());
        let controls = svc.controls();
        controls.set_remote_enabled(false);
        controls.set_fallback_enabled(false);

        let answer = svc.process_query(request("refund")).await.unwrap();
        assert_eq!(answer.strategy, Strategy::None);
        assert!(!answer.content.is_empty());
    }
}

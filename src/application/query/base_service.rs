//! Base query-answering service.
//!
//! Pipeline per query:
//! 1. Transfer-to-human detection (no knowledge source consulted)
//! 2. Document retrieval through a [`DocumentSource`]
//! 3. Prompt construction and generation
//! 4. Confidence scoring
//!
//! Generation failures produce the canned degraded reply and force the
//! strategy to `fallback`. They are never returned as errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::timeout;

use crate::domain::knowledge::{
    build_prompt, calculate_confidence, detect_transfer, QueryAnswer, Strategy, DEGRADED_RESPONSE,
    SYSTEM_PROMPT, TRANSFER_RESPONSE,
};
use crate::ports::{
    AIProvider, CompletionRequest, QueryError, QueryRequest, QueryService, ServiceStatus,
};

use super::retrieval::{DocumentSource, Retrieval};

/// Generation parameters.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.3,
            timeout: Duration::from_secs(30),
        }
    }
}

/// An answer plus whether generation had to be replaced by the canned reply.
#[derive(Debug, Clone)]
pub struct Answered {
    pub answer: QueryAnswer,
    pub degraded: bool,
}

/// The answering pipeline as decorators see it. Unlike
/// [`QueryService::process_query`] it also reports whether generation was
/// replaced by the canned reply.
#[async_trait]
pub trait AnswerCapability: QueryService {
    async fn answer(&self, request: QueryRequest) -> Result<Answered, QueryError>;
}

pub struct BaseQueryService {
    ai: Arc<dyn AIProvider>,
    documents: Arc<dyn DocumentSource>,
    settings: GenerationSettings,
}

impl BaseQueryService {
    pub fn new(
        ai: Arc<dyn AIProvider>,
        documents: Arc<dyn DocumentSource>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            ai,
            documents,
            settings,
        }
    }
}

#[async_trait]
impl AnswerCapability for BaseQueryService {
    async fn answer(&self, request: QueryRequest) -> Result<Answered, QueryError> {
        let started = Instant::now();
        let text = request.text.trim();
        if text.is_empty() {
            return Err(QueryError::InvalidQuery("query text is empty".to_string()));
        }

        if let Some(reason) = detect_transfer(text, &request.history) {
            tracing::info!(session_id = %request.session_id, reason = ?reason, "Transferring to human agent");
            return Ok(Answered {
                answer: QueryAnswer::transfer(TRANSFER_RESPONSE, started.elapsed()),
                degraded: false,
            });
        }

        let Retrieval {
            mut strategy,
            documents,
        } = self.documents.retrieve(text).await;

        let completion = CompletionRequest::new(SYSTEM_PROMPT, build_prompt(text, &documents))
            .with_limits(self.settings.max_tokens, self.settings.temperature)
            .for_session(request.session_id.clone());

        let generated = match timeout(self.settings.timeout, self.ai.complete(completion)).await {
            Ok(Ok(response)) if !response.is_blank() => Some(response.content),
            Ok(Ok(_)) => {
                tracing::warn!(session_id = %request.session_id, "Generation returned empty content");
                None
            }
            Ok(Err(e)) => {
                tracing::warn!(session_id = %request.session_id, error = %e, "Generation failed");
                None
            }
            Err(_) => {
                tracing::warn!(session_id = %request.session_id, "Generation timed out");
                None
            }
        };
        let degraded = generated.is_none();
        let content = generated.unwrap_or_else(|| DEGRADED_RESPONSE.to_string());
        if degraded {
            strategy = Strategy::Fallback;
        }

        let confidence = calculate_confidence(strategy, documents.len());
        let sources = if strategy.exposes_sources() {
            documents
        } else {
            Vec::new()
        };

        tracing::debug!(
            session_id = %request.session_id,
            strategy = %strategy,
            confidence,
            "Query answered"
        );

        Ok(Answered {
            answer: QueryAnswer {
                content,
                source: strategy.source(),
                strategy,
                confidence,
                duration: started.elapsed(),
                sources,
            },
            degraded,
        })
    }
}

#[async_trait]
impl QueryService for BaseQueryService {
    async fn process_query(&self, request: QueryRequest) -> Result<QueryAnswer, QueryError> {
        self.answer(request).await.map(|a| a.answer)
    }

    async fn status(&self) -> ServiceStatus {
        let source = self.documents.status().await;
        ServiceStatus {
            breaker_state: source.breaker_state,
            failure_count: source.failure_count,
            times_opened: source.times_opened,
            remote_enabled: source.remote_enabled,
            remote_healthy: source.remote_healthy,
            fallback_enabled: source.fallback_enabled,
            metrics: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::knowledge::{snippet, InMemoryKnowledgeIndex};
    use crate::application::query::{LocalDocumentSource, SourceStatus};
    use crate::domain::foundation::{SessionId, UserId};
    use crate::domain::knowledge::{AnswerSource, SourceSnippet};
    use crate::ports::AIError;

    struct FixedSource(Retrieval);

    #[async_trait]
    impl DocumentSource for FixedSource {
        async fn retrieve(&self, _query: &str) -> Retrieval {
            self.0.clone()
        }

        async fn status(&self) -> SourceStatus {
            unimplemented!("not used")
        }
    }

    fn request(text: &str) -> QueryRequest {
        QueryRequest::new(SessionId::new("s1").unwrap(), UserId::new("u1").unwrap(), text)
    }

    fn remote_docs() -> Vec<SourceSnippet> {
        vec![snippet("a", "A", "alpha", 0.9), snippet("b", "B", "beta", 0.8)]
    }

    fn service(ai: MockAIProvider, retrieval: Retrieval) -> BaseQueryService {
        BaseQueryService::new(
            Arc::new(ai),
            Arc::new(FixedSource(retrieval)),
            GenerationSettings::default(),
        )
    }

    #[tokio::test]
    async fn transfer_skips_retrieval_and_generation() {
        let ai = MockAIProvider::new();
        let svc = service(ai.clone(), Retrieval { strategy: Strategy::Remote, documents: remote_docs() });

        let answer = svc.process_query(request("请帮我转人工客服")).await.unwrap();
        assert_eq!(answer.strategy, Strategy::Transfer);
        assert_eq!(answer.source, AnswerSource::TransferToHuman);
        assert_eq!(answer.confidence, 1.0);
        assert_eq!(answer.content, TRANSFER_RESPONSE);
        assert_eq!(ai.call_count(), 0);
    }

    #[tokio::test]
    async fn remote_documents_are_embedded_and_exposed() {
        let ai = MockAIProvider::new().with_response("Here you go");
        let svc = service(ai.clone(), Retrieval { strategy: Strategy::Remote, documents: remote_docs() });

        let answer = svc.process_query(request("what is alpha")).await.unwrap();
        assert_eq!(answer.content, "Here you go");
        assert_eq!(answer.strategy, Strategy::Remote);
        assert_eq!(answer.sources.len(), 2);
        assert!((answer.confidence - 0.9).abs() < 1e-9);

        let call = &ai.get_calls()[0];
        assert_eq!(call.instructions, SYSTEM_PROMPT);
        assert!(call.prompt.contains("[1] A"));
        assert!(call.prompt.ends_with("Customer question: what is alpha"));
        assert_eq!(call.session_id.as_ref().map(|s| s.as_str()), Some("s1"));
    }

    #[tokio::test]
    async fn generation_failure_degrades_to_fallback() {
        let ai = MockAIProvider::new().with_error(AIError::Unavailable("overloaded".into()));
        let svc = service(ai, Retrieval { strategy: Strategy::Remote, documents: remote_docs() });

        let answered = svc.answer(request("what is alpha")).await.unwrap();
        assert!(answered.degraded);
        assert_eq!(answered.answer.content, DEGRADED_RESPONSE);
        assert_eq!(answered.answer.strategy, Strategy::Fallback);
        assert_eq!(answered.answer.source, AnswerSource::LocalFallback);
        assert!(answered.answer.sources.is_empty());
    }

    #[tokio::test]
    async fn slow_generation_times_out_into_degraded_reply() {
        let ai = MockAIProvider::new().with_delay(Duration::from_millis(300));
        let svc = BaseQueryService::new(
            Arc::new(ai),
            Arc::new(FixedSource(Retrieval { strategy: Strategy::None, documents: vec![] })),
            GenerationSettings {
                timeout: Duration::from_millis(20),
                ..GenerationSettings::default()
            },
        );
        let answered = svc.answer(request("hello")).await.unwrap();
        assert!(answered.degraded);
        assert_eq!(answered.answer.strategy, Strategy::Fallback);
    }

    #[tokio::test]
    async fn no_documents_still_answers() {
        let svc = service(MockAIProvider::new(), Retrieval { strategy: Strategy::None, documents: vec![] });
        let answer = svc.process_query(request("anything")).await.unwrap();
        assert_eq!(answer.strategy, Strategy::None);
        assert!((answer.confidence - 0.3).abs() < 1e-9);
        assert!(!answer.content.is_empty());
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let svc = service(MockAIProvider::new(), Retrieval { strategy: Strategy::None, documents: vec![] });
        assert!(matches!(
            svc.process_query(request("   ")).await,
            Err(QueryError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn local_only_service_reports_fallback_status() {
        let svc = BaseQueryService::new(
            Arc::new(MockAIProvider::new()),
            Arc::new(LocalDocumentSource::new(
                Arc::new(InMemoryKnowledgeIndex::with_builtin_faq(0.1)),
                5,
            )),
            GenerationSettings::default(),
        );
        let answer = svc.process_query(request("介绍一下服务")).await.unwrap();
        assert_eq!(answer.strategy, Strategy::Fallback);
        assert!(answer.sources.is_empty());

        let status = svc.status().await;
        assert!(status.fallback_enabled);
        assert!(!status.remote_enabled);
        assert!(status.metrics.is_none());
    }
}

//! Mock remote knowledge client for testing.
//!
//! Mirrors `MockAIProvider`: queued outcomes consumed in order, a default
//! when the queue is empty, and call tracking.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::knowledge::{KnowledgeDocument, SourceSnippet};
use crate::ports::{KnowledgeError, RemoteKnowledgeClient, SearchRequest};

#[derive(Debug, Clone)]
enum Outcome {
    Results(Vec<SourceSnippet>),
    Error(KnowledgeError),
}

#[derive(Debug, Clone, Default)]
pub struct MockKnowledgeClient {
    queue: Arc<Mutex<VecDeque<Outcome>>>,
    default_results: Arc<Mutex<Vec<SourceSnippet>>>,
    searches: Arc<Mutex<Vec<SearchRequest>>>,
    uploads: Arc<Mutex<Vec<(String, KnowledgeDocument)>>>,
    failing_uploads: Arc<Mutex<Vec<String>>>,
    healthy: Arc<Mutex<bool>>,
    delay: Duration,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Builds a snippet for test fixtures.
pub fn snippet(id: &str, title: &str, content: &str, score: f64) -> SourceSnippet {
    SourceSnippet {
        document_id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        score,
    }
}

impl MockKnowledgeClient {
    pub fn new() -> Self {
        let client = Self::default();
        *lock(&client.healthy) = true;
        client
    }

    /// Queues one search result.
    pub fn with_results(self, results: Vec<SourceSnippet>) -> Self {
        lock(&self.queue).push_back(Outcome::Results(results));
        self
    }

    /// Queues one search error.
    pub fn with_error(self, error: KnowledgeError) -> Self {
        lock(&self.queue).push_back(Outcome::Error(error));
        self
    }

    /// Results returned once the queue is drained.
    pub fn with_default_results(self, results: Vec<SourceSnippet>) -> Self {
        *lock(&self.default_results) = results;
        self
    }

    /// Makes uploads of the given document id fail.
    pub fn with_failing_upload(self, document_id: impl Into<String>) -> Self {
        lock(&self.failing_uploads).push(document_id.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        *lock(&self.healthy) = healthy;
    }

    pub fn search_count(&self) -> usize {
        lock(&self.searches).len()
    }

    pub fn searches(&self) -> Vec<SearchRequest> {
        lock(&self.searches).clone()
    }

    pub fn uploads(&self) -> Vec<(String, KnowledgeDocument)> {
        lock(&self.uploads).clone()
    }
}

#[async_trait]
impl RemoteKnowledgeClient for MockKnowledgeClient {
    async fn search_knowledge(
        &self,
        request: SearchRequest,
    ) -> Result<Vec<SourceSnippet>, KnowledgeError> {
        lock(&self.searches).push(request);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        let next = lock(&self.queue).pop_front();
        match next {
            Some(Outcome::Results(results)) => Ok(results),
            Some(Outcome::Error(err)) => Err(err),
            None => Ok(lock(&self.default_results).clone()),
        }
    }

    async fn upload_document(
        &self,
        knowledge_base_id: &str,
        document: &KnowledgeDocument,
    ) -> Result<(), KnowledgeError> {
        if lock(&self.failing_uploads).contains(&document.id) {
            return Err(KnowledgeError::Unavailable("mock upload failure".to_string()));
        }
        lock(&self.uploads).push((knowledge_base_id.to_string(), document.clone()));
        Ok(())
    }

    async fn health_check(&self) -> Result<(), KnowledgeError> {
        if *lock(&self.healthy) {
            Ok(())
        } else {
            Err(KnowledgeError::Unavailable("mock unhealthy".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_outcomes_then_default() {
        let client = MockKnowledgeClient::new()
            .with_error(KnowledgeError::Unavailable("x".into()))
            .with_results(vec![snippet("a", "A", "a", 0.9)])
            .with_default_results(vec![]);

        let req = SearchRequest::new("q", "kb");
        assert!(client.search_knowledge(req.clone()).await.is_err());
        assert_eq!(client.search_knowledge(req.clone()).await.unwrap().len(), 1);
        assert!(client.search_knowledge(req).await.unwrap().is_empty());
        assert_eq!(client.search_count(), 3);
    }

    #[tokio::test]
    async fn health_toggles() {
        let client = MockKnowledgeClient::new();
        assert!(client.health_check().await.is_ok());
        client.set_healthy(false);
        assert!(client.health_check().await.is_err());
    }

    #[tokio::test]
    async fn failing_upload_is_not_recorded() {
        let client = MockKnowledgeClient::new().with_failing_upload("bad");
        let good = KnowledgeDocument::new("good", "t", "c").unwrap();
        let bad = KnowledgeDocument::new("bad", "t", "c").unwrap();
        assert!(client.upload_document("kb", &good).await.is_ok());
        assert!(client.upload_document("kb", &bad).await.is_err());
        assert_eq!(client.uploads().len(), 1);
    }
}

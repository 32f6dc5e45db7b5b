//! HTTP client for the remote knowledge service.
//!
//! Endpoints:
//! - `POST {base}/api/v1/knowledge/search`
//! - `POST {base}/api/v1/knowledge/{kb}/documents`
//! - `GET  {base}/health`

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::knowledge::{KnowledgeDocument, SourceSnippet};
use crate::ports::{KnowledgeError, RemoteKnowledgeClient, SearchRequest};

/// Configuration for [`HttpKnowledgeClient`].
#[derive(Debug, Clone)]
pub struct HttpKnowledgeConfig {
    pub base_url: String,
    api_key: Option<Secret<String>>,
    /// Transport-level ceiling; the pipeline applies its own shorter budget.
    pub timeout: Duration,
}

impl HttpKnowledgeConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_key(mut self, key: Secret<String>) -> Self {
        self.api_key = Some(key);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Remote knowledge client over `reqwest`.
pub struct HttpKnowledgeClient {
    config: HttpKnowledgeConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SourceSnippet>,
}

impl HttpKnowledgeClient {
    pub fn new(config: HttpKnowledgeConfig) -> Result<Self, KnowledgeError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| KnowledgeError::InvalidRequest(format!("HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, KnowledgeError> {
        let response = self.authorize(builder).send().await.map_err(|e| {
            if e.is_timeout() {
                KnowledgeError::Timeout {
                    timeout_ms: self.config.timeout.as_millis() as u64,
                }
            } else {
                KnowledgeError::Network(e.to_string())
            }
        })?;
        Self::check_status(response).await
    }

    async fn check_status(response: Response) -> Result<Response, KnowledgeError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 | 403 => KnowledgeError::Unauthorized,
            404 => KnowledgeError::NotFound(body),
            400 | 422 => KnowledgeError::InvalidRequest(body),
            500..=599 => KnowledgeError::Unavailable(format!("{}: {}", status, body)),
            _ => KnowledgeError::Network(format!("unexpected status {}: {}", status, body)),
        })
    }
}

#[async_trait]
impl RemoteKnowledgeClient for HttpKnowledgeClient {
    async fn search_knowledge(
        &self,
        request: SearchRequest,
    ) -> Result<Vec<SourceSnippet>, KnowledgeError> {
        let response = self
            .send(
                self.client
                    .post(self.url("/api/v1/knowledge/search"))
                    .json(&request),
            )
            .await?;
        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| KnowledgeError::Parse(e.to_string()))?;
        Ok(body.results)
    }

    async fn upload_document(
        &self,
        knowledge_base_id: &str,
        document: &KnowledgeDocument,
    ) -> Result<(), KnowledgeError> {
        if knowledge_base_id.trim().is_empty() {
            return Err(KnowledgeError::InvalidRequest(
                "knowledge base id is empty".to_string(),
            ));
        }
        let path = format!("/api/v1/knowledge/{}/documents", knowledge_base_id);
        self.send(self.client.post(self.url(&path)).json(document))
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), KnowledgeError> {
        self.send(self.client.get(self.url("/health"))).await?;
        Ok(())
    }
}

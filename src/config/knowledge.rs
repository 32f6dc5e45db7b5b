//! Knowledge retrieval configuration (remote service and local fallback)

use secrecy::Secret;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::query::RetrievalSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeConfig {
    /// Whether the remote tier starts enabled
    #[serde(default = "default_true")]
    pub remote_enabled: bool,

    /// Remote knowledge service base URL; unset means local-only
    pub base_url: Option<String>,

    pub api_key: Option<Secret<String>>,

    #[serde(default = "default_knowledge_base_id")]
    pub knowledge_base_id: String,

    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,

    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,

    #[serde(default = "default_true")]
    pub fallback_enabled: bool,

    /// YAML seed for the local index; the built-in FAQ is used when unset
    pub local_documents_path: Option<PathBuf>,

    /// Remote results below this count are topped up locally
    #[serde(default = "default_min_remote_documents")]
    pub min_remote_documents: usize,
}

impl KnowledgeConfig {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn has_remote(&self) -> bool {
        self.base_url.as_ref().is_some_and(|u| !u.trim().is_empty())
    }

    pub fn retrieval_settings(&self) -> RetrievalSettings {
        RetrievalSettings {
            knowledge_base_id: self.knowledge_base_id.clone(),
            search_timeout: self.search_timeout(),
            search_limit: self.search_limit,
            score_threshold: self.score_threshold,
            min_remote_documents: self.min_remote_documents,
            ..RetrievalSettings::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(url) = &self.base_url {
            if !url.trim().is_empty()
                && !(url.starts_with("http://") || url.starts_with("https://"))
            {
                return Err(ValidationError::InvalidUrl("knowledge.base_url"));
            }
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(ValidationError::OutOfRange {
                field: "knowledge.score_threshold",
                reason: "must be within [0, 1]",
            });
        }
        if self.search_limit == 0 {
            return Err(ValidationError::OutOfRange {
                field: "knowledge.search_limit",
                reason: "must be at least 1",
            });
        }
        if self.search_timeout_secs == 0 {
            return Err(ValidationError::OutOfRange {
                field: "knowledge.search_timeout_secs",
                reason: "must be at least 1",
            });
        }
        if self.knowledge_base_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("knowledge.knowledge_base_id"));
        }
        Ok(())
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            remote_enabled: true,
            base_url: None,
            api_key: None,
            knowledge_base_id: default_knowledge_base_id(),
            search_timeout_secs: default_search_timeout(),
            search_limit: default_search_limit(),
            score_threshold: default_score_threshold(),
            fallback_enabled: true,
            local_documents_path: None,
            min_remote_documents: default_min_remote_documents(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_knowledge_base_id() -> String {
    "default".to_string()
}

fn default_search_timeout() -> u64 {
    5
}

fn default_search_limit() -> usize {
    5
}

fn default_score_threshold() -> f64 {
    0.2
}

fn default_min_remote_documents() -> usize {
    1
}

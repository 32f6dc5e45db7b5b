//! Query answers and the retrieval strategy that produced them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::SourceSnippet;

/// Which retrieval tier produced an answer's evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Remote knowledge service returned enough documents.
    Remote,
    /// Remote returned some documents, topped up from the local index.
    Hybrid,
    /// Local index only, or generation failed.
    Fallback,
    /// No knowledge source available; answered with zero documents.
    None,
    /// Routed to a human agent without consulting any source.
    Transfer,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Remote => "remote",
            Strategy::Hybrid => "hybrid",
            Strategy::Fallback => "fallback",
            Strategy::None => "none",
            Strategy::Transfer => "transfer",
        }
    }

    /// Source tag reported with answers of this strategy.
    pub fn source(&self) -> AnswerSource {
        match self {
            Strategy::Remote | Strategy::Hybrid => AnswerSource::RemoteKnowledge,
            Strategy::Fallback => AnswerSource::LocalFallback,
            Strategy::None => AnswerSource::None,
            Strategy::Transfer => AnswerSource::TransferToHuman,
        }
    }

    /// Whether supporting snippets are surfaced to the client.
    pub fn exposes_sources(&self) -> bool {
        matches!(self, Strategy::Remote | Strategy::Hybrid)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin tag of an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerSource {
    RemoteKnowledge,
    LocalFallback,
    None,
    TransferToHuman,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::RemoteKnowledge => "remote-knowledge",
            AnswerSource::LocalFallback => "local-fallback",
            AnswerSource::None => "none",
            AnswerSource::TransferToHuman => "transfer-to-human",
        }
    }
}

/// Result of the query pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnswer {
    pub content: String,
    pub source: AnswerSource,
    pub strategy: Strategy,
    /// Advisory score in `[0.0, 1.0]`.
    pub confidence: f64,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub sources: Vec<SourceSnippet>,
}

impl QueryAnswer {
    /// Fixed-confidence handoff answer.
    pub fn transfer(content: impl Into<String>, duration: Duration) -> Self {
        Self {
            content: content.into(),
            source: AnswerSource::TransferToHuman,
            strategy: Strategy::Transfer,
            confidence: 1.0,
            duration,
            sources: Vec::new(),
        }
    }

    pub fn is_transfer(&self) -> bool {
        self.strategy == Strategy::Transfer
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

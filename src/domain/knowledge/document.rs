//! Knowledge documents and the snippets surfaced alongside answers.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// A knowledge-base document, local or remote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl KnowledgeDocument {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::blank("document.id"));
        }
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ValidationError::blank("document.content"));
        }
        Ok(Self {
            id,
            title: title.into(),
            content,
            tags: Vec::new(),
        })
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// A retrieved document together with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSnippet {
    pub document_id: String,
    pub title: String,
    pub content: String,
    pub score: f64,
}

impl SourceSnippet {
    pub fn from_document(doc: &KnowledgeDocument, score: f64) -> Self {
        Self {
            document_id: doc.id.clone(),
            title: doc.title.clone(),
            content: doc.content.clone(),
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_requires_id_and_content() {
        assert!(KnowledgeDocument::new("", "t", "c").is_err());
        assert!(KnowledgeDocument::new("d1", "t", "  ").is_err());
        assert!(KnowledgeDocument::new("d1", "", "c").is_ok());
    }

    #[test]
    fn snippet_copies_document_fields() {
        let doc = KnowledgeDocument::new("d1", "Refunds", "Refunds take 3 days")
            .unwrap()
            .with_tags(["billing"]);
        let snippet = SourceSnippet::from_document(&doc, 0.7);
        assert_eq!(snippet.document_id, "d1");
        assert_eq!(snippet.title, "Refunds");
        assert_eq!(snippet.score, 0.7);
        assert_eq!(doc.tags, vec!["billing".to_string()]);
    }

    #[test]
    fn tags_default_when_missing_in_yaml() {
        let doc: KnowledgeDocument =
            serde_yaml::from_str("id: a\ntitle: T\ncontent: body\n").unwrap();
        assert!(doc.tags.is_empty());
    }
}

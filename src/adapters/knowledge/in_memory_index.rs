//! In-memory keyword index used as the local fallback tier.
//!
//! Queries are tokenized into lowercase ASCII words and CJK character
//! bigrams. A document scores the weighted fraction of query terms it
//! contains, with title hits counting double.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tokio::fs;
use tokio::sync::RwLock;

use crate::domain::knowledge::{KnowledgeDocument, SourceSnippet};
use crate::ports::{KnowledgeError, KnowledgeIndex};

const TITLE_WEIGHT: f64 = 2.0;
const CONTENT_WEIGHT: f64 = 1.0;

/// Local keyword index.
#[derive(Debug)]
pub struct InMemoryKnowledgeIndex {
    documents: RwLock<BTreeMap<String, KnowledgeDocument>>,
    min_score: f64,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    documents: Vec<KnowledgeDocument>,
}

impl InMemoryKnowledgeIndex {
    pub fn new(min_score: f64) -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            min_score,
        }
    }

    pub fn with_documents(
        min_score: f64,
        documents: impl IntoIterator<Item = KnowledgeDocument>,
    ) -> Self {
        let map = documents
            .into_iter()
            .map(|doc| (doc.id.clone(), doc))
            .collect();
        Self {
            documents: RwLock::new(map),
            min_score,
        }
    }

    /// Index seeded with the built-in FAQ set.
    pub fn with_builtin_faq(min_score: f64) -> Self {
        Self::with_documents(min_score, builtin_faq())
    }

    /// Index seeded from a YAML file with a top-level `documents:` list.
    pub async fn from_yaml_file(
        path: impl AsRef<Path>,
        min_score: f64,
    ) -> Result<Self, KnowledgeError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| KnowledgeError::Index(format!("{}: {}", path.display(), e)))?;
        let seed: SeedFile = serde_yaml::from_str(&raw)
            .map_err(|e| KnowledgeError::Parse(format!("{}: {}", path.display(), e)))?;

        let mut seen = BTreeSet::new();
        for doc in &seed.documents {
            if doc.id.trim().is_empty() || doc.content.trim().is_empty() {
                return Err(KnowledgeError::Parse(format!(
                    "{}: document with empty id or content",
                    path.display()
                )));
            }
            if !seen.insert(doc.id.as_str()) {
                return Err(KnowledgeError::Parse(format!(
                    "{}: duplicate document id '{}'",
                    path.display(),
                    doc.id
                )));
            }
        }

        tracing::info!(
            path = %path.display(),
            documents = seed.documents.len(),
            "Loaded local knowledge documents"
        );
        Ok(Self::with_documents(min_score, seed.documents))
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}')
}

/// Lowercase ASCII words plus CJK bigrams (a lone CJK char is its own term).
pub fn tokenize(text: &str) -> BTreeSet<String> {
    let mut terms = BTreeSet::new();
    let mut word = String::new();
    let mut cjk_run: Vec<char> = Vec::new();

    let flush_cjk = |run: &mut Vec<char>, terms: &mut BTreeSet<String>| {
        match run.len() {
            0 => {}
            1 => {
                terms.insert(run[0].to_string());
            }
            _ => {
                for pair in run.windows(2) {
                    terms.insert(pair.iter().collect());
                }
            }
        }
        run.clear();
    };

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            flush_cjk(&mut cjk_run, &mut terms);
            word.push(c.to_ascii_lowercase());
            continue;
        }
        if !word.is_empty() {
            terms.insert(std::mem::take(&mut word));
        }
        if is_cjk(c) {
            cjk_run.push(c);
        } else {
            flush_cjk(&mut cjk_run, &mut terms);
        }
    }
    if !word.is_empty() {
        terms.insert(word);
    }
    flush_cjk(&mut cjk_run, &mut terms);
    terms
}

fn score(terms: &BTreeSet<String>, doc: &KnowledgeDocument) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let title = doc.title.to_lowercase();
    let body = format!("{} {}", doc.content, doc.tags.join(" ")).to_lowercase();
    let hits: f64 = terms
        .iter()
        .map(|term| {
            if title.contains(term.as_str()) {
                TITLE_WEIGHT
            } else if body.contains(term.as_str()) {
                CONTENT_WEIGHT
            } else {
                0.0
            }
        })
        .sum();
    hits / (TITLE_WEIGHT * terms.len() as f64)
}

#[async_trait]
impl KnowledgeIndex for InMemoryKnowledgeIndex {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SourceSnippet>, KnowledgeError> {
        let terms = tokenize(query);
        let docs = self.documents.read().await;

        let mut scored: Vec<SourceSnippet> = docs
            .values()
            .map(|doc| (score(&terms, doc), doc))
            .filter(|(s, _)| *s > 0.0 && *s >= self.min_score)
            .map(|(s, doc)| SourceSnippet::from_document(doc, s))
            .collect();
        // Stable sort keeps id order among equal scores.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn documents(&self) -> Result<Vec<KnowledgeDocument>, KnowledgeError> {
        Ok(self.documents.read().await.values().cloned().collect())
    }

    async fn upsert(&self, document: KnowledgeDocument) -> Result<(), KnowledgeError> {
        if document.id.trim().is_empty() {
            return Err(KnowledgeError::InvalidRequest("document id is empty".into()));
        }
        self.documents
            .write()
            .await
            .insert(document.id.clone(), document);
        Ok(())
    }
}

fn faq(id: &str, title: &str, content: &str, tags: &[&str]) -> KnowledgeDocument {
    KnowledgeDocument {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// Small default FAQ used when no seed file is configured.
pub fn builtin_faq() -> Vec<KnowledgeDocument> {
    vec![
        faq(
            "faq-service-intro",
            "服务介绍 Service overview",
            "我们提供7x24小时在线客服，支持网页、Telegram及第三方聊天平台接入，\
             可解答订单、配送、退款与账户相关问题。We offer round-the-clock support \
             across web chat and messaging platforms for orders, shipping, refunds and accounts.",
            &["服务", "介绍", "overview"],
        ),
        faq(
            "faq-refund",
            "退款政策 Refund policy",
            "签收后30天内可申请退款，审核通过后3-5个工作日原路退回。\
             Refunds can be requested within 30 days of delivery and are returned \
             to the original payment method within 3-5 business days.",
            &["退款", "refund"],
        ),
        faq(
            "faq-shipping",
            "配送时效 Shipping times",
            "订单一般在24小时内发货，国内配送2-4天送达。Orders ship within 24 hours \
             and domestic delivery takes 2-4 days.",
            &["配送", "发货", "shipping", "delivery"],
        ),
        faq(
            "faq-account",
            "账户与密码 Account and password",
            "忘记密码可在登录页点击\"忘记密码\"通过手机或邮箱重置。Use \"Forgot password\" \
             on the sign-in page to reset your password by phone or email.",
            &["账户", "密码", "account", "password"],
        ),
        faq(
            "faq-hours",
            "人工服务时间 Human support hours",
            "人工客服服务时间为每天9:00-21:00，其余时间由智能助手应答。Human agents are \
             available daily 9:00-21:00; the assistant answers outside those hours.",
            &["人工", "hours"],
        ),
    ]
}

//! Knowledge domain - documents, answers, scoring and intent.
//!
//! Everything here is pure: no I/O, no clocks beyond what callers pass in.

mod answer;
mod confidence;
mod document;
mod intent;
mod metrics;
mod prompt;

pub use answer::{AnswerSource, QueryAnswer, Strategy};
pub use confidence::calculate_confidence;
pub use document::{KnowledgeDocument, SourceSnippet};
pub use intent::{detect_transfer, TransferReason};
pub use metrics::{MetricsSnapshot, QueryMetrics};
pub use prompt::{build_prompt, DEGRADED_RESPONSE, SYSTEM_PROMPT, TRANSFER_RESPONSE};

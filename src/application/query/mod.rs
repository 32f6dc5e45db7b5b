//! Query pipeline.
//!
//! - [`BaseQueryService`] - transfer detection, retrieval, generation, confidence
//! - [`EnhancedQueryService`] - metrics decorator over any [`AnswerCapability`]
//! - [`ResilientDocumentSource`] - remote search behind the circuit breaker
//!   with local fallback
//! - [`KnowledgeControls`] - operator switches and bulk sync

mod base_service;
mod controls;
mod enhanced_service;
mod retrieval;

pub use base_service::{AnswerCapability, Answered, BaseQueryService, GenerationSettings};
pub use controls::{KnowledgeControls, SyncReport};
pub use enhanced_service::{EnhancedQueryService, EnhancedSettings};
pub use retrieval::{
    DocumentSource, LocalDocumentSource, ResilientDocumentSource, Retrieval, RetrievalSettings,
    SourceStatus, TierToggles,
};

//! Boundary types for the answer-generation side.
//!
//! Retrieval never talks to a language model itself; these types describe what
//! the caller hands over and what may come back.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AskResponse, RankedSource};

/// Failure of the external answer-generation call, classified by cause.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GenerationError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("unknown generation error: {0}")]
    Unknown(String),
}

impl GenerationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnswerOutcome {
    Answered(String),
    NoRelevantContent,
    Failed(GenerationError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerReport {
    pub response: AskResponse,
    pub outcome: AnswerOutcome,
}

/// Numbered passages with their source names, in rank order.
pub fn format_context(sources: &[RankedSource]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] {} #{} (similarity {:.3})\n{}", i + 1, s.source, s.chunk_index, s.similarity, s.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

use crate::answer::GenerationError;
use crate::types::{RankedSource, SearchHit};

/// Ranked similarity search over indexed chunks.
///
/// Implementations never fail: an empty index or a query without any indexed
/// term yields an empty list.
pub trait Retriever: Send + Sync {
    fn search(&self, query: &str, top_k: usize, min_similarity: f32) -> Vec<SearchHit>;
}

/// The external answer-generation collaborator: turns a question and its
/// ranked passages into prose.
pub trait AnswerGenerator: Send + Sync {
    fn generate(&self, question: &str, sources: &[RankedSource]) -> Result<String, GenerationError>;
}

//! Domain types shared by the chunker, the vector index and the engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type ChunkId = String;

/// A source file read from the corpus directory.
///
/// Documents only live long enough to be chunked; the chunks are what get
/// indexed and persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub path: PathBuf,
    pub content: String,
}

/// A passage of a source document that is independently indexed.
///
/// - `id`: `<doc_name>:<chunk_index>`, unique within a corpus
/// - `doc_name`: document identity, the path relative to the corpus root
/// - `doc_path`: original path to the source file
/// - `content`: the text payload of the chunk, never empty
/// - `chunk_index`/`total_chunks`: position within the parent document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub doc_name: String,
    pub doc_path: String,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// A chunk together with its cosine similarity to a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: DocumentChunk,
    pub similarity: f32,
}

/// A retrieved passage as handed to the answer-generation side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSource {
    pub source: String,
    pub chunk_index: usize,
    pub similarity: f32,
    pub content: String,
}

impl RankedSource {
    /// First `max_chars` characters of the passage, with `...` appended when
    /// the passage was cut.
    pub fn preview(&self, max_chars: usize) -> String {
        match self.content.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &self.content[..cut]),
            None => self.content.clone(),
        }
    }
}

impl From<SearchHit> for RankedSource {
    fn from(hit: SearchHit) -> Self {
        Self {
            source: hit.chunk.doc_name,
            chunk_index: hit.chunk.chunk_index,
            similarity: hit.similarity,
            content: hit.chunk.content,
        }
    }
}

/// Result of `ask`: the question and its ranked supporting passages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub question: String,
    pub sources: Vec<RankedSource>,
}

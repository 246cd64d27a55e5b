use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use redchamber_core::chunker::ChunkingConfig;
use redchamber_core::config::IndexSettings;
use redchamber_core::corpus::CorpusFingerprint;
use redchamber_core::types::DocumentChunk;
use redchamber_text::TermTokenizer;

/// Bumped whenever the persisted layout of a snapshot changes.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
	#[error("cache I/O error at {path}: {source}")]
	Io { path: PathBuf, #[source] source: std::io::Error },
	#[error("malformed cache artifact: {0}")]
	Json(#[from] serde_json::Error),
	#[error("cache format version {found}, expected {expected}")]
	FormatVersion { found: u32, expected: u32 },
	#[error("chunk artifact does not belong to the index artifact")]
	DigestMismatch,
	#[error("inconsistent snapshot: {0}")]
	Inconsistent(String),
}

impl SnapshotError {
	pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self { Self::Io { path: path.into(), source } }
}

/// A sparse row: strictly increasing column indices and their weights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
	pub indices: Vec<u32>,
	pub weights: Vec<f32>,
}

impl SparseVector {
	pub fn nnz(&self) -> usize { self.indices.len() }

	pub fn is_zero(&self) -> bool { self.weights.iter().all(|w| *w == 0.0) }

	/// Merge-join dot product, accumulated in f64.
	pub fn dot(&self, other: &SparseVector) -> f32 {
		let (mut i, mut j, mut acc) = (0usize, 0usize, 0f64);
		while i < self.indices.len() && j < other.indices.len() {
			match self.indices[i].cmp(&other.indices[j]) {
				std::cmp::Ordering::Less => i += 1,
				std::cmp::Ordering::Greater => j += 1,
				std::cmp::Ordering::Equal => {
					acc += f64::from(self.weights[i]) * f64::from(other.weights[j]);
					i += 1;
					j += 1;
				}
			}
		}
		acc as f32
	}
}

/// Term to column mapping. Persisted as the ordered term list; the lookup
/// table is rebuilt on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
	terms: Vec<String>,
	lookup: HashMap<String, u32>,
}

impl From<Vec<String>> for Vocabulary {
	fn from(terms: Vec<String>) -> Self {
		let lookup = terms.iter().enumerate().map(|(i, t)| (t.clone(), i as u32)).collect();
		Self { terms, lookup }
	}
}

impl From<Vocabulary> for Vec<String> {
	fn from(vocabulary: Vocabulary) -> Self { vocabulary.terms }
}

impl Vocabulary {
	pub fn len(&self) -> usize { self.terms.len() }
	pub fn is_empty(&self) -> bool { self.terms.is_empty() }
	pub fn index_of(&self, term: &str) -> Option<u32> { self.lookup.get(term).copied() }
	pub fn terms(&self) -> &[String] { &self.terms }
}

/// Everything besides the corpus itself that shapes a built index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildParams {
	pub chunking: ChunkingConfig,
	pub index: IndexSettings,
	pub tokenizer_signature: String,
}

impl BuildParams {
	pub fn new(chunking: ChunkingConfig, index: IndexSettings, tokenizer: &TermTokenizer) -> Self {
		Self { chunking, index, tokenizer_signature: tokenizer.signature().to_string() }
	}
}

/// Identity of a snapshot: a cached snapshot is fresh only when its key
/// equals the key computed from the current corpus and settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotKey {
	pub fingerprint: CorpusFingerprint,
	pub params: BuildParams,
}

/// Chunks, vocabulary, idf table and L2-normalized chunk vectors, immutable
/// once constructed. Build and cache restore both go through
/// [`IndexSnapshot::from_parts`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
	chunks: Vec<DocumentChunk>,
	vocabulary: Vocabulary,
	idf: Vec<f32>,
	vectors: Vec<SparseVector>,
	key: SnapshotKey,
	built_at: DateTime<Utc>,
}

impl IndexSnapshot {
	pub fn from_parts(
		chunks: Vec<DocumentChunk>,
		vocabulary: Vocabulary,
		idf: Vec<f32>,
		vectors: Vec<SparseVector>,
		key: SnapshotKey,
		built_at: DateTime<Utc>,
	) -> Result<Self, SnapshotError> {
		if vocabulary.lookup.len() != vocabulary.terms.len() {
			return Err(SnapshotError::Inconsistent("vocabulary contains duplicate terms".into()));
		}
		if idf.len() != vocabulary.len() {
			return Err(SnapshotError::Inconsistent(format!("{} idf weights for {} terms", idf.len(), vocabulary.len())));
		}
		if vectors.len() != chunks.len() {
			return Err(SnapshotError::Inconsistent(format!("{} vectors for {} chunks", vectors.len(), chunks.len())));
		}
		let dim = vocabulary.len();
		for (row, v) in vectors.iter().enumerate() {
			let ordered = v.indices.windows(2).all(|w| w[0] < w[1]);
			let in_range = v.indices.iter().all(|&i| (i as usize) < dim);
			if v.indices.len() != v.weights.len() || !ordered || !in_range {
				return Err(SnapshotError::Inconsistent(format!("vector {row} is malformed")));
			}
		}
		Ok(Self { chunks, vocabulary, idf, vectors, key, built_at })
	}

	pub fn chunks(&self) -> &[DocumentChunk] { &self.chunks }
	pub fn vocabulary(&self) -> &Vocabulary { &self.vocabulary }
	pub fn idf(&self) -> &[f32] { &self.idf }
	pub fn vectors(&self) -> &[SparseVector] { &self.vectors }
	pub fn key(&self) -> &SnapshotKey { &self.key }
	pub fn built_at(&self) -> DateTime<Utc> { self.built_at }
	pub fn len(&self) -> usize { self.chunks.len() }
	pub fn is_empty(&self) -> bool { self.chunks.is_empty() }
}

//! Vocabulary, idf and chunk-vector construction.
//!
//! Flow for `build`:
//! 1) Tokenize every chunk into unigram and n-gram terms
//! 2) Count chunk frequencies, apply the min/max df cutoffs and the feature cap
//! 3) Weight raw term counts by the smoothed idf and L2-normalize each row
use chrono::Utc;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

use redchamber_core::types::DocumentChunk;
use redchamber_text::TermTokenizer;

use crate::snapshot::{IndexSnapshot, SnapshotError, SnapshotKey, SparseVector, Vocabulary};

/// Build a snapshot over `chunks`, in the given order. An empty chunk set
/// produces an empty snapshot.
pub fn build(chunks: Vec<DocumentChunk>, tokenizer: &TermTokenizer, key: SnapshotKey) -> Result<IndexSnapshot, SnapshotError> {
	let settings = key.params.index.clone();
	let n_chunks = chunks.len();
	let chunk_terms: Vec<Vec<String>> = chunks.iter().map(|c| tokenizer.terms(&c.content, settings.ngram_range)).collect();

	let mut df: HashMap<&str, usize> = HashMap::new();
	for terms in &chunk_terms {
		let distinct: HashSet<&str> = terms.iter().map(String::as_str).collect();
		for term in distinct {
			*df.entry(term).or_default() += 1;
		}
	}
	let observed = df.len();

	let max_count = settings.max_df * n_chunks as f64;
	let mut retained: Vec<(&str, usize)> = df
		.into_iter()
		.filter(|&(_, count)| count >= settings.min_df && count as f64 <= max_count)
		.collect();
	if retained.len() > settings.max_features {
		retained.sort_unstable_by_key(|&(term, count)| (Reverse(count), term));
		retained.truncate(settings.max_features);
	}
	retained.sort_unstable_by_key(|&(term, _)| term);

	let idf: Vec<f32> = retained.iter().map(|&(_, count)| smoothed_idf(n_chunks, count)).collect();
	let vocabulary = Vocabulary::from(retained.iter().map(|&(term, _)| term.to_string()).collect::<Vec<_>>());
	let vectors: Vec<SparseVector> = chunk_terms.iter().map(|terms| vectorize(terms, &vocabulary, &idf)).collect();

	let empty_rows = vectors.iter().filter(|v| v.is_zero()).count();
	debug!(target: "redchamber::index", observed, retained = vocabulary.len(), empty_rows, "vocabulary selected");
	info!(target: "redchamber::index", chunks = n_chunks, vocabulary = vocabulary.len(), "index built");

	IndexSnapshot::from_parts(chunks, vocabulary, idf, vectors, key, Utc::now())
}

/// `ln((1 + n) / (1 + df)) + 1`
pub fn smoothed_idf(n_chunks: usize, df: usize) -> f32 {
	(((1 + n_chunks) as f64 / (1 + df) as f64).ln() + 1.0) as f32
}

/// Raw term counts restricted to `vocabulary`, scaled by `idf` and
/// L2-normalized. Terms outside the vocabulary are ignored; no known term
/// gives the zero vector. Shared by index build and query projection.
pub fn vectorize(terms: &[String], vocabulary: &Vocabulary, idf: &[f32]) -> SparseVector {
	let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
	for term in terms {
		if let Some(index) = vocabulary.index_of(term) {
			*counts.entry(index).or_default() += 1;
		}
	}
	let weighted: Vec<(u32, f64)> = counts
		.into_iter()
		.map(|(index, tf)| (index, f64::from(tf) * f64::from(idf.get(index as usize).copied().unwrap_or(0.0))))
		.collect();
	let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
	if norm == 0.0 {
		return SparseVector::default();
	}
	SparseVector {
		indices: weighted.iter().map(|(i, _)| *i).collect(),
		weights: weighted.iter().map(|(_, w)| (w / norm) as f32).collect(),
	}
}

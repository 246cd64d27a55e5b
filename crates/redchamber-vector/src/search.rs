//! Exhaustive cosine-similarity search over a snapshot.
use tracing::debug;

use redchamber_core::types::SearchHit;
use redchamber_text::TermTokenizer;

use crate::index_build::vectorize;
use crate::snapshot::IndexSnapshot;

/// Score `query` against every chunk of `snapshot`.
///
/// Keeps hits with similarity strictly above `min_similarity`, ordered by
/// similarity descending and then by chunk order, at most `top_k` of them.
/// `tokenizer` must be the one the snapshot was built with.
pub fn search(snapshot: &IndexSnapshot, tokenizer: &TermTokenizer, query: &str, top_k: usize, min_similarity: f32) -> Vec<SearchHit> {
	if top_k == 0 || snapshot.is_empty() || snapshot.vocabulary().is_empty() {
		return Vec::new();
	}
	let terms = tokenizer.terms(query, snapshot.key().params.index.ngram_range);
	let query_vec = vectorize(&terms, snapshot.vocabulary(), snapshot.idf());
	if query_vec.is_zero() {
		debug!(target: "redchamber::search", terms = terms.len(), "query has no indexed terms");
		return Vec::new();
	}

	let mut scored: Vec<(usize, f32)> = snapshot
		.vectors()
		.iter()
		.enumerate()
		.map(|(row, v)| (row, query_vec.dot(v)))
		.filter(|&(_, sim)| sim > min_similarity)
		.collect();
	let matched = scored.len();
	scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
	scored.truncate(top_k);
	debug!(target: "redchamber::search", terms = terms.len(), matched, returned = scored.len(), "scored query");

	scored
		.into_iter()
		.map(|(row, similarity)| SearchHit { chunk: snapshot.chunks()[row].clone(), similarity })
		.collect()
}

use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, StopWordFilter, TextAnalyzer, TokenStream};

use crate::cjk::CjkBigramTokenizer;
use crate::stopwords::StopWords;

/// Tokens longer than this many bytes are dropped before filtering.
pub const MAX_TOKEN_BYTES: usize = 64;

/// CJK bigram segmentation, lower-casing, long-token removal and stopword removal.
pub fn build_analyzer(stopwords: &StopWords) -> TextAnalyzer {
	TextAnalyzer::builder(CjkBigramTokenizer::default())
		.filter(LowerCaser)
		.filter(RemoveLongFilter::limit(MAX_TOKEN_BYTES))
		.filter(StopWordFilter::remove(stopwords.iter().map(|s| s.to_string())))
		.build()
}

/// Run `analyzer` over `text` and collect the token texts in order.
pub fn analyze(analyzer: &TextAnalyzer, text: &str) -> Vec<String> {
	let mut analyzer = analyzer.clone();
	let mut stream = analyzer.token_stream(text);
	let mut out = Vec::new();
	while stream.advance() { out.push(stream.token().text.clone()); }
	out
}

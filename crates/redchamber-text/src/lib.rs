//! redchamber-text
//!
//! Tantivy-based text analysis: CJK bigram segmentation, lower-casing and
//! stopword removal, plus the term filtering and n-gram expansion used by the
//! vector index.

pub mod cjk;
pub mod stopwords;
pub mod tantivy_utils;
pub mod tokenizer;

pub use stopwords::StopWords;
pub use tokenizer::TermTokenizer;

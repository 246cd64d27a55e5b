//! Text to index terms.
//!
//! `tokenize` is the single source of terms for both index build and query
//! time, so its output must depend on nothing but the input text and the
//! stopword set.
//!
//! Chinese text is split into bigrams, so a single-character stopword never
//! equals a term. A bigram whose two characters are both stopwords (是这, 就是)
//! is dropped instead; a bigram with one content character is kept.

use tantivy::tokenizer::TextAnalyzer;

use crate::cjk::is_cjk;
use crate::stopwords::StopWords;
use crate::tantivy_utils::{analyze, build_analyzer, MAX_TOKEN_BYTES};

const ANALYZER_VERSION: &str = "cjk-bigram+lowercase+stopwords/2";

const CJK_PUNCTUATION: &str = "，。！？；：“”‘’（）【】《》〈〉「」『』、…—～·";

#[derive(Clone)]
pub struct TermTokenizer {
    analyzer: TextAnalyzer,
    stopwords: StopWords,
    signature: String,
}

impl Default for TermTokenizer {
    fn default() -> Self {
        Self::new(StopWords::default())
    }
}

impl std::fmt::Debug for TermTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermTokenizer")
            .field("stopwords", &self.stopwords.len())
            .field("signature", &self.signature)
            .finish()
    }
}

impl TermTokenizer {
    pub fn new(stopwords: StopWords) -> Self {
        let analyzer = build_analyzer(&stopwords);
        let signature = signature_of(&stopwords);
        Self { analyzer, stopwords, signature }
    }

    /// Filtered terms of `text`, in text order.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        analyze(&self.analyzer, text)
            .into_iter()
            .filter(|t| keep_term(t) && !self.is_stop_bigram(t))
            .collect()
    }

    /// Filtered terms plus word n-grams for every `n` in `ngram_range`
    /// (inclusive). N-grams are built over the filtered terms and joined by a
    /// single space.
    pub fn terms(&self, text: &str, ngram_range: (usize, usize)) -> Vec<String> {
        ngrams(&self.tokenize(text), ngram_range)
    }

    /// Digest of everything that shapes the output of `tokenize`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    fn is_stop_bigram(&self, term: &str) -> bool {
        let mut buf = [0u8; 4];
        term.chars().all(|c| is_cjk(c) && self.stopwords.contains(c.encode_utf8(&mut buf)))
    }
}

/// Length, whitespace and punctuation rules applied to every candidate term.
pub fn keep_term(term: &str) -> bool {
    if term.is_empty() || term.chars().count() <= 1 {
        return false;
    }
    if term.chars().all(char::is_whitespace) {
        return false;
    }
    !term.chars().all(is_punctuation)
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || CJK_PUNCTUATION.contains(c)
}

pub fn ngrams(tokens: &[String], (min_n, max_n): (usize, usize)) -> Vec<String> {
    let mut out = Vec::new();
    for n in min_n.max(1)..=max_n {
        if n == 1 {
            out.extend(tokens.iter().cloned());
        } else {
            out.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
    }
    out
}

fn signature_of(stopwords: &StopWords) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(ANALYZER_VERSION.as_bytes());
    hasher.update(&(MAX_TOKEN_BYTES as u64).to_le_bytes());
    for word in stopwords.iter() {
        hasher.update(word.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

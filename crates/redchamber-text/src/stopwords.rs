use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

const CHINESE: &[&str] = &[
	"的","了","在","是","我","有","和","就","不","人","都","一","一个","上","也","很","到","说","要","去","你","会","着","没有","看","好","自己","这",
];

const ENGLISH: &[&str] = &[
	"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
];

/// A fixed set of terms removed during analysis. Terms are stored lower-cased
/// because the analyzer lower-cases before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopWords {
	words: BTreeSet<String>,
}

impl Default for StopWords {
	fn default() -> Self { Self::from_words(CHINESE.iter().chain(ENGLISH.iter()).copied()) }
}

impl StopWords {
	pub fn from_words<I, S>(words: I) -> Self where I: IntoIterator<Item = S>, S: AsRef<str> {
		let words = words.into_iter().map(|w| w.as_ref().trim().to_lowercase()).filter(|w| !w.is_empty()).collect();
		Self { words }
	}

	/// One word per line; blank lines are ignored.
	pub fn from_file(path: &Path) -> std::io::Result<Self> {
		let content = std::fs::read_to_string(path)?;
		Ok(Self::from_words(content.lines()))
	}

	/// The file at `path` when given and readable, the built-in list otherwise.
	pub fn load_or_default(path: Option<&Path>) -> Self {
		let Some(path) = path else { return Self::default() };
		match Self::from_file(path) {
			Ok(words) => { info!(target: "redchamber::text", path = %path.display(), count = words.len(), "loaded stopwords"); words }
			Err(e) => { warn!(target: "redchamber::text", path = %path.display(), error = %e, "stopword file unreadable, using built-in list"); Self::default() }
		}
	}

	pub fn contains(&self, word: &str) -> bool { self.words.contains(word) }
	pub fn len(&self) -> usize { self.words.len() }
	pub fn is_empty(&self) -> bool { self.words.is_empty() }
	pub fn iter(&self) -> impl Iterator<Item = &str> { self.words.iter().map(String::as_str) }
}

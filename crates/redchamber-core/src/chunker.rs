//! Sentence-bounded chunking with an optional sentence carry between chunks.
//!
//! Text is cut into sentences on terminal punctuation, then sentences are
//! packed greedily into chunks of at most `chunk_size` characters. A sentence
//! longer than the budget becomes a chunk on its own. When `carry_overlap` is
//! on, whole trailing sentences of the closed chunk (at most `overlap`
//! characters in total) are repeated at the start of the next one.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
    pub carry_overlap: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 300, overlap: 50, carry_overlap: true }
    }
}

const TERMINATORS: &[char] = &['。', '！', '？', '!', '?'];
const CLOSERS: &[char] = &['”', '’', '」', '』', '）', ')', '"', '\''];

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Split `text` into chunk texts, in document order.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_spans(text).into_iter().map(|r| text[r].to_string()).collect()
    }

    fn split_spans(&self, text: &str) -> Vec<Range<usize>> {
        let sentences = sentence_spans(text);
        let budget = self.config.chunk_size;
        let mut chunks: Vec<Range<usize>> = Vec::new();
        let mut current: Vec<Range<usize>> = Vec::new();

        for sentence in sentences {
            let Some(first) = current.first() else {
                current.push(sentence);
                continue;
            };
            if char_len(&text[first.start..sentence.end]) <= budget {
                current.push(sentence);
                continue;
            }
            chunks.push(span_of(&current));
            let carried = if self.config.carry_overlap && self.config.overlap > 0 {
                self.carry(text, &current, &sentence)
            } else {
                Vec::new()
            };
            current = carried;
            current.push(sentence);
        }
        if !current.is_empty() {
            chunks.push(span_of(&current));
        }

        debug!(target: "redchamber::chunker", chunks = chunks.len(), "split text");
        chunks
    }

    /// Trailing sentences of `closed` that fit the overlap budget and still
    /// leave room for `next` within the chunk budget.
    fn carry(&self, text: &str, closed: &[Range<usize>], next: &Range<usize>) -> Vec<Range<usize>> {
        let mut take = 0;
        for (i, sentence) in closed.iter().enumerate().rev() {
            let carried = char_len(&text[sentence.start..closed[closed.len() - 1].end]);
            let with_next = char_len(&text[sentence.start..next.end]);
            if carried > self.config.overlap || with_next > self.config.chunk_size {
                break;
            }
            take = closed.len() - i;
        }
        closed[closed.len() - take..].to_vec()
    }
}

/// Sentences of `text` as trimmed, non-empty strings.
///
/// A sentence ends after a terminator (`。！？!?`, or `.` followed by
/// whitespace or end of text) together with any closing quotes or repeated
/// terminators right after it. Trailing text without a terminator forms the
/// last sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    sentence_spans(text).into_iter().map(|r| &text[r]).collect()
}

fn sentence_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        let ends_sentence = TERMINATORS.contains(&c)
            || (c == '.' && chars.peek().map_or(true, |&(_, next)| next.is_whitespace()));
        if !ends_sentence {
            continue;
        }
        let mut end = offset + c.len_utf8();
        while let Some(&(next_offset, next)) = chars.peek() {
            if !(CLOSERS.contains(&next) || TERMINATORS.contains(&next)) {
                break;
            }
            end = next_offset + next.len_utf8();
            chars.next();
        }
        push_trimmed(text, start..end, &mut spans);
        start = end;
    }
    push_trimmed(text, start..text.len(), &mut spans);
    spans
}

fn push_trimmed(text: &str, range: Range<usize>, spans: &mut Vec<Range<usize>>) {
    let raw = &text[range.clone()];
    let trimmed = raw.trim_start();
    let start = range.start + (raw.len() - trimmed.len());
    let end = start + trimmed.trim_end().len();
    if start < end {
        spans.push(start..end);
    }
}

fn span_of(sentences: &[Range<usize>]) -> Range<usize> {
    sentences[0].start..sentences[sentences.len() - 1].end
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

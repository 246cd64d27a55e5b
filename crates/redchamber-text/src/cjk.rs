//! A tantivy tokenizer for running text in CJK scripts.
//!
//! Runs of CJK characters are emitted as overlapping character bigrams
//! ("红楼梦" -> "红楼", "楼梦"); a CJK character with no CJK neighbour is
//! emitted alone. Runs of other alphanumeric characters are emitted as whole
//! words. Everything else (whitespace, punctuation, symbols) separates tokens
//! and is never emitted.

use std::iter::Peekable;
use std::str::CharIndices;

use tantivy::tokenizer::{Token, TokenStream, Tokenizer};

#[derive(Clone, Default)]
pub struct CjkBigramTokenizer {
    token: Token,
}

pub struct CjkBigramTokenStream<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
    in_cjk_run: bool,
    token: &'a mut Token,
}

impl Tokenizer for CjkBigramTokenizer {
    type TokenStream<'a> = CjkBigramTokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> CjkBigramTokenStream<'a> {
        self.token.reset();
        CjkBigramTokenStream { text, chars: text.char_indices().peekable(), in_cjk_run: false, token: &mut self.token }
    }
}

impl CjkBigramTokenStream<'_> {
    fn emit(&mut self, from: usize, to: usize) -> bool {
        self.token.position = self.token.position.wrapping_add(1);
        self.token.offset_from = from;
        self.token.offset_to = to;
        self.token.text.push_str(&self.text[from..to]);
        true
    }
}

impl TokenStream for CjkBigramTokenStream<'_> {
    fn advance(&mut self) -> bool {
        self.token.text.clear();
        while let Some((offset, c)) = self.chars.next() {
            if is_cjk(c) {
                let follows_cjk = std::mem::replace(&mut self.in_cjk_run, true);
                match self.chars.peek().copied() {
                    Some((next_offset, next)) if is_cjk(next) => {
                        return self.emit(offset, next_offset + next.len_utf8());
                    }
                    _ if !follows_cjk => return self.emit(offset, offset + c.len_utf8()),
                    _ => continue,
                }
            }
            self.in_cjk_run = false;
            if c.is_alphanumeric() {
                let mut end = offset + c.len_utf8();
                while let Some((next_offset, next)) = self.chars.peek().copied() {
                    if !next.is_alphanumeric() || is_cjk(next) {
                        break;
                    }
                    end = next_offset + next.len_utf8();
                    self.chars.next();
                }
                return self.emit(offset, end);
            }
        }
        false
    }

    fn token(&self) -> &Token {
        self.token
    }

    fn token_mut(&mut self) -> &mut Token {
        self.token
    }
}

/// Han ideographs, kana and hangul syllables.
pub fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x3040..=0x30FF       // hiragana, katakana
            | 0x3400..=0x4DBF // extension A
            | 0x4E00..=0x9FFF // unified ideographs
            | 0xAC00..=0xD7AF // hangul syllables
            | 0xF900..=0xFAFF // compatibility ideographs
            | 0x20000..=0x2FA1F
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<(String, usize, usize)> {
        let mut tokenizer = CjkBigramTokenizer::default();
        let mut stream = tokenizer.token_stream(text);
        let mut out = Vec::new();
        while stream.advance() {
            let t = stream.token();
            out.push((t.text.clone(), t.offset_from, t.offset_to));
        }
        out
    }

    fn texts(text: &str) -> Vec<String> {
        tokens(text).into_iter().map(|(t, _, _)| t).collect()
    }

    #[test]
    fn cjk_runs_become_overlapping_bigrams() {
        assert_eq!(texts("红楼梦"), vec!["红楼", "楼梦"]);
        assert_eq!(texts("甲是谁。"), vec!["甲是", "是谁"]);
    }

    #[test]
    fn isolated_cjk_character_is_a_unigram() {
        assert_eq!(texts("甲，乙。"), vec!["甲", "乙"]);
    }

    #[test]
    fn latin_words_and_digits_stay_whole() {
        assert_eq!(texts("Chapter 12: 宝玉 met Daiyu"), vec!["Chapter", "12", "宝玉", "met", "Daiyu"]);
    }

    #[test]
    fn offsets_are_byte_offsets_into_the_input() {
        let text = "a 红楼";
        let toks = tokens(text);
        assert_eq!(toks, vec![("a".to_string(), 0, 1), ("红楼".to_string(), 2, 8)]);
        assert_eq!(&text[2..8], "红楼");
    }

    #[test]
    fn punctuation_and_whitespace_only_text_has_no_tokens() {
        assert!(texts(" ，。！？…… \n").is_empty());
    }
}

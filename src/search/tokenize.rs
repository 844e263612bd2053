//! Text tokenization for relevance scoring.
//!
//! A token is a maximal run of ASCII lowercase letters, digits, or Hangul
//! (compatibility jamo U+3130–U+318F and syllables U+AC00–U+D7AF) after the
//! input has been lowercased. Everything else separates tokens. There is no
//! stemming and no stop-word list: Korean and English words are opaque strings.

use ahash::{AHashMap, AHashSet};

/// Returns true for characters that belong inside a token.
const fn is_token_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '\u{3130}'..='\u{318F}' | '\u{AC00}'..='\u{D7AF}')
}

/// Every token occurrence in `text`, duplicates included, in source order.
fn extract_terms(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !is_token_char(c))
        .filter(|segment| !segment.is_empty())
        .map(String::from)
        .collect()
}

/// A deduplicated set of tokens.
///
/// Tokens keep the order in which they first appeared in the source text. Scoring
/// treats this as a set; the order only matters for the exact-phrase heuristic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    tokens: Vec<String>,
}

impl TokenSet {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// The tokens joined by single spaces, in first-seen order.
    pub fn phrase(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Tokenizes text into a deduplicated token set. Empty input yields an empty set.
pub fn tokenize(text: &str) -> TokenSet {
    let mut seen = AHashSet::new();
    let tokens = extract_terms(text)
        .into_iter()
        .filter(|token| seen.insert(token.clone()))
        .collect();
    TokenSet { tokens }
}

/// Counts every token occurrence in `text`.
pub fn term_counts(text: &str) -> AHashMap<String, usize> {
    let mut counts = AHashMap::new();
    for term in extract_terms(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    fn tokens(text: &str) -> Vec<String> {
        tokenize(text).iter().map(String::from).collect()
    }

    #[rstest]
    #[case("Basic greetings", &["basic", "greetings"])]
    #[case("Hello, WORLD! hello", &["hello", "world"])]
    #[case("TOPIK-2 vocab_list", &["topik", "2", "vocab", "list"])]
    #[case("안녕하세요 Korean 인사", &["안녕하세요", "korean", "인사"])]
    #[case("ㄱㄴㄷ jamo", &["ㄱㄴㄷ", "jamo"])]
    #[case("한국어123abc", &["한국어123abc"])]
    fn test_tokenize_exact(#[case] input: &str, #[case] expected: &[&str]) {
        check!(tokens(input) == expected);
    }

    #[rstest]
    #[case("café", &["caf"])] // é is outside the token alphabet
    #[case("日本語 ok", &["ok"])]
    #[case("🦀rust🦀", &["rust"])]
    #[case("İstanbul", &["i", "stanbul"])] // lowercases to i + combining dot
    fn test_non_token_characters_separate(#[case] input: &str, #[case] expected: &[&str]) {
        check!(tokens(input) == expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\n\t")]
    #[case("!?.,;")]
    fn test_empty_and_separator_only(#[case] input: &str) {
        check!(tokenize(input).is_empty());
        check!(term_counts(input).is_empty());
    }

    #[rstest]
    #[case("Learn Hangul: 한글 the FAST way, fast!")]
    #[case("particles 은/는 vs 이/가")]
    #[case("a b c a b c")]
    fn test_tokenize_is_idempotent(#[case] input: &str) {
        let once = tokenize(input);
        check!(tokenize(&once.phrase()) == once);
    }

    #[test]
    fn test_term_counts_keeps_duplicates() {
        let counts = term_counts("grammar Grammar GRAMMAR 문법 문법");
        check!(counts.get("grammar") == Some(&3));
        check!(counts.get("문법") == Some(&2));
        check!(counts.len() == 2);
    }

    #[test]
    fn test_phrase_uses_first_seen_order() {
        check!(tokenize("basic greetings basic").phrase() == "basic greetings");
    }
}

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with", "this", "but", "they", "have",
    "had", "what", "when", "where", "who", "which", "why", "how", "all", "each", "every", "both",
    "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same",
    "so", "than", "too", "very", "can", "just", "should", "now",
];

// non-word characters and underscores both become spaces before splitting
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\W_]+").unwrap());

/// Normalizes raw text into index terms. The same tokenizer runs over
/// documents at build time and over queries at search time; the two must
/// agree or lookups go cold.
pub struct SearchTokenizer {
    stop_word_set: HashSet<&'static str>,
    stemmer: Stemmer,
    remove_stopwords: bool,
    stem: bool,
}

impl SearchTokenizer {
    pub fn new() -> Self {
        Self::with_flags(true, true)
    }

    /// Stopword removal and stemming can be switched off independently,
    /// which tiny fixture collections rely on.
    pub fn with_flags(remove_stopwords: bool, stem: bool) -> Self {
        Self {
            stop_word_set: STOP_WORDS.iter().copied().collect(),
            stemmer: Stemmer::create(Algorithm::English),
            remove_stopwords,
            stem,
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let cleaned = clean_text(text);
        cleaned
            .split_whitespace()
            .filter(|word| !self.remove_stopwords || !self.stop_word_set.contains(word))
            .map(|word| {
                if self.stem {
                    self.stemmer.stem(word).into_owned()
                } else {
                    word.to_string()
                }
            })
            .collect()
    }
}

impl Default for SearchTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn clean_text(text: &str) -> String {
    let spaced = NON_WORD.replace_all(text, " ");
    spaced.trim().to_lowercase()
}

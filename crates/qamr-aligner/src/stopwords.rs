//! Stopword filtering
//!
//! Decides which phrase tokens are "ignorable" during alignment: stopwords
//! from the NLTK lists of the `stop-words` crate, punctuation-only tokens
//! and contractions. The NLTK lists hold function words only, so verbs such
//! as "said" stay alignable.

use rustc_hash::FxHashSet;
use stop_words::{get, LANGUAGE};

/// A filter for ignorable tokens
#[derive(Debug, Clone)]
pub struct StopwordFilter {
    /// Set of stopwords (lowercase)
    stopwords: FxHashSet<String>,
}

impl Default for StopwordFilter {
    fn default() -> Self {
        Self::new("en")
    }
}

impl StopwordFilter {
    /// Create a new stopword filter for the given language
    pub fn new(language: &str) -> Self {
        Self {
            stopwords: Self::load_stopwords(language),
        }
    }

    /// Create a stopword filter from a custom list
    pub fn from_list(words: &[&str]) -> Self {
        Self {
            stopwords: words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    /// Add additional stopwords to the filter
    pub fn add_stopwords<S: AsRef<str>>(&mut self, words: &[S]) {
        for word in words {
            self.stopwords.insert(word.as_ref().to_lowercase());
        }
    }

    /// Check if a word is a listed stopword (case-insensitive)
    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(&word.to_lowercase())
    }

    /// Stopword in the extended sense used by the aligner: listed
    /// stopwords, contractions (leading apostrophe) and tokens made only of
    /// punctuation.
    pub fn is_ignorable(&self, word: &str) -> bool {
        word.starts_with('\'')
            || word.chars().all(|c| c.is_ascii_punctuation())
            || self.is_stopword(word)
    }

    pub fn len(&self) -> usize {
        self.stopwords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stopwords.is_empty()
    }

    fn load_stopwords(language: &str) -> FxHashSet<String> {
        let lang = match language.to_lowercase().as_str() {
            "de" | "german" => LANGUAGE::German,
            "fr" | "french" => LANGUAGE::French,
            "es" | "spanish" => LANGUAGE::Spanish,
            "it" | "italian" => LANGUAGE::Italian,
            "pt" | "portuguese" => LANGUAGE::Portuguese,
            "nl" | "dutch" => LANGUAGE::Dutch,
            _ => LANGUAGE::English,
        };

        get(lang)
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

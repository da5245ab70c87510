//! Lemmatization seam
//!
//! Lemmas come from an external annotator. Implementations receive the
//! whole phrase so they can tag it first and key each lemma on its coarse
//! part of speech.

use serde::{Deserialize, Serialize};

/// Coarse part of speech used to key lemma lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoarsePos {
    Noun,
    Verb,
    Adjective,
    Adverb,
}

impl CoarsePos {
    /// Map a Penn Treebank tag to its coarse class; unknown tags are nouns
    pub fn from_treebank(tag: &str) -> Self {
        match tag.chars().next() {
            Some('J') => Self::Adjective,
            Some('V') => Self::Verb,
            Some('R') => Self::Adverb,
            _ => Self::Noun,
        }
    }
}

/// Trait for phrase lemmatizers
pub trait Lemmatizer: Send + Sync {
    /// Return one lemma per input token
    fn lemmatize_phrase(&self, tokens: &[String]) -> Vec<String>;
}

/// Case-insensitive identity lemmatizer
#[derive(Debug, Clone, Copy, Default)]
pub struct LowercaseLemmatizer;

impl Lemmatizer for LowercaseLemmatizer {
    fn lemmatize_phrase(&self, tokens: &[String]) -> Vec<String> {
        tokens.iter().map(|t| t.to_lowercase()).collect()
    }
}

//! QAMR Core - Domain models, errors and shared types
//!
//! This crate defines the core abstractions used throughout the QAMR graph system:
//! - Token spans over a sentence and their containment/crossing relations
//! - Question labels and label sets attached to relations
//! - Sentences with their crowd-sourced, aligned QA pairs
//! - Common error types
//! - Configuration management
//! - Reading of aligned annotation rows

pub mod config;
pub mod loader;

pub use config::{AlignerConfig, AppConfig, ConfigError, InductionConfig, LoggingConfig};
pub use loader::{AnnotationRow, SentenceReader};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for QAMR operations
#[derive(Error, Debug)]
pub enum QamrError {
    #[error("Invalid span [{start}, {end}) for sentence of length {len}")]
    InvalidSpan { start: usize, end: usize, len: usize },

    #[error("Invalid alignment markup: {0}")]
    InvalidMarkup(String),

    #[error("Alignment index {index} out of range for sentence of length {len}")]
    AlignmentOutOfRange { index: usize, len: usize },

    #[error("Malformed input row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, QamrError>;

/// Identifier of the crowd worker who wrote a QA pair
pub type WorkerId = String;

// ============================================================================
// Spans
// ============================================================================

/// A half-open token interval `[start, end)` within one sentence
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a span. Callers guarantee `start < end`.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start < end, "empty span [{start}, {end})");
        Self { start, end }
    }

    /// Create a span checked against a sentence length
    pub fn checked(start: usize, end: usize, len: usize) -> Result<Self> {
        if start < end && end <= len {
            Ok(Self { start, end })
        } else {
            Err(QamrError::InvalidSpan { start, end, len })
        }
    }

    /// Smallest span covering all of the given token indices
    pub fn covering(indices: &[usize]) -> Option<Self> {
        let start = *indices.iter().min()?;
        let end = *indices.iter().max()? + 1;
        Some(Self { start, end })
    }

    /// Number of tokens in the span
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Spans are never empty; provided for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True iff `self` lies within `other` (inclusive: a span is its own subchunk)
    pub fn is_subchunk_of(&self, other: &Span) -> bool {
        self.start >= other.start && self.end <= other.end
    }

    /// True iff `self` lies within `other` and differs from it
    pub fn is_strict_subchunk_of(&self, other: &Span) -> bool {
        self != other && self.is_subchunk_of(other)
    }

    /// True iff the spans partially overlap without one containing the other
    pub fn crosses(&self, other: &Span) -> bool {
        non_projective((self.start, self.end), (other.start, other.end))
    }

    /// The tokens covered by this span, joined by single spaces
    pub fn text(&self, tokens: &[String]) -> String {
        let end = self.end.min(tokens.len());
        let start = self.start.min(end);
        tokens[start..end].join(" ")
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.start, self.end)
    }
}

/// Returns true iff the two arcs over sentence positions interleave.
///
/// Arcs sharing an endpoint are never non-projective. Otherwise the four
/// endpoints are sorted and the arcs interleave when the first and third
/// positions belong to the same arc.
pub fn non_projective(a: (usize, usize), b: (usize, usize)) -> bool {
    let points = [a.0, a.1, b.0, b.1];
    let distinct: HashSet<usize> = points.iter().copied().collect();
    if distinct.len() != 4 {
        return false;
    }

    let mut tagged = [(a.0, 0u8), (a.1, 0), (b.0, 1), (b.1, 1)];
    tagged.sort_by_key(|(pos, _)| *pos);
    tagged[0].1 == tagged[2].1
}

// ============================================================================
// Labels
// ============================================================================

/// A relation label: the ordered tokens of the question that asserted it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(Vec<String>);

impl Label {
    /// Build a label from question tokens, dropping question marks
    pub fn from_question<S: AsRef<str>>(tokens: &[S]) -> Self {
        Self(
            tokens
                .iter()
                .map(|t| t.as_ref())
                .filter(|t| *t != "?")
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for Label {
    fn from(tokens: Vec<String>) -> Self {
        Self(tokens)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

/// Distinct labels in first-seen order; the first one is the primary label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(Vec<Label>);

impl LabelSet {
    pub fn new(label: Label) -> Self {
        Self(vec![label])
    }

    /// Add a label unless an equal one is already present
    pub fn insert(&mut self, label: Label) -> bool {
        if self.0.contains(&label) {
            return false;
        }
        self.0.push(label);
        true
    }

    /// Merge another set into this one, keeping order
    pub fn merge(&mut self, other: &LabelSet) {
        for label in &other.0 {
            self.insert(label.clone());
        }
    }

    pub fn primary(&self) -> Option<&Label> {
        self.0.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Aligned QA pairs
// ============================================================================

/// One question/answer token together with its grounding in the sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedToken {
    /// The token as written by the worker
    pub text: String,

    /// Sentence index this token was grounded to, if any
    pub target: Option<usize>,
}

impl AlignedToken {
    /// Parse one token of the alignment markup.
    ///
    /// Mapped tokens are written `{{<index>|<word>}}`; anything else is an
    /// unmapped token written verbatim.
    pub fn parse(raw: &str) -> Result<Self> {
        if let Some(inner) = raw
            .strip_prefix("{{")
            .and_then(|rest| rest.strip_suffix("}}"))
        {
            let (index, word) = inner
                .split_once('|')
                .ok_or_else(|| QamrError::InvalidMarkup(raw.to_string()))?;
            let index = index
                .trim()
                .parse::<usize>()
                .map_err(|_| QamrError::InvalidMarkup(raw.to_string()))?;
            return Ok(Self {
                text: word.to_string(),
                target: Some(index),
            });
        }

        Ok(Self {
            text: raw.to_string(),
            target: None,
        })
    }

    pub fn is_mapped(&self) -> bool {
        self.target.is_some()
    }
}

/// A crowd-sourced question/answer pair over a sentence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaPair {
    pub worker_id: WorkerId,

    /// Free-form marker column carried through from the input
    pub special_word: String,

    /// Question tokens with question marks removed
    pub raw_question: Vec<String>,

    /// Question as written, used for consolidation
    pub raw_question_str: String,

    pub raw_answer: Vec<String>,

    pub raw_answer_str: String,

    /// Question tokens grounded in the sentence (question marks removed)
    pub aligned_question: Vec<AlignedToken>,

    /// Answer tokens grounded in the sentence
    pub aligned_answer: Vec<AlignedToken>,
}

impl QaPair {
    /// Build a QA pair from whitespace-tokenized input columns
    pub fn new(
        worker_id: impl Into<WorkerId>,
        special_word: impl Into<String>,
        raw_question: &[String],
        raw_answer: &[String],
        aligned_question: &[String],
        aligned_answer: &[String],
    ) -> Result<Self> {
        let question: Vec<String> = raw_question
            .iter()
            .filter(|t| t.as_str() != "?")
            .cloned()
            .collect();

        let aligned_question = aligned_question
            .iter()
            .filter(|t| !t.contains('?'))
            .map(|t| AlignedToken::parse(t))
            .collect::<Result<Vec<_>>>()?;

        let aligned_answer = aligned_answer
            .iter()
            .map(|t| AlignedToken::parse(t))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            worker_id: worker_id.into(),
            special_word: special_word.into(),
            raw_question_str: raw_question.join(" "),
            raw_question: question,
            raw_answer_str: raw_answer.join(" "),
            raw_answer: raw_answer.to_vec(),
            aligned_question,
            aligned_answer,
        })
    }

    /// The relation label asserted by this pair
    pub fn label(&self) -> Label {
        Label::from_question(&self.raw_question)
    }

    /// Sentence indices of the mapped answer tokens
    pub fn answer_indices(&self) -> Vec<usize> {
        self.aligned_answer.iter().filter_map(|t| t.target).collect()
    }

    /// Sentence indices of the question tokens, `None` marking a gap
    pub fn question_targets(&self) -> Vec<Option<usize>> {
        self.aligned_question.iter().map(|t| t.target).collect()
    }
}

// ============================================================================
// Sentences
// ============================================================================

/// A tokenized sentence with external per-token tags and its QA pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentence {
    pub id: String,
    pub tokens: Vec<String>,
    pub tags: Vec<String>,
    qa_pairs: Vec<QaPair>,
    /// Distinct workers in first-seen order
    workers: Vec<WorkerId>,
}

impl Sentence {
    /// Create a sentence without QA pairs
    pub fn new(id: impl Into<String>, tokens: Vec<String>, tags: Vec<String>) -> Self {
        Self {
            id: id.into(),
            tokens,
            tags,
            qa_pairs: Vec::new(),
            workers: Vec::new(),
        }
    }

    /// Convenience constructor from whitespace-separated text
    pub fn from_text(id: impl Into<String>, text: &str) -> Self {
        Self::new(
            id,
            text.split_whitespace().map(str::to_string).collect(),
            Vec::new(),
        )
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Add a QA pair; every grounded index must fall inside the sentence
    pub fn add_qa_pair(&mut self, qa: QaPair) -> Result<()> {
        let len = self.tokens.len();
        if let Some(index) = qa
            .aligned_question
            .iter()
            .chain(qa.aligned_answer.iter())
            .filter_map(|t| t.target)
            .find(|&i| i >= len)
        {
            return Err(QamrError::AlignmentOutOfRange { index, len });
        }

        if !self.workers.contains(&qa.worker_id) {
            self.workers.push(qa.worker_id.clone());
        }
        self.qa_pairs.push(qa);
        Ok(())
    }

    pub fn qa_pairs(&self) -> &[QaPair] {
        &self.qa_pairs
    }

    pub fn workers(&self) -> &[WorkerId] {
        &self.workers
    }

    /// QA pairs written by the first `limit` workers (all when `None`)
    pub fn qa_pairs_for_workers(&self, limit: Option<usize>) -> Vec<&QaPair> {
        match limit {
            None => self.qa_pairs.iter().collect(),
            Some(n) => {
                let allowed: HashSet<&WorkerId> = self.workers.iter().take(n).collect();
                self.qa_pairs
                    .iter()
                    .filter(|qa| allowed.contains(&qa.worker_id))
                    .collect()
            }
        }
    }

    /// Keep a single QA pair per distinct question: the one with the
    /// longest answer text. First occurrence wins ties.
    pub fn consolidate_questions(&mut self) {
        let mut seen: Vec<&str> = Vec::new();
        let mut kept: Vec<QaPair> = Vec::new();

        for qa in &self.qa_pairs {
            if seen.contains(&qa.raw_question_str.as_str()) {
                continue;
            }
            seen.push(&qa.raw_question_str);

            let mut best = qa;
            for other in self
                .qa_pairs
                .iter()
                .filter(|o| o.raw_question_str == qa.raw_question_str)
            {
                if other.raw_answer_str.len() > best.raw_answer_str.len() {
                    best = other;
                }
            }
            kept.push(best.clone());
        }

        self.qa_pairs = kept;
    }
}

impl std::fmt::Display for Sentence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

/// Split a whitespace-tokenized column into tokens
pub fn tokenize(column: &str) -> Vec<String> {
    column.split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        tokenize(s)
    }

    #[test]
    fn test_subchunk_inclusive() {
        assert!(Span::new(2, 4).is_subchunk_of(&Span::new(1, 5)));
        assert!(Span::new(2, 4).is_subchunk_of(&Span::new(2, 4)));
        assert!(!Span::new(2, 4).is_strict_subchunk_of(&Span::new(2, 4)));
        assert!(!Span::new(0, 4).is_subchunk_of(&Span::new(1, 5)));
    }

    #[test]
    fn test_crossing_spans() {
        assert!(Span::new(0, 2).crosses(&Span::new(1, 3)));
        assert!(Span::new(1, 3).crosses(&Span::new(0, 2)));
        // Adjacent spans share an endpoint
        assert!(!Span::new(0, 2).crosses(&Span::new(2, 4)));
        // Nested spans
        assert!(!Span::new(0, 5).crosses(&Span::new(1, 3)));
        assert!(!Span::new(0, 5).crosses(&Span::new(0, 3)));
        // Disjoint spans
        assert!(!Span::new(0, 1).crosses(&Span::new(3, 4)));
    }

    #[test]
    fn test_non_projective_arcs() {
        assert!(non_projective((0, 6), (4, 7)));
        assert!(!non_projective((0, 6), (1, 3)));
        assert!(!non_projective((2, 11), (11, 14)));
    }

    #[test]
    fn test_span_checked_and_covering() {
        assert!(Span::checked(0, 3, 3).is_ok());
        assert!(Span::checked(2, 2, 3).is_err());
        assert!(Span::checked(1, 4, 3).is_err());
        assert_eq!(Span::covering(&[5, 3, 4]), Some(Span::new(3, 6)));
        assert_eq!(Span::covering(&[]), None);
    }

    #[test]
    fn test_span_text() {
        let tokens = toks("Albert Einstein said that stupidity is infinite");
        assert_eq!(Span::new(0, 2).text(&tokens), "Albert Einstein");
        assert_eq!(Span::new(3, 7).len(), 4);
    }

    #[test]
    fn test_aligned_token_parse() {
        let mapped = AlignedToken::parse("{{3|that}}").unwrap();
        assert_eq!(mapped.target, Some(3));
        assert_eq!(mapped.text, "that");

        let pipe_word = AlignedToken::parse("{{4|a|b}}").unwrap();
        assert_eq!(pipe_word.text, "a|b");

        let unmapped = AlignedToken::parse("What").unwrap();
        assert_eq!(unmapped.target, None);

        assert!(AlignedToken::parse("{{x|that}}").is_err());
        assert!(AlignedToken::parse("{{3that}}").is_err());
    }

    #[test]
    fn test_label_strips_question_marks() {
        let label = Label::from_question(&toks("What did Albert Einstein say ?"));
        assert_eq!(label.to_string(), "What did Albert Einstein say");
    }

    #[test]
    fn test_label_set_dedup() {
        let a = Label::from(toks("who said"));
        let b = Label::from(toks("what was said"));
        let mut set = LabelSet::new(a.clone());
        assert!(!set.insert(a.clone()));
        assert!(set.insert(b));
        assert_eq!(set.len(), 2);
        assert_eq!(set.primary(), Some(&a));
    }

    fn qa(worker: &str, question: &str, answer: &str, aq: &str, aa: &str) -> QaPair {
        QaPair::new(worker, "", &toks(question), &toks(answer), &toks(aq), &toks(aa)).unwrap()
    }

    #[test]
    fn test_qa_pair_strips_question_mark_tokens() {
        let pair = qa(
            "w1",
            "What did Albert Einstein say ?",
            "that stupidity is infinite",
            "What did {{0|Albert}} {{1|Einstein}} say ?",
            "{{3|that}} {{4|stupidity}} {{5|is}} {{6|infinite}}",
        );
        assert_eq!(pair.raw_question.len(), 5);
        assert_eq!(pair.aligned_question.len(), 5);
        assert_eq!(pair.answer_indices(), vec![3, 4, 5, 6]);
        assert_eq!(
            pair.question_targets(),
            vec![None, None, Some(0), Some(1), None]
        );
    }

    #[test]
    fn test_add_qa_pair_rejects_out_of_range() {
        let mut sentence = Sentence::from_text("s1", "a b c");
        let bad = qa("w1", "what ?", "c", "what", "{{7|c}}");
        assert!(matches!(
            sentence.add_qa_pair(bad),
            Err(QamrError::AlignmentOutOfRange { index: 7, len: 3 })
        ));
    }

    #[test]
    fn test_consolidate_keeps_longest_answer() {
        let mut sentence = Sentence::from_text("s1", "a b c d");
        sentence.add_qa_pair(qa("w1", "what b ?", "c", "what {{1|b}}", "{{2|c}}")).unwrap();
        sentence
            .add_qa_pair(qa("w2", "what b ?", "c d", "what {{1|b}}", "{{2|c}} {{3|d}}"))
            .unwrap();
        sentence.add_qa_pair(qa("w2", "who a ?", "d", "who {{0|a}}", "{{3|d}}")).unwrap();

        sentence.consolidate_questions();

        let pairs = sentence.qa_pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].raw_answer_str, "c d");
        assert_eq!(pairs[1].raw_question_str, "who a ?");
    }

    #[test]
    fn test_worker_limit() {
        let mut sentence = Sentence::from_text("s1", "a b c d");
        sentence.add_qa_pair(qa("w1", "what b ?", "c", "what {{1|b}}", "{{2|c}}")).unwrap();
        sentence.add_qa_pair(qa("w2", "who a ?", "d", "who {{0|a}}", "{{3|d}}")).unwrap();

        assert_eq!(sentence.qa_pairs_for_workers(None).len(), 2);
        let limited = sentence.qa_pairs_for_workers(Some(1));
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].worker_id, "w1");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn arb_span() -> impl Strategy<Value = Span> {
            (0usize..12, 1usize..6).prop_map(|(s, l)| Span::new(s, s + l))
        }

        proptest! {
            #[test]
            fn crossing_is_symmetric(a in arb_span(), b in arb_span()) {
                prop_assert_eq!(a.crosses(&b), b.crosses(&a));
            }

            #[test]
            fn nested_spans_never_cross(a in arb_span(), b in arb_span()) {
                if a.is_subchunk_of(&b) || b.is_subchunk_of(&a) {
                    prop_assert!(!a.crosses(&b));
                }
            }

            #[test]
            fn non_projectivity_is_symmetric(
                a in (0usize..10, 0usize..10),
                b in (0usize..10, 0usize..10),
            ) {
                prop_assert_eq!(non_projective(a, b), non_projective(b, a));
            }
        }
    }
}

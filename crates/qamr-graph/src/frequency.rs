//! Predicate scoring
//!
//! Counts how often each minimal span acts as a relation source versus how
//! often it occurs in any relation, and ranks minimal spans by the score.

use std::collections::BTreeMap;

use qamr_core::{InductionConfig, Span};
use serde::Serialize;

use crate::catalog::QaRelation;
use crate::subchunk::SubchunkMap;

/// Occurrence counts of one minimal span
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChunkFrequency {
    /// Occurrences inside a candidate source
    pub as_source: usize,

    /// Occurrences inside any source or destination
    pub total: usize,
}

/// A minimal span with its text and predicate score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedChunk {
    pub span: Span,
    pub text: String,
    pub score: f64,
}

/// Per-sentence predicate scorer
#[derive(Debug, Clone)]
pub struct FrequencyScorer {
    counts: BTreeMap<Span, ChunkFrequency>,
    sentence_len: usize,
    prob_weight: f64,
    prom_weight: f64,
}

impl FrequencyScorer {
    /// Count occurrences of the minimal spans of every relation
    pub fn new(relations: &[QaRelation], subchunks: &SubchunkMap, sentence_len: usize) -> Self {
        let mut counts: BTreeMap<Span, ChunkFrequency> = BTreeMap::new();

        for relation in relations {
            for source in &relation.sources {
                for minimal in subchunks.minimal_spans(source).into_iter().flatten() {
                    let entry = counts.entry(*minimal).or_default();
                    entry.as_source += 1;
                    entry.total += 1;
                }
            }

            for minimal in subchunks
                .minimal_spans(&relation.destination)
                .into_iter()
                .flatten()
            {
                counts.entry(*minimal).or_default().total += 1;
            }
        }

        Self {
            counts,
            sentence_len,
            prob_weight: 1.0,
            prom_weight: 0.0,
        }
    }

    /// Set the score weights
    pub fn with_weights(mut self, prob_weight: f64, prom_weight: f64) -> Self {
        self.prob_weight = prob_weight;
        self.prom_weight = prom_weight;
        self
    }

    /// Take the score weights from the induction configuration
    pub fn with_config(self, config: &InductionConfig) -> Self {
        self.with_weights(config.prob_weight, config.prom_weight)
    }

    pub fn frequency(&self, span: &Span) -> Option<ChunkFrequency> {
        self.counts.get(span).copied()
    }

    /// Predicate score of a counted minimal span
    pub fn score(&self, span: &Span) -> Option<f64> {
        self.counts.get(span).map(|freq| self.score_counts(freq))
    }

    fn score_counts(&self, freq: &ChunkFrequency) -> f64 {
        let prob = if freq.total == 0 {
            0.0
        } else {
            freq.as_source as f64 / freq.total as f64
        };
        let prom = if self.sentence_len == 0 {
            0.0
        } else {
            freq.as_source as f64 / self.sentence_len as f64
        };
        self.prob_weight * prob + self.prom_weight * prom
    }

    /// All counted minimal spans, highest score first.
    ///
    /// Spans are laid out by (start, end) before a stable sort on the
    /// score, so equal scores keep sentence order.
    pub fn chunk_prob(&self, tokens: &[String]) -> Vec<RankedChunk> {
        let mut ranked: Vec<RankedChunk> = self
            .counts
            .iter()
            .map(|(span, freq)| RankedChunk {
                span: *span,
                text: span.text(tokens),
                score: self.score_counts(freq),
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }
}

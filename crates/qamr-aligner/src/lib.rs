//! QAMR Aligner - Grounding of QA tokens onto sentence positions
//!
//! Crowd-sourced questions and answers are free text. This crate grounds
//! each of their tokens onto at most one sentence position:
//! - Exact and fuzzy word matching against the sentence
//! - Stopword and punctuation filtering
//! - A global assignment keeping grounded positions clustered and injective
//! - Rendering of alignments in the `{{index|word}}` markup

pub mod aligner;
pub mod fuzzy;
pub mod lemma;
pub mod markup;
pub mod solver;
pub mod stopwords;

pub use aligner::WordAligner;
pub use lemma::{CoarsePos, Lemmatizer, LowercaseLemmatizer};
pub use markup::format_alignment;
pub use solver::{BruteForceSolver, GreedyCentroidSolver};
pub use stopwords::StopwordFilter;

use serde::Serialize;

/// Per-token sentence index of a phrase, `None` where the token is unmapped
pub type Alignment = Vec<Option<usize>>;

/// Alignment of one QA pair against its sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QaAlignment {
    pub question: Alignment,
    pub answer: Alignment,
}

/// Trait for assignment solvers
///
/// Receives one non-empty candidate list per phrase token and returns one
/// chosen value per token. Non-negative values are sentence positions and
/// must not repeat; negative values mean "leave unmapped".
pub trait AssignmentSolver: Send + Sync {
    fn solve(&self, candidates: &[Vec<i64>]) -> Option<Vec<i64>>;

    /// Solver name for logging
    fn name(&self) -> &str;
}

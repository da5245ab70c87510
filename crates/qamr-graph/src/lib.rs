//! QAMR Graph - Structure induction over QA-annotated sentences
//!
//! Reconciles the per-QA candidate relations of a sentence into a single
//! non-crossing, consistently nested predicate-argument graph:
//! - Span collection and minimal-span decomposition
//! - Frequency-based predicate scoring
//! - Greedy constrained edge acceptance
//! - Edge disambiguation and head resolution
//! - Optional split of multi-word nodes by dependency parse

pub mod catalog;
pub mod disambiguate;
pub mod frequency;
pub mod graph;
pub mod heads;
pub mod inducer;
pub mod pas;
pub mod pipeline;
pub mod subchunk;
pub mod words;

pub use catalog::{QaRelation, SpanCatalog};
pub use disambiguate::{disambiguate, DirectedEdge};
pub use frequency::{ChunkFrequency, FrequencyScorer, RankedChunk};
pub use graph::{EdgeData, SentenceGraph};
pub use heads::HeadResolver;
pub use inducer::{EdgeOption, GraphInducer, Induction, InductionStats, Rejection, UndirectedGraph};
pub use pas::{split_by_predicate, Argument, PredicateArgument};
pub use pipeline::{EdgeView, NodeView, SentenceStructure, StructureInducer};
pub use subchunk::{identify_subchunks, SubchunkMap};
pub use words::{DependencyArc, DependencyParser, WordSplitter};

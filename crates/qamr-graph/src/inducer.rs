//! Graph induction
//!
//! Greedily accepts candidate relations, source by source in predicate-score
//! order, as long as the accepted graph stays non-crossing and consistently
//! nested (and optionally projective).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use qamr_core::{non_projective, Label, LabelSet, Span, WorkerId};
use serde::Serialize;

use crate::catalog::QaRelation;
use crate::frequency::RankedChunk;

// ============================================================================
// Statistics
// ============================================================================

/// Why a candidate edge was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Source and destination are the same span
    SelfLoop,
    /// Interleaves with an accepted edge
    NonProjective,
    /// An endpoint crosses an accepted node
    CrossesNode,
    /// Source and destination cross each other
    SelfCrossing,
    /// Endpoints would end up in different enclosing spans
    Nesting,
}

/// Per-run accumulator of induction decisions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InductionStats {
    pub candidates: usize,
    pub accepted: usize,
    pub rejected_self_loop: usize,
    pub rejected_non_projective: usize,
    pub rejected_crossing: usize,
    pub rejected_self_crossing: usize,
    pub rejected_nesting: usize,
    pub relations_consumed: usize,
    pub relations_unconsumed: usize,
    pub empty_answers: usize,
    pub sourceless_questions: usize,
}

impl InductionStats {
    pub fn record_rejection(&mut self, reason: Rejection) {
        match reason {
            Rejection::SelfLoop => self.rejected_self_loop += 1,
            Rejection::NonProjective => self.rejected_non_projective += 1,
            Rejection::CrossesNode => self.rejected_crossing += 1,
            Rejection::SelfCrossing => self.rejected_self_crossing += 1,
            Rejection::Nesting => self.rejected_nesting += 1,
        }
    }

    pub fn rejected(&self) -> usize {
        self.rejected_self_loop
            + self.rejected_non_projective
            + self.rejected_crossing
            + self.rejected_self_crossing
            + self.rejected_nesting
    }
}

// ============================================================================
// Undirected graph of options
// ============================================================================

/// One proposed direction and label for an undirected edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeOption {
    pub source: Span,
    pub target: Span,
    pub labels: LabelSet,
    pub worker: WorkerId,
}

/// Accepted pairs, each carrying every option proposed between them
#[derive(Debug, Clone, Default)]
pub struct UndirectedGraph {
    edges: BTreeMap<(Span, Span), Vec<EdgeOption>>,
}

impl UndirectedGraph {
    pub fn add_option(&mut self, option: EdgeOption) {
        let key = if option.source <= option.target {
            (option.source, option.target)
        } else {
            (option.target, option.source)
        };
        self.edges.entry(key).or_default().push(option);
    }

    /// Options recorded between two spans, in either direction
    pub fn options(&self, a: Span, b: Span) -> Option<&[EdgeOption]> {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.edges.get(&key).map(Vec::as_slice)
    }

    /// Unordered pairs with their options, ordered by pair
    pub fn iter(&self) -> impl Iterator<Item = (&(Span, Span), &Vec<EdgeOption>)> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

// ============================================================================
// Inducer
// ============================================================================

/// Result of one induction run
#[derive(Debug, Clone, Default)]
pub struct Induction {
    /// Accepted edges in acceptance order
    pub edges: Vec<EdgeOption>,
    pub nodes: BTreeSet<Span>,
    /// Source of the first accepted edge
    pub head: Option<Span>,
    pub graph: UndirectedGraph,
}

/// Greedy, order-dependent edge acceptance
#[derive(Debug, Clone)]
pub struct GraphInducer<'a> {
    ranking: &'a [RankedChunk],
    sentence_len: usize,
    projective: bool,
}

impl<'a> GraphInducer<'a> {
    pub fn new(ranking: &'a [RankedChunk], sentence_len: usize) -> Self {
        Self {
            ranking,
            sentence_len,
            projective: false,
        }
    }

    /// Reject edges interleaving with accepted ones
    pub fn with_projective(mut self, projective: bool) -> Self {
        self.projective = projective;
        self
    }

    /// Consume the relations, one ranked source at a time.
    ///
    /// Each relation is consumed by the first ranked span among its sources;
    /// relations whose sources never appear in the ranking stay unconsumed.
    pub fn induce(&self, relations: &[QaRelation], stats: &mut InductionStats) -> Induction {
        let rank: HashMap<Span, usize> = self
            .ranking
            .iter()
            .enumerate()
            .map(|(i, chunk)| (chunk.span, i))
            .collect();

        let mut remaining: Vec<&QaRelation> = relations.iter().collect();
        let mut induction = Induction::default();

        for chunk in self.ranking {
            let src = chunk.span;
            let participating: Vec<&QaRelation> = remaining
                .iter()
                .copied()
                .filter(|rel| rel.has_source(&src))
                .collect();
            if participating.is_empty() {
                continue;
            }

            let mut candidates: Vec<(Span, &Label, &WorkerId)> = participating
                .iter()
                .map(|rel| (rel.destination, &rel.label, &rel.worker))
                .collect();
            candidates.extend(participating.iter().flat_map(|rel| {
                rel.sources
                    .iter()
                    .filter(|s| **s != src)
                    .map(move |s| (*s, &rel.label, &rel.worker))
            }));
            // Wider destinations first
            candidates.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

            for (dst, label, worker) in candidates {
                stats.candidates += 1;
                if let Err(reason) = self.check(src, dst, &induction) {
                    tracing::debug!(%src, %dst, ?reason, "Rejected edge");
                    stats.record_rejection(reason);
                    continue;
                }

                let mut labels = LabelSet::new(label.clone());
                for rel in remaining.iter().filter(|rel| {
                    rel.destination == dst && most_probable_source(rel, &rank) == Some(src)
                }) {
                    labels.insert(rel.label.clone());
                }

                tracing::debug!(%src, %dst, labels = labels.len(), "Accepted edge");
                stats.accepted += 1;

                let edge = EdgeOption {
                    source: src,
                    target: dst,
                    labels,
                    worker: worker.clone(),
                };
                induction.head.get_or_insert(src);
                induction.nodes.insert(src);
                induction.nodes.insert(dst);
                induction.graph.add_option(edge.clone());
                induction.edges.push(edge);
            }

            stats.relations_consumed += participating.len();
            remaining.retain(|rel| !rel.has_source(&src));
        }

        stats.relations_unconsumed += remaining.len();
        induction
    }

    fn check(
        &self,
        src: Span,
        dst: Span,
        induction: &Induction,
    ) -> std::result::Result<(), Rejection> {
        if src == dst {
            return Err(Rejection::SelfLoop);
        }

        if self.projective
            && induction
                .edges
                .iter()
                .any(|e| non_projective((src.start, dst.start), (e.source.start, e.target.start)))
        {
            return Err(Rejection::NonProjective);
        }

        if induction
            .nodes
            .iter()
            .any(|n| n.crosses(&src) || n.crosses(&dst))
        {
            return Err(Rejection::CrossesNode);
        }

        if src.crosses(&dst) {
            return Err(Rejection::SelfCrossing);
        }

        let mut nodes = induction.nodes.clone();
        nodes.insert(src);
        nodes.insert(dst);
        let nested = induction
            .edges
            .iter()
            .map(|e| (e.source, e.target))
            .chain(std::iter::once((src, dst)))
            .all(|(s, t)| {
                surrounding_span(s, &nodes, self.sentence_len)
                    == surrounding_span(t, &nodes, self.sentence_len)
            });
        if !nested {
            return Err(Rejection::Nesting);
        }

        Ok(())
    }
}

/// The first source of a relation in ranking order
fn most_probable_source(relation: &QaRelation, rank: &HashMap<Span, usize>) -> Option<Span> {
    relation
        .sources
        .iter()
        .filter_map(|s| rank.get(s).map(|r| (*r, *s)))
        .min_by_key(|(r, _)| *r)
        .map(|(_, s)| s)
}

/// Smallest node strictly enclosing `span`, or the whole sentence
pub fn surrounding_span(span: Span, nodes: &BTreeSet<Span>, sentence_len: usize) -> Span {
    nodes
        .iter()
        .filter(|n| span.is_strict_subchunk_of(n))
        .min_by_key(|n| n.len())
        .copied()
        .unwrap_or(Span {
            start: 0,
            end: sentence_len,
        })
}

//! Span catalog
//!
//! Turns the aligned QA pairs of one sentence into candidate relations and
//! the universe of spans they mention.

use std::collections::BTreeSet;

use qamr_core::{Label, QaPair, Sentence, Span, WorkerId};
use serde::Serialize;

/// One QA pair's contribution: a relation from one of several candidate
/// source spans (mentioned in the question) to the answer span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QaRelation {
    /// Candidate sources in question order, never empty
    pub sources: Vec<Span>,
    pub destination: Span,
    pub label: Label,
    pub worker: WorkerId,
}

impl QaRelation {
    pub fn new(
        sources: Vec<Span>,
        destination: Span,
        label: Label,
        worker: impl Into<WorkerId>,
    ) -> Self {
        Self {
            sources,
            destination,
            label,
            worker: worker.into(),
        }
    }

    /// True iff `span` is one of the candidate sources
    pub fn has_source(&self, span: &Span) -> bool {
        self.sources.contains(span)
    }
}

/// Distinct spans and candidate relations of one sentence
#[derive(Debug, Clone, Default)]
pub struct SpanCatalog {
    spans: BTreeSet<Span>,
    relations: Vec<QaRelation>,
    /// QA pairs dropped because no answer token was grounded
    empty_answers: usize,
    /// QA pairs whose question grounded nothing
    sourceless: usize,
}

impl SpanCatalog {
    /// Collect spans and relations from the QA pairs of the first
    /// `worker_limit` workers (all when `None`)
    pub fn collect(sentence: &Sentence, worker_limit: Option<usize>) -> Self {
        let mut catalog = Self::default();
        for qa in sentence.qa_pairs_for_workers(worker_limit) {
            catalog.add_qa_pair(qa);
        }

        tracing::debug!(
            sentence = %sentence.id,
            spans = catalog.spans.len(),
            relations = catalog.relations.len(),
            "Collected spans"
        );
        catalog
    }

    /// Build a catalog directly from relations
    pub fn from_relations(relations: Vec<QaRelation>) -> Self {
        let mut catalog = Self::default();
        for relation in relations {
            catalog.spans.insert(relation.destination);
            catalog.spans.extend(relation.sources.iter().copied());
            catalog.relations.push(relation);
        }
        catalog
    }

    fn add_qa_pair(&mut self, qa: &QaPair) {
        let Some(answer) = Span::covering(&qa.answer_indices()) else {
            tracing::warn!(
                worker = %qa.worker_id,
                question = %qa.raw_question_str,
                "Empty answer, dropping QA pair"
            );
            self.empty_answers += 1;
            return;
        };
        self.spans.insert(answer);

        let sources: Vec<Span> = split_on_gaps(&qa.question_targets())
            .iter()
            .flat_map(|run| split_consecutive(run))
            .filter_map(|run| Span::covering(&run))
            .collect();

        if sources.is_empty() {
            tracing::warn!(
                worker = %qa.worker_id,
                question = %qa.raw_question_str,
                "Question grounded no span, keeping answer span only"
            );
            self.sourceless += 1;
            return;
        }

        self.spans.extend(sources.iter().copied());
        self.relations
            .push(QaRelation::new(sources, answer, qa.label(), qa.worker_id.clone()));
    }

    /// All distinct spans, ordered by (start, end)
    pub fn spans(&self) -> Vec<Span> {
        self.spans.iter().copied().collect()
    }

    pub fn relations(&self) -> &[QaRelation] {
        &self.relations
    }

    pub fn empty_answers(&self) -> usize {
        self.empty_answers
    }

    pub fn sourceless(&self) -> usize {
        self.sourceless
    }
}

/// Split grounded question positions on unmapped tokens
pub fn split_on_gaps(targets: &[Option<usize>]) -> Vec<Vec<usize>> {
    let mut ret = Vec::new();
    let mut cur = Vec::new();
    for target in targets {
        match target {
            Some(i) => cur.push(*i),
            None if !cur.is_empty() => ret.push(std::mem::take(&mut cur)),
            None => {}
        }
    }
    if !cur.is_empty() {
        ret.push(cur);
    }
    ret
}

/// Split a run of positions into maximal runs rising by exactly one
pub fn split_consecutive(indices: &[usize]) -> Vec<Vec<usize>> {
    let mut ret = Vec::new();
    let mut cur: Vec<usize> = Vec::new();
    for &i in indices {
        match cur.last() {
            Some(&last) if i != last + 1 => {
                ret.push(std::mem::take(&mut cur));
                cur.push(i);
            }
            _ => cur.push(i),
        }
    }
    if !cur.is_empty() {
        ret.push(cur);
    }
    ret
}

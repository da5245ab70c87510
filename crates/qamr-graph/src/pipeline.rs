//! Per-sentence structure induction
//!
//! Runs span collection, subchunk indexing, predicate scoring, graph
//! induction, disambiguation, head resolution and the optional single-word
//! split in order, and exposes the result in a serializable form.

use std::sync::Arc;

use qamr_core::{InductionConfig, Sentence, Span, WorkerId};
use serde::Serialize;

use crate::catalog::SpanCatalog;
use crate::disambiguate::disambiguate;
use crate::frequency::{FrequencyScorer, RankedChunk};
use crate::graph::SentenceGraph;
use crate::heads::HeadResolver;
use crate::inducer::{GraphInducer, InductionStats};
use crate::pas::{split_by_predicate, PredicateArgument};
use crate::subchunk::identify_subchunks;
use crate::words::{DependencyParser, WordSplitter};

/// A graph node with its rendered text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// A graph edge with its labels and supporting workers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeView {
    pub source: Span,
    pub target: Span,
    /// Primary label
    pub label: String,
    pub labels: Vec<String>,
    pub workers: Vec<WorkerId>,
}

/// Induced structure of one sentence
#[derive(Debug, Clone, Serialize)]
pub struct SentenceStructure {
    pub sentence_id: String,
    pub tokens: Vec<String>,
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
    pub head: Option<Span>,
    /// Minimal spans by predicate score
    pub concepts: Vec<RankedChunk>,
    /// Predicate-argument structures before head resolution
    pub predicates: Vec<PredicateArgument>,
    pub stats: InductionStats,
    #[serde(skip)]
    graph: SentenceGraph,
}

impl SentenceStructure {
    /// The final graph
    pub fn graph(&self) -> &SentenceGraph {
        &self.graph
    }
}

/// Induces sentence structures under one configuration
#[derive(Clone, Default)]
pub struct StructureInducer {
    config: InductionConfig,
    parser: Option<Arc<dyn DependencyParser>>,
}

impl std::fmt::Debug for StructureInducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructureInducer")
            .field("config", &self.config)
            .field("parser", &self.parser.is_some())
            .finish()
    }
}

impl StructureInducer {
    pub fn new(config: InductionConfig) -> Self {
        Self {
            config,
            parser: None,
        }
    }

    /// Dependency parser for the single-word split
    pub fn with_parser(mut self, parser: Arc<dyn DependencyParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn config(&self) -> &InductionConfig {
        &self.config
    }

    /// Induce the structure of one sentence from its QA pairs
    pub fn induce(&self, sentence: &Sentence) -> SentenceStructure {
        let tokens = &sentence.tokens;

        let catalog = SpanCatalog::collect(sentence, self.config.worker_limit);
        let subchunks = identify_subchunks(&catalog.spans());
        let ranking = FrequencyScorer::new(catalog.relations(), &subchunks, sentence.len())
            .with_config(&self.config)
            .chunk_prob(tokens);

        let mut stats = InductionStats {
            empty_answers: catalog.empty_answers(),
            sourceless_questions: catalog.sourceless(),
            ..Default::default()
        };
        let induction = GraphInducer::new(&ranking, sentence.len())
            .with_projective(self.config.projective)
            .induce(catalog.relations(), &mut stats);

        let directed = disambiguate(&induction.graph);
        let mut graph = SentenceGraph::from_edges(&directed, induction.head);
        let predicates = split_by_predicate(&graph, &ranking, tokens);

        if self.config.resolve_heads {
            HeadResolver::new(&subchunks).resolve(&mut graph);
        }

        if self.config.single_words {
            match &self.parser {
                Some(parser) => {
                    WordSplitter::new(parser.as_ref(), tokens).split(&mut graph);
                }
                None => tracing::warn!(
                    sentence = %sentence.id,
                    "Single-word split requested without a dependency parser"
                ),
            }
        }

        tracing::debug!(
            sentence = %sentence.id,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            accepted = stats.accepted,
            rejected = stats.rejected(),
            "Induced structure"
        );

        let nodes = graph
            .nodes()
            .into_iter()
            .map(|span| NodeView {
                start: span.start,
                end: span.end,
                text: span.text(tokens),
            })
            .collect();

        let edges = graph
            .edges()
            .into_iter()
            .map(|(source, target, data)| EdgeView {
                source,
                target,
                label: data
                    .labels
                    .primary()
                    .map(|l| l.to_string())
                    .unwrap_or_default(),
                labels: data.labels.iter().map(|l| l.to_string()).collect(),
                workers: data.workers.clone(),
            })
            .collect();

        SentenceStructure {
            sentence_id: sentence.id.clone(),
            tokens: tokens.clone(),
            nodes,
            edges,
            head: graph.head(),
            concepts: ranking,
            predicates,
            stats,
            graph,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qamr_core::QaPair;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn einstein() -> Sentence {
        let mut sentence =
            Sentence::from_text("s1", "Albert Einstein said that stupidity is infinite");
        sentence
            .add_qa_pair(
                QaPair::new(
                    "w1",
                    "",
                    &toks("What did Albert Einstein say ?"),
                    &toks("that stupidity is infinite"),
                    &toks("What did {{0|Albert}} {{1|Einstein}} say ?"),
                    &toks("{{3|that}} {{4|stupidity}} {{5|is}} {{6|infinite}}"),
                )
                .unwrap(),
            )
            .unwrap();
        sentence
    }

    #[test]
    fn test_reference_sentence() {
        let structure = StructureInducer::default().induce(&einstein());

        assert_eq!(structure.edges.len(), 1);
        let edge = &structure.edges[0];
        assert_eq!(edge.source, Span::new(0, 2));
        assert_eq!(edge.target, Span::new(3, 7));
        assert_eq!(edge.label, "What did Albert Einstein say");
        assert_eq!(edge.workers, vec!["w1".to_string()]);
        assert_eq!(structure.head, Some(Span::new(0, 2)));
        assert_eq!(structure.concepts[0].text, "Albert Einstein");
        assert_eq!(structure.predicates.len(), 1);
    }

    #[test]
    fn test_serialized_fields() {
        let structure = StructureInducer::default().induce(&einstein());
        let json = serde_json::to_value(&structure).unwrap();

        assert_eq!(json["sentence_id"], "s1");
        assert_eq!(json["nodes"][0]["text"], "Albert Einstein");
        assert_eq!(json["edges"][0]["source"]["start"], 0);
        assert_eq!(json["edges"][0]["labels"][0], "What did Albert Einstein say");
        assert_eq!(json["stats"]["accepted"], 1);
        assert!(json.get("graph").is_none());
    }

    /// Heads every phrase on its last word
    struct LastWordParser;

    impl DependencyParser for LastWordParser {
        fn parse(&self, tokens: &[String]) -> Vec<crate::words::DependencyArc> {
            let last = tokens.len().saturating_sub(1);
            (0..tokens.len())
                .map(|i| {
                    let relation = if i == last { "ROOT" } else { "dep" };
                    crate::words::DependencyArc::new(last, relation)
                })
                .collect()
        }
    }

    #[test]
    fn test_single_words() {
        let config = InductionConfig {
            single_words: true,
            ..Default::default()
        };

        // Without a parser the graph is left as is
        let unsplit = StructureInducer::new(config.clone()).induce(&einstein());
        assert_eq!(unsplit.edges.len(), 1);

        let structure = StructureInducer::new(config)
            .with_parser(Arc::new(LastWordParser))
            .induce(&einstein());
        assert!(structure.nodes.iter().all(|n| n.end - n.start == 1));
        assert_eq!(structure.head, Some(Span::new(1, 2)));

        let edge = structure
            .edges
            .iter()
            .find(|e| e.source == Span::new(1, 2) && e.target == Span::new(6, 7))
            .unwrap();
        assert_eq!(edge.label, "What did Albert Einstein say");
        assert_eq!(edge.workers, vec!["w1".to_string()]);
        assert!(structure.edges.iter().any(|e| {
            e.source == Span::new(6, 7) && e.target == Span::new(3, 4) && e.label == "dep:dep"
        }));
        // Predicate-argument structures are taken before the split
        assert_eq!(structure.predicates[0].predicate, Span::new(0, 2));
    }

    #[test]
    fn test_empty_sentence() {
        let sentence = Sentence::from_text("s2", "Nothing was asked");
        let structure = StructureInducer::default().induce(&sentence);
        assert!(structure.nodes.is_empty());
        assert!(structure.edges.is_empty());
        assert_eq!(structure.head, None);
    }
}

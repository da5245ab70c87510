//! Single-word split
//!
//! Replaces every multi-word node left after head resolution by the root
//! of its dependency parse. Edges into and out of the node move to the
//! root, and the other words of the span hang off their dependency heads
//! through `dep:<relation>` edges.

use qamr_core::{Label, LabelSet, Span};

use crate::graph::{EdgeData, SentenceGraph};

/// Dependency relations that do not become edges
const SKIPPED_RELATIONS: [&str; 2] = ["cc", "prep"];

/// One token of a dependency parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyArc {
    /// Index of the governing token within the parsed phrase; the root
    /// governs itself
    pub head: usize,
    pub relation: String,
}

impl DependencyArc {
    pub fn new(head: usize, relation: impl Into<String>) -> Self {
        Self {
            head,
            relation: relation.into(),
        }
    }
}

/// Trait for dependency parsers
///
/// Parses come from an external annotator; the phrase is parsed on its own,
/// outside its sentence.
pub trait DependencyParser: Send + Sync {
    /// Return one arc per input token
    fn parse(&self, tokens: &[String]) -> Vec<DependencyArc>;
}

/// Splits multi-word nodes into their words
pub struct WordSplitter<'a> {
    parser: &'a dyn DependencyParser,
    tokens: &'a [String],
}

impl<'a> WordSplitter<'a> {
    pub fn new(parser: &'a dyn DependencyParser, tokens: &'a [String]) -> Self {
        Self { parser, tokens }
    }

    /// Split every multi-word node; returns how many were split.
    ///
    /// Nodes whose parse is malformed are kept as they are.
    pub fn split(&self, graph: &mut SentenceGraph) -> usize {
        let multi_word: Vec<Span> =
            graph.nodes().into_iter().filter(|s| s.len() > 1).collect();
        let mut split = Vec::new();

        for span in multi_word {
            let Some(words) = self.tokens.get(span.start..span.end) else {
                tracing::warn!(%span, "Node outside the sentence, not splitting");
                continue;
            };
            let arcs = self.parser.parse(words);
            let Some(root) = find_root(&arcs, span.len()) else {
                tracing::warn!(
                    %span,
                    arcs = arcs.len(),
                    "Malformed dependency parse, not splitting"
                );
                continue;
            };
            let root_node = word(span.start + root);

            for parent in graph.predecessors(&span) {
                if parent == root_node {
                    continue;
                }
                if let Some(data) = graph.edge(&parent, &span).cloned() {
                    graph.add_edge(parent, root_node, data);
                }
            }
            for child in graph.successors(&span) {
                if child == root_node {
                    continue;
                }
                if let Some(data) = graph.edge(&span, &child).cloned() {
                    graph.add_edge(root_node, child, data);
                }
            }

            for (i, arc) in arcs.iter().enumerate() {
                if i == root || SKIPPED_RELATIONS.contains(&arc.relation.as_str()) {
                    continue;
                }
                let label = Label::from(vec![format!("dep:{}", arc.relation)]);
                graph.add_edge(
                    word(span.start + arc.head),
                    word(span.start + i),
                    EdgeData {
                        labels: LabelSet::new(label),
                        workers: Vec::new(),
                    },
                );
            }

            if graph.head() == Some(span) {
                graph.set_head(Some(root_node));
            }
            tracing::debug!(%span, %root_node, "Split multi-word node");
            split.push(span);
        }

        // Removed last so later nodes still see edges from earlier ones
        for span in &split {
            graph.remove_node(span);
        }
        split.len()
    }
}

fn word(index: usize) -> Span {
    Span::new(index, index + 1)
}

/// Index of the first self-governing token of a well-formed parse
fn find_root(arcs: &[DependencyArc], len: usize) -> Option<usize> {
    if arcs.len() != len || arcs.iter().any(|a| a.head >= len) {
        return None;
    }
    arcs.iter()
        .enumerate()
        .find(|(i, a)| a.head == *i)
        .map(|(i, _)| i)
}

//! Head resolution
//!
//! Replaces every super-span node by the head(s) of the sub-spans it
//! contains, re-pointing incoming edges onto them.

use qamr_core::Span;

use crate::graph::SentenceGraph;
use crate::subchunk::SubchunkMap;

/// Collapses super-spans into their head sub-spans
#[derive(Debug, Clone, Copy)]
pub struct HeadResolver<'a> {
    subchunks: &'a SubchunkMap,
}

impl<'a> HeadResolver<'a> {
    pub fn new(subchunks: &'a SubchunkMap) -> Self {
        Self { subchunks }
    }

    /// Resolve the graph in place, returning the number of removed nodes.
    ///
    /// Nodes are visited by increasing length so inner super-spans are
    /// resolved before the spans enclosing them. Outgoing edges of a removed
    /// super-span are dropped.
    pub fn resolve(&self, graph: &mut SentenceGraph) -> usize {
        let mut order = graph.nodes();
        order.sort_by_key(|s| (s.len(), s.start));

        let mut removed = 0;
        for span in order {
            if !graph.contains(&span) {
                continue;
            }

            let sub_spans: Vec<Span> = self
                .subchunks
                .minimal_spans(&span)
                .into_iter()
                .flatten()
                .filter(|s| **s != span && graph.contains(s))
                .copied()
                .collect();
            if sub_spans.is_empty() {
                continue;
            }

            let heads: Vec<Span> = sub_spans
                .into_iter()
                .filter(|s| !graph.has_incoming(s))
                .collect();

            for parent in graph.predecessors(&span) {
                let Some(data) = graph.edge(&parent, &span).cloned() else {
                    continue;
                };
                for head in heads.iter().filter(|h| **h != parent) {
                    graph.add_edge(parent, *head, data.clone());
                }
            }

            if graph.head() == Some(span) {
                graph.set_head(heads.first().copied());
            }
            graph.remove_node(&span);
            removed += 1;

            tracing::debug!(%span, heads = heads.len(), "Resolved super-span");
        }

        removed
    }
}

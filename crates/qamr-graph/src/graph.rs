//! Sentence graph
//!
//! Directed graph over spans backed by a petgraph arena, with a span index
//! so nodes can be addressed by value.

use std::collections::BTreeMap;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use qamr_core::{LabelSet, Span, WorkerId};
use serde::Serialize;

use crate::disambiguate::DirectedEdge;

/// Data stored on graph edges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgeData {
    pub labels: LabelSet,
    pub workers: Vec<WorkerId>,
}

impl EdgeData {
    /// Merge labels and workers of another edge into this one
    pub fn merge(&mut self, other: &EdgeData) {
        self.labels.merge(&other.labels);
        for worker in &other.workers {
            if !self.workers.contains(worker) {
                self.workers.push(worker.clone());
            }
        }
    }
}

/// Directed span graph of one sentence
#[derive(Debug, Clone, Default)]
pub struct SentenceGraph {
    graph: StableDiGraph<Span, EdgeData>,
    index: BTreeMap<Span, NodeIndex>,
    head: Option<Span>,
}

impl SentenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from disambiguated edges
    pub fn from_edges(edges: &[DirectedEdge], head: Option<Span>) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(
                edge.source,
                edge.target,
                EdgeData {
                    labels: edge.labels.clone(),
                    workers: edge.workers.clone(),
                },
            );
        }
        graph.head = head.filter(|h| graph.contains(h));
        graph
    }

    /// Add a node, returning its index (existing nodes are reused)
    pub fn add_node(&mut self, span: Span) -> NodeIndex {
        if let Some(&idx) = self.index.get(&span) {
            return idx;
        }
        let idx = self.graph.add_node(span);
        self.index.insert(span, idx);
        idx
    }

    /// Add an edge; an existing edge between the same ordered pair absorbs
    /// the new labels and workers
    pub fn add_edge(&mut self, source: Span, target: Span, data: EdgeData) {
        let a = self.add_node(source);
        let b = self.add_node(target);
        match self.graph.find_edge(a, b) {
            Some(e) => {
                if let Some(existing) = self.graph.edge_weight_mut(e) {
                    existing.merge(&data);
                }
            }
            None => {
                self.graph.add_edge(a, b, data);
            }
        }
    }

    /// Remove a node and its incident edges
    pub fn remove_node(&mut self, span: &Span) -> bool {
        match self.index.remove(span) {
            Some(idx) => {
                self.graph.remove_node(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, span: &Span) -> bool {
        self.index.contains_key(span)
    }

    pub fn edge(&self, source: &Span, target: &Span) -> Option<&EdgeData> {
        let a = *self.index.get(source)?;
        let b = *self.index.get(target)?;
        self.graph
            .find_edge(a, b)
            .and_then(|e| self.graph.edge_weight(e))
    }

    /// Nodes with an edge into `span`, in span order
    pub fn predecessors(&self, span: &Span) -> Vec<Span> {
        self.neighbors(span, Direction::Incoming)
    }

    /// Nodes `span` has an edge into, in span order
    pub fn successors(&self, span: &Span) -> Vec<Span> {
        self.neighbors(span, Direction::Outgoing)
    }

    fn neighbors(&self, span: &Span, direction: Direction) -> Vec<Span> {
        let Some(&idx) = self.index.get(span) else {
            return Vec::new();
        };
        let mut ret: Vec<Span> = self
            .graph
            .neighbors_directed(idx, direction)
            .filter_map(|n| self.graph.node_weight(n).copied())
            .collect();
        ret.sort();
        ret.dedup();
        ret
    }

    pub fn has_incoming(&self, span: &Span) -> bool {
        self.index.get(span).is_some_and(|&idx| {
            self.graph
                .neighbors_directed(idx, Direction::Incoming)
                .next()
                .is_some()
        })
    }

    /// All nodes in (start, end) order
    pub fn nodes(&self) -> Vec<Span> {
        self.index.keys().copied().collect()
    }

    /// All edges ordered by (source, target)
    pub fn edges(&self) -> Vec<(Span, Span, &EdgeData)> {
        let mut ret: Vec<(Span, Span, &EdgeData)> = self
            .graph
            .edge_references()
            .filter_map(|e| {
                let source = *self.graph.node_weight(e.source())?;
                let target = *self.graph.node_weight(e.target())?;
                Some((source, target, e.weight()))
            })
            .collect();
        ret.sort_by_key(|(s, t, _)| (*s, *t));
        ret
    }

    pub fn head(&self) -> Option<Span> {
        self.head
    }

    pub fn set_head(&mut self, head: Option<Span>) {
        self.head = head;
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

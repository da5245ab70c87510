//! Edge disambiguation
//!
//! Collapses the options recorded on each undirected edge into a single
//! directed edge.

use qamr_core::{LabelSet, Span, WorkerId};
use serde::Serialize;

use crate::inducer::{EdgeOption, UndirectedGraph};

/// A directed, labeled edge with its supporting workers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectedEdge {
    pub source: Span,
    pub target: Span,
    pub labels: LabelSet,
    /// Union of the workers of every option, first-seen order
    pub workers: Vec<WorkerId>,
}

/// Pick the option whose source is proposed most often; earliest wins ties
pub fn choose_option(options: &[EdgeOption]) -> Option<&EdgeOption> {
    let mut best: Option<(&EdgeOption, usize)> = None;
    for option in options {
        let count = options.iter().filter(|o| o.source == option.source).count();
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((option, count));
        }
    }
    best.map(|(option, _)| option)
}

/// One directed edge per undirected edge, in pair order
pub fn disambiguate(graph: &UndirectedGraph) -> Vec<DirectedEdge> {
    graph
        .iter()
        .filter_map(|(_, options)| {
            let chosen = choose_option(options)?;

            let mut workers: Vec<WorkerId> = Vec::new();
            for option in options {
                if !workers.contains(&option.worker) {
                    workers.push(option.worker.clone());
                }
            }

            Some(DirectedEdge {
                source: chosen.source,
                target: chosen.target,
                labels: chosen.labels.clone(),
                workers,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use qamr_core::Label;

    fn opt(src: (usize, usize), dst: (usize, usize), q: &str, w: &str) -> EdgeOption {
        EdgeOption {
            source: Span::new(src.0, src.1),
            target: Span::new(dst.0, dst.1),
            labels: LabelSet::new(Label::from_question(&[q])),
            worker: w.to_string(),
        }
    }

    #[test]
    fn test_majority_direction_wins() {
        let options = vec![
            opt((2, 3), (0, 1), "a", "w1"),
            opt((0, 1), (2, 3), "b", "w2"),
            opt((0, 1), (2, 3), "c", "w3"),
        ];
        let chosen = choose_option(&options).unwrap();
        assert_eq!(chosen.source, Span::new(0, 1));
        assert_eq!(chosen.labels.primary().unwrap().to_string(), "b");
    }

    #[test]
    fn test_tie_keeps_first() {
        let options = vec![opt((2, 3), (0, 1), "a", "w1"), opt((0, 1), (2, 3), "b", "w2")];
        assert_eq!(choose_option(&options).unwrap().source, Span::new(2, 3));
        assert!(choose_option(&[]).is_none());
    }

    #[test]
    fn test_disambiguate_unions_workers() {
        let mut graph = UndirectedGraph::default();
        graph.add_option(opt((0, 1), (2, 3), "a", "w1"));
        graph.add_option(opt((2, 3), (0, 1), "b", "w2"));
        graph.add_option(opt((0, 1), (2, 3), "c", "w1"));
        graph.add_option(opt((4, 5), (0, 1), "d", "w3"));

        let edges = disambiguate(&graph);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].source, Span::new(0, 1));
        assert_eq!(edges[0].target, Span::new(2, 3));
        assert_eq!(edges[0].workers, vec!["w1".to_string(), "w2".to_string()]);
        assert_eq!(edges[1].source, Span::new(4, 5));
    }
}

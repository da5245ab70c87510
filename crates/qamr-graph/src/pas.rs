//! Predicate-argument split
//!
//! Breaks a directed graph into one structure per source node, visiting
//! predicates in predicate-score order.

use qamr_core::{Span, WorkerId};
use serde::Serialize;

use crate::frequency::RankedChunk;
use crate::graph::SentenceGraph;

/// One outgoing edge of a predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Argument {
    pub span: Span,
    pub text: String,
    pub labels: Vec<String>,
    pub workers: Vec<WorkerId>,
}

/// A predicate span with its arguments ordered by start
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredicateArgument {
    pub predicate: Span,
    pub text: String,
    pub arguments: Vec<Argument>,
}

/// Split `graph` by predicate; ranked spans without outgoing edges are skipped
pub fn split_by_predicate(
    graph: &SentenceGraph,
    ranking: &[RankedChunk],
    tokens: &[String],
) -> Vec<PredicateArgument> {
    ranking
        .iter()
        .filter(|chunk| graph.contains(&chunk.span))
        .filter_map(|chunk| {
            let arguments: Vec<Argument> = graph
                .successors(&chunk.span)
                .into_iter()
                .filter_map(|target| {
                    let data = graph.edge(&chunk.span, &target)?;
                    Some(Argument {
                        span: target,
                        text: target.text(tokens),
                        labels: data.labels.iter().map(|l| l.to_string()).collect(),
                        workers: data.workers.clone(),
                    })
                })
                .collect();

            if arguments.is_empty() {
                return None;
            }
            Some(PredicateArgument {
                predicate: chunk.span,
                text: chunk.text.clone(),
                arguments,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeData;
    use qamr_core::{Label, LabelSet};

    fn data(q: &str) -> EdgeData {
        EdgeData {
            labels: LabelSet::new(Label::from_question(&[q])),
            workers: vec!["w1".to_string()],
        }
    }

    fn chunk(s: usize, e: usize, tokens: &[String], score: f64) -> RankedChunk {
        let span = Span::new(s, e);
        RankedChunk {
            span,
            text: span.text(tokens),
            score,
        }
    }

    #[test]
    fn test_split_by_predicate() {
        let tokens: Vec<String> = "John gave Mary a book".split(' ').map(str::to_string).collect();
        let mut graph = SentenceGraph::new();
        graph.add_edge(Span::new(1, 2), Span::new(3, 5), data("what"));
        graph.add_edge(Span::new(1, 2), Span::new(0, 1), data("who"));
        graph.add_edge(Span::new(3, 5), Span::new(2, 3), data("whom"));

        let ranking = vec![
            chunk(1, 2, &tokens, 1.0),
            chunk(3, 5, &tokens, 0.5),
            chunk(0, 1, &tokens, 0.0),
        ];
        let pas = split_by_predicate(&graph, &ranking, &tokens);

        assert_eq!(pas.len(), 2);
        assert_eq!(pas[0].text, "gave");
        let args: Vec<&str> = pas[0].arguments.iter().map(|a| a.text.as_str()).collect();
        assert_eq!(args, vec!["John", "a book"]);
        assert_eq!(pas[0].arguments[1].labels, vec!["what".to_string()]);
        assert_eq!(pas[1].predicate, Span::new(3, 5));
    }
}

//! Subchunk indexing
//!
//! Maps every observed span to the minimal spans it decomposes into.

use std::collections::{BTreeMap, BTreeSet};

use qamr_core::Span;

/// Mapping from span to its minimal sub-spans; a minimal span maps to itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubchunkMap {
    map: BTreeMap<Span, BTreeSet<Span>>,
}

impl SubchunkMap {
    /// Minimal spans of `span`, if it was indexed
    pub fn minimal_spans(&self, span: &Span) -> Option<&BTreeSet<Span>> {
        self.map.get(span)
    }

    /// True iff `span` was indexed and has no smaller observed span inside
    pub fn is_minimal(&self, span: &Span) -> bool {
        self.map
            .get(span)
            .is_some_and(|subs| subs.len() == 1 && subs.contains(span))
    }

    /// Indexed spans in (start, end) order
    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.map.keys()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Compute the minimal-span decomposition of every span.
///
/// Spans are visited by increasing length. Each span collects the minimal
/// spans of every previously visited span it contains; a span containing
/// none is minimal and maps to itself.
pub fn identify_subchunks(spans: &[Span]) -> SubchunkMap {
    let mut ordered: Vec<Span> = spans.to_vec();
    ordered.sort_by_key(|s| (s.len(), s.start));
    ordered.dedup();

    let mut map: BTreeMap<Span, BTreeSet<Span>> = BTreeMap::new();
    for (i, span) in ordered.iter().enumerate() {
        let mut subs = BTreeSet::new();
        for smaller in ordered[..i].iter().filter(|d| d.is_subchunk_of(span)) {
            if let Some(minimal) = map.get(smaller) {
                subs.extend(minimal.iter().copied());
            }
        }
        if subs.is_empty() {
            subs.insert(*span);
        }
        map.insert(*span, subs);
    }

    SubchunkMap { map }
}

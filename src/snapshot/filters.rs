//! Named node filters.
//!
//! Each filter compresses to one bit per node, computed once and cached by
//! the engine:
//!
//! - `objectsRetainedByDetachedDomNodes`: BFS from the root that refuses to
//!   enter detached nodes marks everything reachable without them; nodes
//!   left unmarked (and reachable at all) are retained only through
//!   detached DOM.
//! - `objectsRetainedByConsole`: same shape, avoiding edges that represent
//!   globals owned by the DevTools console.
//! - `duplicatedStrings`: scans string and cons-string nodes for repeated
//!   contents, marking every occurrence. Flat cons-strings (one of their
//!   `first`/`second` children is the empty string) are skipped since V8
//!   already collapsed them.

use ahash::AHashMap;

use crate::stdx::DynamicBitSet;

use super::graph::{DomState, HeapGraph};
use super::NO_DISTANCE;

/// The named filters the engine can build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NamedFilter {
    ObjectsRetainedByDetachedDomNodes,
    ObjectsRetainedByConsole,
    DuplicatedStrings,
}

impl NamedFilter {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "objectsRetainedByDetachedDomNodes" => Some(Self::ObjectsRetainedByDetachedDomNodes),
            "objectsRetainedByConsole" => Some(Self::ObjectsRetainedByConsole),
            "duplicatedStrings" => Some(Self::DuplicatedStrings),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ObjectsRetainedByDetachedDomNodes => "objectsRetainedByDetachedDomNodes",
            Self::ObjectsRetainedByConsole => "objectsRetainedByConsole",
            Self::DuplicatedStrings => "duplicatedStrings",
        }
    }
}

/// One bit per node plus the polarity the filter reads it with.
#[derive(Debug)]
pub struct NamedFilterBits {
    bits: DynamicBitSet,
    pass_when_set: bool,
}

impl NamedFilterBits {
    /// Whether the node at `ordinal` passes the filter.
    #[inline]
    pub fn passes(&self, ordinal: usize) -> bool {
        self.bits.is_set(ordinal) == self.pass_when_set
    }
}

/// Builds the bit-vector for a named filter.
pub fn build_named_filter(
    graph: &HeapGraph,
    distances: &[i32],
    filter: NamedFilter,
) -> NamedFilterBits {
    match filter {
        NamedFilter::ObjectsRetainedByDetachedDomNodes => {
            let mut bits = traverse_marking(graph, |g, _src, edge_index| {
                g.node_dom_state(g.edge_to_ordinal(edge_index)) != DomState::Detached
            });
            mark_unreachable(distances, &mut bits);
            NamedFilterBits {
                bits,
                pass_when_set: false,
            }
        }
        NamedFilter::ObjectsRetainedByConsole => {
            let mut bits = traverse_marking(graph, |g, src, edge_index| {
                !(g.node_is_synthetic(src)
                    && g.edge_name(edge_index)
                        .is_some_and(|n| n.ends_with(" / DevTools console")))
            });
            mark_unreachable(distances, &mut bits);
            NamedFilterBits {
                bits,
                pass_when_set: false,
            }
        }
        NamedFilter::DuplicatedStrings => NamedFilterBits {
            bits: mark_duplicated_strings(graph),
            pass_when_set: true,
        },
    }
}

/// BFS from the root marking every node reachable through edges the
/// predicate accepts. The predicate sees `(graph, source_ordinal,
/// edge_index)`.
fn traverse_marking(
    graph: &HeapGraph,
    follow: impl Fn(&HeapGraph, usize, usize) -> bool,
) -> DynamicBitSet {
    let mut bits = DynamicBitSet::empty(graph.node_count());
    let root = graph.root_ordinal();
    let mut queue: Vec<usize> = vec![root];
    bits.set(root);
    let mut head = 0;
    while head < queue.len() {
        let ordinal = queue[head];
        head += 1;
        for edge_index in graph.edges_of(ordinal) {
            let child = graph.edge_to_ordinal(edge_index);
            if bits.is_set(child) {
                continue;
            }
            if !follow(graph, ordinal, edge_index) {
                continue;
            }
            bits.set(child);
            queue.push(child);
        }
    }
    bits
}

/// Nodes nothing reaches at all are not interesting "retained by X"
/// results; fold them into the marked set.
fn mark_unreachable(distances: &[i32], bits: &mut DynamicBitSet) {
    for (ordinal, &distance) in distances.iter().enumerate() {
        if distance == NO_DISTANCE {
            bits.set(ordinal);
        }
    }
}

fn mark_duplicated_strings(graph: &HeapGraph) -> DynamicBitSet {
    let meta = graph.meta();
    let mut bits = DynamicBitSet::empty(graph.node_count());
    let mut first_seen: AHashMap<&str, usize> = AHashMap::new();

    for ordinal in 0..graph.node_count() {
        let node_type = graph.node_type(ordinal);
        let is_plain = node_type == meta.node_type_string;
        let is_cons = node_type == meta.node_type_cons_string;
        if !is_plain && !is_cons {
            continue;
        }
        if is_cons && is_flat_cons_string(graph, ordinal) {
            continue;
        }
        let name = graph.node_name(ordinal);
        match first_seen.get(name) {
            Some(&first) => {
                bits.set(first);
                bits.set(ordinal);
            }
            None => {
                first_seen.insert(name, ordinal);
            }
        }
    }
    bits
}

/// A cons-string one of whose `first`/`second` internal children is the
/// empty string was already flattened by V8; its contents equal its other
/// child and would read as a false duplicate.
fn is_flat_cons_string(graph: &HeapGraph, ordinal: usize) -> bool {
    for edge_index in graph.edges_of(ordinal) {
        if !graph.edge_is_internal(edge_index) {
            continue;
        }
        match graph.edge_name(edge_index) {
            Some("first") | Some("second") => {}
            _ => continue,
        }
        let child = graph.edge_to_ordinal(edge_index);
        if graph.node_name(child).is_empty() {
            return true;
        }
    }
    false
}

//! DOM attachedness propagation.
//!
//! Runs only when the snapshot serialized a detachedness field. Nodes whose
//! serialized state is Attached or Detached seed two work queues; attached
//! state wins, then detached state floods what is left. Propagation follows
//! visible, non-weak edges and only flows through native nodes, the only
//! ones that carry DOM state.
//!
//! Every node that ends up detached has its name rewritten to
//! `"Detached " + name`, interned through an old-index → new-index cache so
//! each original name maps to one new string index, and gets the
//! detached-DOM flag.

use ahash::AHashMap;

use crate::stdx::DynamicBitSet;

use super::graph::{DomState, HeapGraph};
use super::FLAG_DETACHED_DOM_TREE_NODE;

/// Propagates DOM link state and rewrites detached node names.
pub fn propagate_dom_state(graph: &mut HeapGraph, flags: &mut [u32]) {
    if !graph.has_detachedness() {
        return;
    }
    let node_count = graph.node_count();
    let mut visited = DynamicBitSet::empty(node_count);
    let mut attached: Vec<usize> = Vec::new();
    let mut detached: Vec<usize> = Vec::new();

    for ordinal in 0..node_count {
        match graph.node_dom_state(ordinal) {
            DomState::Attached => attached.push(ordinal),
            DomState::Detached => detached.push(ordinal),
            DomState::Unknown => {}
        }
    }

    let mut rename_cache: AHashMap<u32, u32> = AHashMap::new();

    while let Some(ordinal) = attached.pop() {
        if visited.is_set(ordinal) {
            continue;
        }
        visited.set(ordinal);
        graph.set_node_dom_state(ordinal, DomState::Attached);
        push_dom_children(graph, ordinal, &visited, &mut attached);
    }

    while let Some(ordinal) = detached.pop() {
        if visited.is_set(ordinal) {
            continue;
        }
        visited.set(ordinal);
        graph.set_node_dom_state(ordinal, DomState::Detached);
        flags[ordinal] |= FLAG_DETACHED_DOM_TREE_NODE;
        rename_detached(graph, ordinal, &mut rename_cache);
        push_dom_children(graph, ordinal, &visited, &mut detached);
    }
}

/// Enqueues the DOM-state-carrying children of a node: native targets
/// behind non-hidden, non-invisible, non-weak edges.
fn push_dom_children(
    graph: &HeapGraph,
    ordinal: usize,
    visited: &DynamicBitSet,
    queue: &mut Vec<usize>,
) {
    let meta = graph.meta();
    for edge_index in graph.edges_of(ordinal) {
        let edge_type = graph.edge_type(edge_index);
        if edge_type == meta.edge_type_hidden
            || edge_type == meta.edge_type_invisible
            || edge_type == meta.edge_type_weak
        {
            continue;
        }
        let child = graph.edge_to_ordinal(edge_index);
        if !graph.node_is_native(child) || visited.is_set(child) {
            continue;
        }
        queue.push(child);
    }
}

fn rename_detached(graph: &mut HeapGraph, ordinal: usize, cache: &mut AHashMap<u32, u32>) {
    let old_index = graph.node_name_index(ordinal);
    let new_index = match cache.get(&old_index) {
        Some(&idx) => idx,
        None => {
            let renamed = format!("Detached {}", graph.strings().get(old_index as usize));
            let idx = graph.strings_mut().add(renamed);
            cache.insert(old_index, idx);
            idx
        }
    };
    graph.set_node_name_index(ordinal, new_index);
}

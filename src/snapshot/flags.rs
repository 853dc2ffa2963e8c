//! Node flag computation: queriability and page ownership.
//!
//! `CAN_BE_QUERIED` marks objects the runtime can inspect from a page
//! context: everything reachable from the root's non-synthetic children over
//! visible, non-weak edges. `PAGE_OBJECT` marks the page-owned part of the
//! heap: everything reachable from Window objects (the root's shortcut
//! targets) and the Document-DOM-trees node over non-weak edges. The
//! post-order and dominator passes use the page flag to keep debugger-owned
//! retainers from claiming page objects.

use super::graph::HeapGraph;
use super::{FLAG_CAN_BE_QUERIED, FLAG_PAGE_OBJECT};

/// Computes the queriability and page-ownership bits, OR-ing into `flags`
/// (the detached-DOM bit is set earlier, by DOM propagation).
pub fn calculate_flags(graph: &HeapGraph, flags: &mut [u32]) {
    mark_queriable_heap_objects(graph, flags);
    mark_page_owned_nodes(graph, flags);
}

fn mark_queriable_heap_objects(graph: &HeapGraph, flags: &mut [u32]) {
    let meta = graph.meta();
    let root = graph.root_ordinal();
    let mut list: Vec<usize> = Vec::new();

    for edge_index in graph.edges_of(root) {
        let child = graph.edge_to_ordinal(edge_index);
        if !graph.node_is_synthetic(child) {
            list.push(child);
        }
    }

    while let Some(ordinal) = list.pop() {
        if flags[ordinal] & FLAG_CAN_BE_QUERIED != 0 {
            continue;
        }
        flags[ordinal] |= FLAG_CAN_BE_QUERIED;
        for edge_index in graph.edges_of(ordinal) {
            let child = graph.edge_to_ordinal(edge_index);
            if flags[child] & FLAG_CAN_BE_QUERIED != 0 {
                continue;
            }
            let edge_type = graph.edge_type(edge_index);
            if edge_type == meta.edge_type_hidden
                || edge_type == meta.edge_type_invisible
                || edge_type == meta.edge_type_internal
                || edge_type == meta.edge_type_weak
            {
                continue;
            }
            list.push(child);
        }
    }
}

fn mark_page_owned_nodes(graph: &HeapGraph, flags: &mut [u32]) {
    let meta = graph.meta();
    let root = graph.root_ordinal();
    let mut list: Vec<usize> = Vec::new();

    // Entry points: Window objects hang off the root through shortcut
    // edges; the DOM tree roots sit behind an element edge.
    for edge_index in graph.edges_of(root) {
        let edge_type = graph.edge_type(edge_index);
        let child = graph.edge_to_ordinal(edge_index);
        if edge_type == meta.edge_type_element {
            if !graph.node_is_document_dom_trees_root(child) {
                continue;
            }
        } else if edge_type != meta.edge_type_shortcut {
            continue;
        }
        if flags[child] & FLAG_PAGE_OBJECT == 0 {
            flags[child] |= FLAG_PAGE_OBJECT;
            list.push(child);
        }
    }

    while let Some(ordinal) = list.pop() {
        for edge_index in graph.edges_of(ordinal) {
            let child = graph.edge_to_ordinal(edge_index);
            if flags[child] & FLAG_PAGE_OBJECT != 0 {
                continue;
            }
            if graph.edge_is_weak(edge_index) {
                continue;
            }
            flags[child] |= FLAG_PAGE_OBJECT;
            list.push(child);
        }
    }
}

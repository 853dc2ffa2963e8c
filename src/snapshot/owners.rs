//! Shallow-size reassignment from hidden/array nodes to their owners.
//!
//! Backing stores (hidden nodes, elements arrays) inflate the heap with
//! records users never see directly. When a backing node has exactly one
//! non-hidden, non-array owner, its self size is folded into that owner so
//! per-class shallow sizes match user intuition.
//!
//! Ownership is computed with a worklist over non-weak edges. Each node's
//! owner cell moves through at most two transitions
//! (unvisited → some owner → multiple), which bounds the worklist and
//! guarantees termination.
//!
//! Skipped entirely when the snapshot has no user roots: such snapshots were
//! taken with internals exposed and sizes must stay raw. Runs once during
//! build; self sizes never change afterwards.

use super::errors::SnapshotDataError;
use super::graph::HeapGraph;

const UNVISITED: u32 = 0xFFFF_FFFF;
const MULTIPLE_OWNERS: u32 = 0xFFFF_FFFE;

/// Transfers self sizes from singly-owned hidden/array nodes to their
/// owners.
pub fn reassign_shallow_sizes(graph: &mut HeapGraph) -> Result<(), SnapshotDataError> {
    let root = graph.root_ordinal();
    let has_user_roots = graph
        .edges_of(root)
        .any(|edge| graph.node_is_user_root(graph.edge_to_ordinal(edge)));
    if !has_user_roots {
        return Ok(());
    }

    let node_count = graph.node_count();
    if node_count >= MULTIPLE_OWNERS as usize {
        return Err(SnapshotDataError::TooManyNodesForOwners { node_count });
    }

    let mut owners = vec![0u32; node_count];
    let mut worklist: Vec<usize> = Vec::new();
    for ordinal in 0..node_count {
        if graph.node_is_hidden(ordinal) || graph.node_is_array(ordinal) {
            owners[ordinal] = UNVISITED;
        } else {
            owners[ordinal] = ordinal as u32;
            worklist.push(ordinal);
        }
    }

    while let Some(ordinal) = worklist.pop() {
        let owner = owners[ordinal];
        for edge_index in graph.edges_of(ordinal) {
            if graph.edge_is_weak(edge_index) {
                continue;
            }
            let target = graph.edge_to_ordinal(edge_index);
            let current = owners[target];
            if current == UNVISITED {
                owners[target] = owner;
                worklist.push(target);
            } else if current == owner
                || current as usize == target
                || current == MULTIPLE_OWNERS
            {
                // Settled: self-owned, already this owner, or shared.
            } else {
                owners[target] = MULTIPLE_OWNERS;
                // The node may already sit in the worklist; pushing again is
                // cheaper than removal and the state can only move once more.
                worklist.push(target);
            }
        }
    }

    for ordinal in 0..node_count {
        let owner = owners[ordinal];
        if owner == UNVISITED || owner == MULTIPLE_OWNERS || owner as usize == ordinal {
            continue;
        }
        let owner_ordinal = owner as usize;
        if owner_ordinal == root || graph.node_is_synthetic(owner_ordinal) {
            continue;
        }
        let size = graph.node_self_size(ordinal);
        if size == 0 {
            continue;
        }
        let owner_size = graph.node_self_size(owner_ordinal);
        graph.set_node_self_size(ordinal, 0);
        graph.set_node_self_size(owner_ordinal, owner_size + size);
    }
    Ok(())
}

//! Two-phase BFS distance calculation.
//!
//! Distances answer "how far from a page-observable entry point is this
//! object". Phase one runs BFS from the root's user-root children at
//! distance 1; phase two runs from the root itself, offset by
//! [`BASE_SYSTEM_DISTANCE`](super::BASE_SYSTEM_DISTANCE) when any user root
//! was reached, so system-only objects sort after everything page-visible.
//!
//! Weak edges never lower a distance. An optional edge filter restricts
//! traversal further; a node every path to which is filtered out keeps
//! [`NO_DISTANCE`](super::NO_DISTANCE).

use super::errors::BuildError;
use super::graph::HeapGraph;
use super::progress::CancelToken;
use super::{BASE_SYSTEM_DISTANCE, NO_DISTANCE};

/// Edge filter: `(graph, source_ordinal, edge_index) -> follow?`.
pub type EdgeFilter<'a> = dyn Fn(&HeapGraph, usize, usize) -> bool + 'a;

/// Iterations between cancellation checks in the BFS drain.
const CANCEL_CHECK_INTERVAL: usize = 1 << 16;

/// Computes node distances for the whole graph.
pub fn calculate_distances(
    graph: &HeapGraph,
    filter: Option<&EdgeFilter<'_>>,
    cancel: &CancelToken,
) -> Result<Vec<i32>, BuildError> {
    let node_count = graph.node_count();
    let root = graph.root_ordinal();
    let mut distances = vec![NO_DISTANCE; node_count];
    let mut queue: Vec<usize> = Vec::new();

    // Phase 1: user-root children of the root start at distance 1. Weak
    // edges and the filter apply here too, so a cut-off entry point stays
    // unreachable.
    for edge_index in graph.edges_of(root) {
        if graph.edge_is_weak(edge_index) {
            continue;
        }
        let child = graph.edge_to_ordinal(edge_index);
        if !graph.node_is_user_root(child) || distances[child] != NO_DISTANCE {
            continue;
        }
        if let Some(f) = filter {
            if !f(graph, root, edge_index) {
                continue;
            }
        }
        distances[child] = 1;
        queue.push(child);
    }
    let reached_user_roots = !queue.is_empty();
    bfs(graph, &mut distances, &mut queue, filter, cancel)?;

    // Phase 2: everything else hangs off the root with a large offset so it
    // sorts after page-visible objects.
    distances[root] = if reached_user_roots {
        BASE_SYSTEM_DISTANCE
    } else {
        0
    };
    queue.clear();
    queue.push(root);
    bfs(graph, &mut distances, &mut queue, filter, cancel)?;

    Ok(distances)
}

fn bfs(
    graph: &HeapGraph,
    distances: &mut [i32],
    queue: &mut Vec<usize>,
    filter: Option<&EdgeFilter<'_>>,
    cancel: &CancelToken,
) -> Result<(), BuildError> {
    let mut head = 0usize;
    while head < queue.len() {
        if head % CANCEL_CHECK_INTERVAL == 0 && cancel.is_canceled() {
            return Err(BuildError::Canceled);
        }
        let ordinal = queue[head];
        head += 1;
        let next_distance = distances[ordinal] + 1;
        for edge_index in graph.edges_of(ordinal) {
            if graph.edge_is_weak(edge_index) {
                continue;
            }
            let child = graph.edge_to_ordinal(edge_index);
            if distances[child] != NO_DISTANCE {
                continue;
            }
            if let Some(f) = filter {
                if !f(graph, ordinal, edge_index) {
                    continue;
                }
            }
            distances[child] = next_distance;
            queue.push(child);
        }
    }
    Ok(())
}

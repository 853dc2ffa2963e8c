//! Iterative dominator-tree computation (Cooper–Harvey–Kennedy).
//!
//! Runs over the reverse graph in post-order numbering: each node's
//! immediate dominator is the intersection of its essential retainers'
//! dominators, intersected by walking the two candidates up the current
//! tree until they meet. Higher post-order indexes are closer to the root,
//! so the "affected" scan goes from high to low and changes propagate
//! outward from the root.
//!
//! # Invariants
//! - `dominators_tree[v]` is an ordinal distinct from `v` for every
//!   non-root `v`; the chain `v, dom[v], …` always terminates at the root.
//! - Nodes with no essential retainer, and essential components the fixed
//!   point never reaches, fall back to the root as dominator.

use crate::stdx::DynamicBitSet;

use super::errors::BuildError;
use super::essential::EssentialEdges;
use super::graph::HeapGraph;
use super::postorder::{page_gate_skips, PostOrder};
use super::progress::CancelToken;

/// Sentinel for a post-order slot with no computed dominator yet.
const NO_ENTRY: u32 = u32::MAX;

/// Iterations of the inner scan between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 1 << 16;

/// Builds `dominators_tree`, indexed by node ordinal.
pub fn build_dominator_tree(
    graph: &HeapGraph,
    essential: &mut EssentialEdges,
    flags: &[u32],
    order: &PostOrder,
    cancel: &CancelToken,
) -> Result<Vec<u32>, BuildError> {
    let node_count = graph.node_count();
    let nf = graph.meta().node_field_count;
    let root = graph.root_ordinal();
    let root_post_index = (node_count - 1) as u32;

    let mut dominators = vec![NO_ENTRY; node_count];
    dominators[root_post_index as usize] = root_post_index;

    // Seed with the root's direct essential children.
    let mut affected = DynamicBitSet::empty(node_count);
    let root_node_index = graph.root_node_index();
    for edge_index in graph.edges_of(root) {
        if !essential.is_essential(graph, root_node_index, edge_index) {
            continue;
        }
        let child = graph.edge_to_ordinal(edge_index);
        affected.set(order.ordinal_to_post_order[child] as usize);
    }

    let mut steps = 0usize;
    let mut changed = true;
    while changed {
        changed = false;
        // High to low: nodes closer to the root first.
        for post_index in (0..node_count - 1).rev() {
            steps += 1;
            if steps % CANCEL_CHECK_INTERVAL == 0 && cancel.is_canceled() {
                return Err(BuildError::Canceled);
            }
            if !affected.is_set(post_index) {
                continue;
            }
            affected.unset(post_index);

            let v_ordinal = order.post_order_to_ordinal[post_index] as usize;
            let mut new_dominator = NO_ENTRY;
            let mut orphan = true;
            for (retainer_ordinal, retainer_edge) in graph.retainers_of(v_ordinal) {
                if !essential.is_essential(graph, retainer_ordinal * nf, retainer_edge) {
                    continue;
                }
                orphan = false;
                if page_gate_skips(flags, root, retainer_ordinal, v_ordinal) {
                    continue;
                }
                let retainer_post = order.ordinal_to_post_order[retainer_ordinal];
                if dominators[retainer_post as usize] == NO_ENTRY {
                    continue;
                }
                new_dominator = if new_dominator == NO_ENTRY {
                    retainer_post
                } else {
                    intersect(new_dominator, retainer_post, &dominators)
                };
                if new_dominator == root_post_index {
                    break;
                }
            }
            if orphan {
                new_dominator = root_post_index;
            }
            if new_dominator != NO_ENTRY && dominators[post_index] != new_dominator {
                dominators[post_index] = new_dominator;
                changed = true;
                for edge_index in graph.edges_of(v_ordinal) {
                    let child = graph.edge_to_ordinal(edge_index);
                    affected.set(order.ordinal_to_post_order[child] as usize);
                }
            }
        }
    }

    // Essential components unreachable from the root never enter the fixed
    // point; they hang off the root so every dominator chain terminates.
    let mut dominators_tree = vec![0u32; node_count];
    for post_index in 0..node_count {
        let ordinal = order.post_order_to_ordinal[post_index] as usize;
        let dominator_post = if dominators[post_index] == NO_ENTRY {
            root_post_index
        } else {
            dominators[post_index]
        };
        dominators_tree[ordinal] = order.post_order_to_ordinal[dominator_post as usize];
    }
    Ok(dominators_tree)
}

/// Two-pointer intersection in post-order numbering: walk the candidate
/// farther from the root upward until the chains meet.
#[inline]
fn intersect(mut i: u32, mut j: u32, dominators: &[u32]) -> u32 {
    while i != j {
        while i < j {
            i = dominators[i as usize];
        }
        while j < i {
            j = dominators[j as usize];
        }
    }
    i
}

//! Retained-size propagation and the dominated-children index.
//!
//! Retained sizes fall out of the dominator tree in one linear sweep: walking
//! the post-order from leaf-most to root-most, each node's retained size is
//! complete before it is added to its dominator's. The dominated-children
//! index is the inverse of `dominators_tree`, bucket-sorted with the same
//! parked-count trick the retainer builder uses.
//!
//! # Invariants
//! - `retained_sizes[v] >= self_size[v]` for every `v`.
//! - `retained_sizes[root]` equals the sum of all self sizes.
//! - `first_dominated_node_index[node_count] == dominated_nodes.len()`
//!   and the buckets hold exactly `node_count - 1` entries (every node but
//!   the root, which dominates itself).

use super::graph::HeapGraph;
use super::postorder::PostOrder;

/// Propagates self sizes up the dominator tree in post-order.
pub fn calculate_retained_sizes(
    graph: &HeapGraph,
    order: &PostOrder,
    dominators_tree: &[u32],
) -> Vec<f64> {
    let node_count = graph.node_count();
    let mut retained_sizes: Vec<f64> = (0..node_count)
        .map(|ordinal| f64::from(graph.node_self_size(ordinal)))
        .collect();

    // Exclude the root (last in post-order): it dominates itself.
    for post_index in 0..node_count.saturating_sub(1) {
        let ordinal = order.post_order_to_ordinal[post_index] as usize;
        let dominator = dominators_tree[ordinal] as usize;
        retained_sizes[dominator] += retained_sizes[ordinal];
    }
    retained_sizes
}

/// Dominator → dominated-children buckets.
#[derive(Debug)]
pub struct DominatedNodes {
    /// `node_count + 1` entries; bucket of ordinal `v` is
    /// `dominated_nodes[first[v]..first[v + 1]]`.
    pub first_dominated_node_index: Vec<u32>,
    /// Node indexes (field units) of dominated children.
    pub dominated_nodes: Vec<u32>,
}

/// Builds the dominated-children index by two-pass bucket sort.
pub fn build_dominated_nodes(graph: &HeapGraph, dominators_tree: &[u32]) -> DominatedNodes {
    let node_count = graph.node_count();
    let root = graph.root_ordinal();
    let nf = graph.meta().node_field_count;

    let mut index_array = vec![0u32; node_count + 1];
    let mut dominated_nodes = vec![0u32; node_count.saturating_sub(1)];

    // Pass 1: count children per dominator, skipping the root's self edge.
    for ordinal in 0..node_count {
        if ordinal == root {
            continue;
        }
        index_array[dominators_tree[ordinal] as usize] += 1;
    }

    // Convert to offsets, parking each bucket's remaining count in its first
    // slot.
    let mut first_free = 0u32;
    for ordinal in 0..node_count {
        let count = index_array[ordinal];
        index_array[ordinal] = first_free;
        if count > 0 {
            dominated_nodes[first_free as usize] = count;
        }
        first_free += count;
    }
    index_array[node_count] = dominated_nodes.len() as u32;

    // Pass 2: fill buckets back to front.
    for ordinal in 0..node_count {
        if ordinal == root {
            continue;
        }
        let dominator = dominators_tree[ordinal] as usize;
        let bucket_start = index_array[dominator] as usize;
        let remaining = dominated_nodes[bucket_start] - 1;
        dominated_nodes[bucket_start] = remaining;
        dominated_nodes[bucket_start + remaining as usize] = (ordinal * nf) as u32;
    }

    DominatedNodes {
        first_dominated_node_index: index_array,
        dominated_nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::essential::EssentialEdges;
    use crate::snapshot::postorder::build_post_order;
    use crate::snapshot::progress::{CancelToken, StructuralReport};
    use crate::snapshot::test_fixture::SnapshotBuilder;

    fn analyze(graph: &HeapGraph) -> (PostOrder, Vec<u32>, Vec<f64>, DominatedNodes) {
        let mut essential = EssentialEdges::new();
        let mut report = StructuralReport::new();
        let flags = vec![0u32; graph.node_count()];
        let cancel = CancelToken::new();
        let order = build_post_order(graph, &mut essential, &flags, &mut report, &cancel).unwrap();
        let dom = crate::snapshot::dominators::build_dominator_tree(
            graph,
            &mut essential,
            &flags,
            &order,
            &cancel,
        )
        .unwrap();
        let retained = calculate_retained_sizes(graph, &order, &dom);
        let dominated = build_dominated_nodes(graph, &dom);
        (order, dom, retained, dominated)
    }

    #[test]
    fn chain_retained_sizes() {
        // R(0) -> A(10) -> B(20): retained R=30, A=30, B=20.
        let mut b = SnapshotBuilder::new();
        let r = b.root();
        let a = b.object("A", 10);
        let bb = b.object("B", 20);
        b.property(r, a, "a");
        b.property(a, bb, "b");
        let graph = b.build_graph();

        let (_, _, retained, _) = analyze(&graph);
        assert_eq!(retained[r], 30.0);
        assert_eq!(retained[a], 30.0);
        assert_eq!(retained[bb], 20.0);
    }

    #[test]
    fn weak_edge_retains_nothing() {
        // R -> A, R -> B, A -> B (weak): retained A = A.self.
        let mut b = SnapshotBuilder::new();
        let r = b.root();
        let a = b.object("A", 5);
        let bb = b.object("B", 7);
        b.property(r, a, "a");
        b.property(r, bb, "b");
        b.weak(a, bb, "w");
        let graph = b.build_graph();

        let (_, _, retained, _) = analyze(&graph);
        assert_eq!(retained[a], 5.0);
        assert_eq!(retained[bb], 7.0);
        assert_eq!(retained[r], 12.0);
    }

    #[test]
    fn retained_never_below_self_and_root_totals() {
        let mut b = SnapshotBuilder::new();
        let r = b.root();
        let a = b.object("A", 3);
        let c = b.object("C", 4);
        let d = b.object("D", 5);
        b.property(r, a, "a");
        b.property(a, c, "c");
        b.property(a, d, "d");
        b.property(c, d, "d2");
        let graph = b.build_graph();

        let (_, _, retained, _) = analyze(&graph);
        let total: f64 = (0..graph.node_count())
            .map(|o| f64::from(graph.node_self_size(o)))
            .sum();
        assert_eq!(retained[r], total);
        for ordinal in 0..graph.node_count() {
            assert!(retained[ordinal] >= f64::from(graph.node_self_size(ordinal)));
        }
    }

    #[test]
    fn dominated_buckets_partition_non_root_nodes() {
        let mut b = SnapshotBuilder::new();
        let r = b.root();
        let a = b.object("A", 1);
        let c = b.object("C", 1);
        let d = b.object("D", 1);
        b.property(r, a, "a");
        b.property(a, c, "c");
        b.property(a, d, "d");
        let graph = b.build_graph();

        let (_, dom, _, dominated) = analyze(&graph);
        assert_eq!(
            dominated.first_dominated_node_index[graph.node_count()] as usize,
            dominated.dominated_nodes.len()
        );
        assert_eq!(dominated.dominated_nodes.len(), graph.node_count() - 1);

        // Each bucket holds exactly the children of its dominator.
        let nf = graph.meta().node_field_count;
        for ordinal in 0..graph.node_count() {
            let from = dominated.first_dominated_node_index[ordinal] as usize;
            let to = dominated.first_dominated_node_index[ordinal + 1] as usize;
            for slot in from..to {
                let child = dominated.dominated_nodes[slot] as usize / nf;
                assert_eq!(dom[child] as usize, ordinal);
            }
        }
        // A dominates C and D.
        let from = dominated.first_dominated_node_index[a] as usize;
        let to = dominated.first_dominated_node_index[a + 1] as usize;
        assert_eq!(to - from, 2);
    }
}

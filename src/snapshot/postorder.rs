//! Iterative post-order traversal over essential edges.
//!
//! The dominator builder consumes the graph in post-order. The traversal is
//! an explicit-stack DFS (one frame per node: the node and its traversal
//! cursor into the edges array) so arbitrarily deep heaps cannot overflow
//! the call stack.
//!
//! Nodes unreachable over essential edges are recovered in two extra rounds
//! so the index is always a permutation:
//! - round 2 re-seeds the stack with every node whose retainers are all weak
//!   or shortcut, and reports them;
//! - round 3 appends whatever is still unreached, in ordinal order, and
//!   reports those too.
//!
//! Both rounds warn but never fail. The root always ends at post-order index
//! `node_count - 1`.

use crate::stdx::DynamicBitSet;

use super::errors::BuildError;
use super::essential::EssentialEdges;
use super::graph::HeapGraph;
use super::progress::{CancelToken, StructuralReport};
use super::FLAG_PAGE_OBJECT;

/// Post-order numbering and its inverse.
pub struct PostOrder {
    /// `post_order_to_ordinal[i]` is the ordinal emitted at post-order `i`.
    pub post_order_to_ordinal: Vec<u32>,
    /// `ordinal_to_post_order[v]` is the post-order index of ordinal `v`.
    pub ordinal_to_post_order: Vec<u32>,
}

/// Steps between cancellation checks in the DFS loop.
const CANCEL_CHECK_INTERVAL: usize = 1 << 16;

/// Whether the edge `u -> v` is skipped by the page-ownership gate: a
/// non-root, non-page node may not claim a page object.
#[inline]
pub(crate) fn page_gate_skips(
    flags: &[u32],
    root_ordinal: usize,
    u_ordinal: usize,
    v_ordinal: usize,
) -> bool {
    u_ordinal != root_ordinal
        && flags[v_ordinal] & FLAG_PAGE_OBJECT != 0
        && flags[u_ordinal] & FLAG_PAGE_OBJECT == 0
}

struct DfsState<'a> {
    stack_nodes: Vec<u32>,
    stack_edges: Vec<u32>,
    stack_len: usize,
    visited: DynamicBitSet,
    post_order_to_ordinal: Vec<u32>,
    ordinal_to_post_order: Vec<u32>,
    post_order_index: usize,
    steps: usize,
    cancel: &'a CancelToken,
}

impl DfsState<'_> {
    fn push(&mut self, graph: &HeapGraph, ordinal: usize) {
        self.stack_nodes[self.stack_len] = ordinal as u32;
        self.stack_edges[self.stack_len] = graph.first_edge_index(ordinal) as u32;
        self.stack_len += 1;
        self.visited.set(ordinal);
    }

    fn run(
        &mut self,
        graph: &HeapGraph,
        essential: &mut EssentialEdges,
        flags: &[u32],
    ) -> Result<(), BuildError> {
        let nf = graph.meta().node_field_count;
        let ef = graph.meta().edge_field_count;
        let root = graph.root_ordinal();

        while self.stack_len > 0 {
            self.steps += 1;
            if self.steps % CANCEL_CHECK_INTERVAL == 0 && self.cancel.is_canceled() {
                return Err(BuildError::Canceled);
            }
            let top = self.stack_len - 1;
            let ordinal = self.stack_nodes[top] as usize;
            let edge_index = self.stack_edges[top] as usize;
            if edge_index < graph.end_edge_index(ordinal) {
                self.stack_edges[top] = (edge_index + ef) as u32;
                if !essential.is_essential(graph, ordinal * nf, edge_index) {
                    continue;
                }
                let child = graph.edge_to_ordinal(edge_index);
                if self.visited.is_set(child) {
                    continue;
                }
                if page_gate_skips(flags, root, ordinal, child) {
                    continue;
                }
                self.push(graph, child);
            } else {
                self.ordinal_to_post_order[ordinal] = self.post_order_index as u32;
                self.post_order_to_ordinal[self.post_order_index] = ordinal as u32;
                self.post_order_index += 1;
                self.stack_len -= 1;
            }
        }
        Ok(())
    }
}

/// Builds the post-order index.
pub fn build_post_order(
    graph: &HeapGraph,
    essential: &mut EssentialEdges,
    flags: &[u32],
    report: &mut StructuralReport,
    cancel: &CancelToken,
) -> Result<PostOrder, BuildError> {
    let node_count = graph.node_count();
    let root = graph.root_ordinal();

    let mut state = DfsState {
        stack_nodes: vec![0u32; node_count],
        stack_edges: vec![0u32; node_count],
        stack_len: 0,
        visited: DynamicBitSet::empty(node_count),
        post_order_to_ordinal: vec![0u32; node_count],
        ordinal_to_post_order: vec![0u32; node_count],
        post_order_index: 0,
        steps: 0,
        cancel,
    };

    state.push(graph, root);
    state.run(graph, essential, flags)?;

    if state.post_order_index != node_count {
        report.add(format!(
            "{} nodes are unreachable from the root. Following nodes have only weak retainers:",
            node_count - state.post_order_index
        ));
        // The root's post-order entry is the last one assigned; drop it, the
        // root is visited again when the re-seeded stack drains.
        state.post_order_index -= 1;
        state.stack_len = 1;
        state.stack_nodes[0] = root as u32;
        state.stack_edges[0] = graph.end_edge_index(root) as u32;
        for ordinal in 0..node_count {
            if state.visited.is_set(ordinal) || !graph.has_only_weak_retainers(ordinal) {
                continue;
            }
            state.push(graph, ordinal);
            report.add(format!(
                "{} @{}",
                graph.node_name(ordinal),
                graph.node_id(ordinal)
            ));
        }
        state.run(graph, essential, flags)?;
    }

    if state.post_order_index != node_count {
        report.add(format!(
            "Still found {} unreachable nodes in heap snapshot:",
            node_count - state.post_order_index
        ));
        // Drop the root's entry again; it is re-appended last below.
        state.post_order_index -= 1;
        for ordinal in 0..node_count {
            if state.visited.is_set(ordinal) {
                continue;
            }
            report.add(format!(
                "{} @{}",
                graph.node_name(ordinal),
                graph.node_id(ordinal)
            ));
            state.post_order_to_ordinal[state.post_order_index] = ordinal as u32;
            state.ordinal_to_post_order[ordinal] = state.post_order_index as u32;
            state.post_order_index += 1;
        }
        state.post_order_to_ordinal[state.post_order_index] = root as u32;
        state.ordinal_to_post_order[root] = state.post_order_index as u32;
        state.post_order_index += 1;
    }

    debug_assert_eq!(state.post_order_index, node_count);
    debug_assert_eq!(
        state.ordinal_to_post_order[root] as usize,
        node_count - 1,
        "root must be last in post-order"
    );

    Ok(PostOrder {
        post_order_to_ordinal: state.post_order_to_ordinal,
        ordinal_to_post_order: state.ordinal_to_post_order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::test_fixture::SnapshotBuilder;

    fn post_order_for(graph: &HeapGraph) -> (PostOrder, StructuralReport) {
        let mut essential = EssentialEdges::new();
        let mut report = StructuralReport::new();
        let flags = vec![0u32; graph.node_count()];
        let order = build_post_order(
            graph,
            &mut essential,
            &flags,
            &mut report,
            &CancelToken::new(),
        )
        .unwrap();
        (order, report)
    }

    fn assert_is_permutation(order: &PostOrder) {
        let n = order.post_order_to_ordinal.len();
        let mut seen = vec![false; n];
        for i in 0..n {
            let ordinal = order.post_order_to_ordinal[i] as usize;
            assert!(!seen[ordinal], "ordinal {ordinal} emitted twice");
            seen[ordinal] = true;
            assert_eq!(order.ordinal_to_post_order[ordinal] as usize, i);
        }
    }

    #[test]
    fn chain_emits_children_first() {
        let mut b = SnapshotBuilder::new();
        let r = b.root();
        let a = b.object("A", 1);
        let c = b.object("C", 1);
        b.property(r, a, "a");
        b.property(a, c, "c");
        let graph = b.build_graph();

        let (order, report) = post_order_for(&graph);
        assert!(report.is_empty());
        assert_is_permutation(&order);
        assert_eq!(order.post_order_to_ordinal[2] as usize, r);
        assert!(order.ordinal_to_post_order[c] < order.ordinal_to_post_order[a]);
    }

    #[test]
    fn weak_only_nodes_recovered_in_round_two() {
        // W is retained only weakly: unreachable over essential edges.
        let mut b = SnapshotBuilder::new();
        let r = b.root();
        let a = b.object("A", 1);
        let w = b.object("W", 1);
        b.property(r, a, "a");
        b.weak(a, w, "w");
        let graph = b.build_graph();

        let (order, report) = post_order_for(&graph);
        assert_is_permutation(&order);
        assert_eq!(order.post_order_to_ordinal[graph.node_count() - 1] as usize, r);
        assert!(!report.is_empty());
        assert!(report.entries()[0].contains("only weak retainers"));
        assert!(report.entries().iter().any(|e| e.contains("W @")));
    }

    #[test]
    fn fully_unreachable_nodes_appended_in_round_three() {
        // X has no retainers at all.
        let mut b = SnapshotBuilder::new();
        let r = b.root();
        let a = b.object("A", 1);
        let _x = b.object("X", 1);
        b.property(r, a, "a");
        let graph = b.build_graph();

        let (order, report) = post_order_for(&graph);
        assert_is_permutation(&order);
        assert_eq!(order.post_order_to_ordinal[graph.node_count() - 1] as usize, r);
        assert!(report
            .entries()
            .iter()
            .any(|e| e.contains("Still found")));
    }

    #[test]
    fn page_gate_blocks_non_page_claimers() {
        // P is a page object; D (debugger-owned) also points at it. The DFS
        // must reach P only through the page-flagged A.
        let mut b = SnapshotBuilder::new();
        let r = b.root();
        let a = b.object("A", 1);
        let d = b.object("D", 1);
        let p = b.object("P", 1);
        b.property(r, a, "a");
        b.property(r, d, "d");
        b.property(a, p, "p");
        b.property(d, p, "p2");
        let graph = b.build_graph();

        let mut flags = vec![0u32; graph.node_count()];
        flags[a] = FLAG_PAGE_OBJECT;
        flags[p] = FLAG_PAGE_OBJECT;

        let mut essential = EssentialEdges::new();
        let mut report = StructuralReport::new();
        let order = build_post_order(
            &graph,
            &mut essential,
            &flags,
            &mut report,
            &CancelToken::new(),
        )
        .unwrap();
        assert_is_permutation(&order);
        // P is emitted before A (child-first) and the traversal completed
        // without recovery rounds even though D's edge was skipped.
        assert!(order.ordinal_to_post_order[p] < order.ordinal_to_post_order[a]);
        assert!(report.is_empty());
    }
}

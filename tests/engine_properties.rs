//! Property tests over randomly generated heap graphs.

mod support;

use proptest::prelude::*;

use heapgraph::snapshot::essential::EssentialEdges;
use heapgraph::snapshot::postorder::build_post_order;
use heapgraph::snapshot::retainers::build_retainers;
use heapgraph::snapshot::{
    CancelToken, HeapSnapshot, SnapshotDataError, StructuralReport, NO_DISTANCE,
};
use support::GraphSpec;

/// A random graph description: node sizes plus directed edges, some weak.
#[derive(Clone, Debug)]
struct RandomGraph {
    sizes: Vec<u32>,
    edges: Vec<(usize, usize, bool)>,
}

fn random_graph() -> impl Strategy<Value = RandomGraph> {
    (2usize..24).prop_flat_map(|n| {
        let sizes = prop::collection::vec(0u32..100, n);
        let edges = prop::collection::vec(
            (0..n, 0..n, prop::bool::weighted(0.2)),
            0..(3 * n),
        );
        (sizes, edges).prop_map(|(mut sizes, edges)| {
            // The synthetic root carries no self size.
            sizes[0] = 0;
            RandomGraph { sizes, edges }
        })
    })
}

fn spec_for(graph: &RandomGraph) -> GraphSpec {
    let mut spec = GraphSpec::new();
    let root = spec.root();
    assert_eq!(root, 0);
    for (i, &size) in graph.sizes.iter().enumerate().skip(1) {
        spec.object(&format!("N{i}"), size);
    }
    for (i, &(src, dst, weak)) in graph.edges.iter().enumerate() {
        if weak {
            spec.weak(src, dst, &format!("w{i}"));
        } else {
            spec.property(src, dst, &format!("p{i}"));
        }
    }
    spec
}

/// Reference reachability over non-weak edges from the root.
fn non_weak_reachable(graph: &RandomGraph) -> Vec<bool> {
    let n = graph.sizes.len();
    let mut reachable = vec![false; n];
    reachable[0] = true;
    let mut queue = vec![0usize];
    while let Some(node) = queue.pop() {
        for &(src, dst, weak) in &graph.edges {
            if src == node && !weak && !reachable[dst] {
                reachable[dst] = true;
                queue.push(dst);
            }
        }
    }
    reachable
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn retained_sizes_bound_self_sizes(graph in random_graph()) {
        let snapshot = HeapSnapshot::from_raw(spec_for(&graph).build()).unwrap();
        let n = graph.sizes.len();
        let total: f64 = graph.sizes.iter().map(|&s| f64::from(s)).sum();
        prop_assert_eq!(snapshot.retained_size(0), total);
        for ordinal in 0..n {
            let self_size = f64::from(snapshot.graph().node_self_size(ordinal));
            prop_assert!(snapshot.retained_size(ordinal) >= self_size);
        }
    }

    #[test]
    fn dominator_chains_terminate_at_root(graph in random_graph()) {
        let snapshot = HeapSnapshot::from_raw(spec_for(&graph).build()).unwrap();
        let n = graph.sizes.len();
        for v in 1..n {
            prop_assert_ne!(snapshot.dominator_of(v), v);
            let mut cur = v;
            let mut hops = 0;
            while cur != 0 {
                cur = snapshot.dominator_of(cur);
                hops += 1;
                prop_assert!(hops <= n, "chain from {} does not terminate", v);
            }
        }
    }

    #[test]
    fn dominated_buckets_partition_nodes(graph in random_graph()) {
        let snapshot = HeapSnapshot::from_raw(spec_for(&graph).build()).unwrap();
        let n = graph.sizes.len();
        let total: usize = (0..n).map(|o| snapshot.dominated_children(o).len()).sum();
        prop_assert_eq!(total, n - 1);
        let nf = snapshot.graph().meta().node_field_count;
        for dominator in 0..n {
            for &child_index in snapshot.dominated_children(dominator) {
                prop_assert_eq!(snapshot.dominator_of(child_index as usize / nf), dominator);
            }
        }
    }

    #[test]
    fn retainer_index_mirrors_edges(graph in random_graph()) {
        let snapshot = HeapSnapshot::from_raw(spec_for(&graph).build()).unwrap();
        let g = snapshot.graph();
        let total: usize = (0..g.node_count()).map(|o| g.retainer_count(o)).sum();
        prop_assert_eq!(total, g.edge_count());
        for ordinal in 0..g.node_count() {
            for (src, edge_index) in g.retainers_of(ordinal) {
                prop_assert_eq!(g.edge_to_ordinal(edge_index), ordinal);
                prop_assert!(g.edges_of(src).any(|e| e == edge_index));
            }
        }
    }

    #[test]
    fn post_order_is_a_permutation_with_root_last(graph in random_graph()) {
        let raw = spec_for(&graph).build();
        let meta = heapgraph::snapshot::meta::SnapshotMeta::resolve(&raw.meta).unwrap();
        let mut g = heapgraph::snapshot::graph::HeapGraph::new(
            raw.nodes, raw.edges, raw.strings, raw.root_index, meta,
        )
        .unwrap();
        build_retainers(&mut g).unwrap();

        let mut essential = EssentialEdges::new();
        let mut report = StructuralReport::new();
        let flags = vec![0u32; g.node_count()];
        let order = build_post_order(
            &g,
            &mut essential,
            &flags,
            &mut report,
            &CancelToken::new(),
        )
        .unwrap();

        let n = g.node_count();
        prop_assert_eq!(order.post_order_to_ordinal[n - 1] as usize, 0);
        let mut seen = vec![false; n];
        for i in 0..n {
            let ordinal = order.post_order_to_ordinal[i] as usize;
            prop_assert!(!seen[ordinal]);
            seen[ordinal] = true;
            prop_assert_eq!(order.ordinal_to_post_order[ordinal] as usize, i);
        }
    }

    #[test]
    fn no_distance_iff_no_non_weak_path(graph in random_graph()) {
        let snapshot = HeapSnapshot::from_raw(spec_for(&graph).build()).unwrap();
        let reachable = non_weak_reachable(&graph);
        for (ordinal, &reached) in reachable.iter().enumerate() {
            let distance = snapshot.node_distance(ordinal);
            prop_assert_eq!(
                distance != NO_DISTANCE,
                reached,
                "ordinal {} distance {}",
                ordinal,
                distance
            );
        }
    }

    #[test]
    fn self_diff_is_empty(graph in random_graph()) {
        // Diffing a snapshot against itself yields no per-class diffs.
        let mut snapshot = HeapSnapshot::from_raw(spec_for(&graph).build()).unwrap();
        let aggregates = snapshot.aggregates_for_diff().clone();
        let diff = snapshot.calculate_snapshot_diff("base", &aggregates);
        prop_assert!(diff.is_empty());
    }
}

#[test]
fn corrupt_edge_target_fails_loud() {
    let mut spec = GraphSpec::new();
    let r = spec.root();
    let a = spec.object("A", 1);
    spec.property(r, a, "a");
    let mut raw = spec.build();
    raw.edges[2] = 5; // misaligned target
    let err = HeapSnapshot::from_raw(raw).unwrap_err();
    assert!(matches!(
        err,
        heapgraph::snapshot::BuildError::Data(SnapshotDataError::InvalidToNodeIndex { .. })
    ));
}

#[test]
fn cancellation_aborts_the_build() {
    let mut spec = GraphSpec::new();
    let r = spec.root();
    let a = spec.object("A", 1);
    spec.property(r, a, "a");
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = HeapSnapshot::build(
        spec.build(),
        &heapgraph::snapshot::NullProgress,
        &cancel,
    )
    .unwrap_err();
    assert!(matches!(err, heapgraph::snapshot::BuildError::Canceled));
}

#[test]
fn progress_milestones_are_reported_in_order() {
    let mut spec = GraphSpec::new();
    let r = spec.root();
    let a = spec.object("A", 1);
    spec.property(r, a, "a");
    let progress = heapgraph::snapshot::VecProgress::new();
    HeapSnapshot::build(spec.build(), &progress, &CancelToken::new()).unwrap();
    let lines = progress.take();
    assert!(lines.first().unwrap().starts_with("Building edge indexes"));
    assert!(lines.iter().any(|l| l.starts_with("Building retainers")));
    assert!(lines.iter().any(|l| l.starts_with("Building dominator tree")));
    assert!(lines.last().unwrap().starts_with("Finished processing"));
}

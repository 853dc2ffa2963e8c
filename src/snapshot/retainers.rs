//! Retainer (reverse edge) index construction.
//!
//! Two linear passes over the edges array build a bucketed reverse index:
//! count retainers per target, convert the counts to a prefix-sum layout,
//! then fill the buckets. During the fill, the remaining capacity of each
//! bucket is parked in the bucket's first `retaining_nodes` slot and
//! decremented as slots are claimed, so no extra cursor array is needed.
//!
//! # Invariants
//! - After the build, `retaining_nodes.len() == retaining_edges.len() ==
//!   edge_count` and `first_retainer_index[node_count]` equals the slot
//!   count.
//! - Every edge target must be aligned to the node field count; a
//!   misaligned target is fatal.

use super::errors::SnapshotDataError;
use super::graph::HeapGraph;

/// Fills the graph's retainer arrays from its forward edges.
pub fn build_retainers(graph: &mut HeapGraph) -> Result<(), SnapshotDataError> {
    let nf = graph.meta.node_field_count;
    let ef = graph.meta.edge_field_count;
    let to_node_offset = graph.meta.edge_to_node_offset;
    let node_count = graph.node_count();
    let edge_record_count = graph.edge_count();

    let (mut retaining_nodes, mut retaining_edges, mut first_retainer_index) =
        graph.take_retainer_arrays();

    // Pass 1: count retainers per target ordinal, validating alignment.
    for record in 0..edge_record_count {
        let edge_index = record * ef;
        let to_node = graph.edge_field(edge_index, to_node_offset) as usize;
        if to_node % nf != 0 || to_node / nf >= node_count {
            graph.put_retainer_arrays(retaining_nodes, retaining_edges, first_retainer_index);
            return Err(SnapshotDataError::InvalidToNodeIndex {
                edge_index,
                to_node,
            });
        }
        first_retainer_index[to_node / nf] += 1;
    }

    // Convert counts to bucket offsets, parking each bucket's remaining
    // capacity in its first slot.
    let mut first_unused_slot = 0u32;
    for ordinal in 0..node_count {
        let count = first_retainer_index[ordinal];
        first_retainer_index[ordinal] = first_unused_slot;
        if count > 0 {
            retaining_nodes.set(first_unused_slot as usize, count);
        }
        first_unused_slot += count;
    }
    first_retainer_index[node_count] = first_unused_slot;

    // Pass 2: walk edges grouped by source, claiming slots back to front.
    for src_ordinal in 0..node_count {
        let src_node_index = (src_ordinal * nf) as u32;
        let first = graph.first_edge_index(src_ordinal);
        let end = graph.end_edge_index(src_ordinal);
        let mut edge_index = first;
        while edge_index < end {
            let to_ordinal = graph.edge_field(edge_index, to_node_offset) as usize / nf;
            let bucket_start = first_retainer_index[to_ordinal] as usize;
            let remaining = retaining_nodes.get(bucket_start) - 1;
            retaining_nodes.set(bucket_start, remaining);
            let slot = bucket_start + remaining as usize;
            retaining_nodes.set(slot, src_node_index);
            retaining_edges.set(slot, edge_index as u32);
            edge_index += ef;
        }
    }

    graph.put_retainer_arrays(retaining_nodes, retaining_edges, first_retainer_index);
    Ok(())
}

//! Heap composition statistics and allocation-sample rebinning.

use super::graph::HeapGraph;
use super::serialize::{Samples, Statistics};
use super::BASE_SYSTEM_DISTANCE;

/// Computes the composition totals for the statistics view.
///
/// Nodes at system distance count toward `system` only. `v8heap` is what
/// remains of the total after native memory is taken out.
pub fn calculate_statistics(
    graph: &HeapGraph,
    distances: &[i32],
    total_size: f64,
) -> Statistics {
    let meta = graph.meta();
    let mut native = 0.0;
    let mut code = 0.0;
    let mut strings = 0.0;
    let mut js_arrays = 0.0;
    let mut system = 0.0;

    for ordinal in 0..graph.node_count() {
        let size = f64::from(graph.node_self_size(ordinal));
        if distances[ordinal] >= BASE_SYSTEM_DISTANCE {
            system += size;
            continue;
        }
        let node_type = graph.node_type(ordinal);
        if node_type == meta.node_type_native {
            native += size;
        } else if node_type == meta.node_type_code {
            code += size;
        } else if graph.node_is_string(ordinal) {
            strings += size;
        } else if node_type == meta.node_type_object && graph.node_name(ordinal) == "Array" {
            js_arrays += array_size(graph, ordinal);
        }
    }

    Statistics {
        total: total_size,
        v8heap: total_size - native,
        native,
        code,
        js_arrays,
        strings,
        system,
    }
}

/// An Array node's cost includes its elements backing store when that store
/// has no other retainer.
fn array_size(graph: &HeapGraph, ordinal: usize) -> f64 {
    let mut size = f64::from(graph.node_self_size(ordinal));
    for edge_index in graph.edges_of(ordinal) {
        if !graph.edge_is_internal(edge_index) {
            continue;
        }
        if graph.edge_name(edge_index) != Some("elements") {
            continue;
        }
        let elements = graph.edge_to_ordinal(edge_index);
        if graph.retainer_count(elements) == 1 {
            size += f64::from(graph.node_self_size(elements));
        }
        break;
    }
    size
}

/// Rebins allocation samples: every odd-id (JS) node lands in the first
/// sample whose `last_assigned_id` covers it; ids past the last bin are
/// dropped.
pub fn build_samples(graph: &HeapGraph, raw_samples: &[u64], sample_fields: &[String]) -> Samples {
    if raw_samples.is_empty() {
        return Samples::default();
    }
    let timestamp_offset = sample_fields
        .iter()
        .position(|f| f == "timestamp_us")
        .unwrap_or(0);
    let id_offset = sample_fields
        .iter()
        .position(|f| f == "last_assigned_id")
        .unwrap_or(1);

    let sample_count = raw_samples.len() / 2;
    let mut timestamps_ms = Vec::with_capacity(sample_count);
    let mut last_assigned_ids = Vec::with_capacity(sample_count);
    for i in 0..sample_count {
        timestamps_ms.push(raw_samples[2 * i + timestamp_offset] as f64 / 1000.0);
        last_assigned_ids.push(raw_samples[2 * i + id_offset] as u32);
    }

    let mut sizes = vec![0.0f64; sample_count];
    for ordinal in 0..graph.node_count() {
        let id = graph.node_id(ordinal);
        // JS objects have odd ids; native objects are not sampled.
        if id % 2 == 0 {
            continue;
        }
        let bin = last_assigned_ids.partition_point(|&last| last < id);
        if bin == sample_count {
            continue;
        }
        sizes[bin] += f64::from(graph.node_self_size(ordinal));
    }

    Samples {
        timestamps_ms,
        last_assigned_ids,
        sizes,
    }
}

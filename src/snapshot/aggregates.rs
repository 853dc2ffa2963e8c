//! Class-based aggregation.
//!
//! One linear scan buckets surviving nodes (positive self size, passing the
//! active filter) by class index, accumulating count, self size, and minimum
//! distance. Maximum retained size per class needs the dominator tree: a DFS
//! from the root adds each node's retained size to its class only when the
//! class has not been seen on the current root-to-node path, so nested
//! instances of one class are not double counted.
//!
//! Engines cache aggregates by filter key and sort each class's index list
//! by node id lazily, on the first request that needs sorted order.

use ahash::AHashMap;
use serde::Serialize;

use super::graph::HeapGraph;
use super::retained::DominatedNodes;

/// Per-class aggregate row.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub count: u32,
    /// Minimum node distance within the class.
    pub distance: i32,
    #[serde(rename = "self")]
    pub self_size: f64,
    pub max_ret: f64,
    /// Node type name of the first node seen.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Class name; populated for object and native nodes only.
    pub name: Option<String>,
    /// Node indexes (field units) of class members.
    pub idxs: Vec<u32>,
}

/// Aggregates keyed by class index, plus lazy sorted-state.
#[derive(Debug, Default)]
pub struct Aggregates {
    pub by_class_index: AHashMap<u32, Aggregate>,
    sorted: bool,
}

impl Aggregates {
    /// Sorts every class's index list by node id, once.
    pub fn ensure_sorted_indexes(&mut self, graph: &HeapGraph) {
        if self.sorted {
            return;
        }
        let nf = graph.meta().node_field_count;
        for aggregate in self.by_class_index.values_mut() {
            aggregate
                .idxs
                .sort_by_key(|&node_index| graph.node_id(node_index as usize / nf));
        }
        self.sorted = true;
    }
}

/// Sorted per-class arrays used by the diff engine. Parallel arrays ordered
/// by ascending node id.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateForDiff {
    pub indexes: Vec<u32>,
    pub ids: Vec<u32>,
    pub self_sizes: Vec<f64>,
}

/// Builds aggregates for nodes passing `filter` (by ordinal).
pub fn build_aggregates(
    graph: &HeapGraph,
    distances: &[i32],
    filter: Option<&dyn Fn(usize) -> bool>,
) -> Aggregates {
    let node_count = graph.node_count();
    let nf = graph.meta().node_field_count;
    let mut by_class_index: AHashMap<u32, Aggregate> = AHashMap::new();

    for ordinal in 0..node_count {
        if let Some(f) = filter {
            if !f(ordinal) {
                continue;
            }
        }
        let self_size = graph.node_self_size(ordinal);
        if self_size == 0 {
            continue;
        }
        let class_index = graph.node_class_index(ordinal);
        let node_index = (ordinal * nf) as u32;
        let distance = distances[ordinal];
        match by_class_index.get_mut(&class_index) {
            Some(aggregate) => {
                aggregate.count += 1;
                aggregate.self_size += f64::from(self_size);
                aggregate.distance = aggregate.distance.min(distance);
                aggregate.idxs.push(node_index);
            }
            None => {
                let name_matters =
                    graph.node_is_object(ordinal) || graph.node_is_native(ordinal);
                by_class_index.insert(
                    class_index,
                    Aggregate {
                        count: 1,
                        distance,
                        self_size: f64::from(self_size),
                        max_ret: 0.0,
                        node_type: graph
                            .meta()
                            .node_type_name(graph.node_type(ordinal))
                            .to_owned(),
                        name: name_matters
                            .then(|| graph.node_class_name(ordinal).to_owned()),
                        idxs: vec![node_index],
                    },
                );
            }
        }
    }

    Aggregates {
        by_class_index,
        sorted: false,
    }
}

/// Fills `max_ret` by walking the dominator tree from the root.
///
/// A class's retained size counts a node only when no ancestor on the
/// current path already counted for the same class.
pub fn calculate_classes_retained_size(
    graph: &HeapGraph,
    aggregates: &mut Aggregates,
    dominated: &DominatedNodes,
    retained_sizes: &[f64],
    filter: Option<&dyn Fn(usize) -> bool>,
) {
    let nf = graph.meta().node_field_count;
    let root = graph.root_ordinal();

    let mut list: Vec<usize> = vec![root];
    // Stack of (list length at push, class) marking where a class entered
    // the path; popped when the DFS recedes past that depth.
    let mut sizes: Vec<usize> = vec![usize::MAX];
    let mut class_stack: Vec<u32> = Vec::new();
    let mut seen: AHashMap<u32, bool> = AHashMap::new();

    while let Some(ordinal) = list.pop() {
        let class_index = graph.node_class_index(ordinal);
        let already_seen = seen.get(&class_index).copied().unwrap_or(false);
        let from = dominated.first_dominated_node_index[ordinal] as usize;
        let to = dominated.first_dominated_node_index[ordinal + 1] as usize;

        let passes = filter.map_or(true, |f| f(ordinal));
        if !already_seen && passes && graph.node_self_size(ordinal) != 0 {
            if let Some(aggregate) = aggregates.by_class_index.get_mut(&class_index) {
                aggregate.max_ret += retained_sizes[ordinal];
                if from != to {
                    seen.insert(class_index, true);
                    sizes.push(list.len());
                    class_stack.push(class_index);
                }
            }
        }

        for slot in from..to {
            list.push(dominated.dominated_nodes[slot] as usize / nf);
        }

        while sizes.last() == Some(&list.len()) {
            sizes.pop();
            let class_index = class_stack.pop().expect("class stack underflow");
            seen.insert(class_index, false);
        }
    }
}

/// Extracts the sorted per-class arrays the diff engine consumes, keyed by
/// class name (class indexes are not stable across snapshots).
pub fn aggregates_for_diff(
    graph: &HeapGraph,
    aggregates: &Aggregates,
) -> AHashMap<String, AggregateForDiff> {
    debug_assert!(aggregates.sorted, "diff extraction needs sorted indexes");
    let nf = graph.meta().node_field_count;
    let mut result: AHashMap<String, AggregateForDiff> = AHashMap::new();
    for (&class_index, aggregate) in &aggregates.by_class_index {
        let class_name = graph.strings().get(class_index as usize).to_owned();
        let mut row = AggregateForDiff {
            indexes: aggregate.idxs.clone(),
            ids: Vec::with_capacity(aggregate.idxs.len()),
            self_sizes: Vec::with_capacity(aggregate.idxs.len()),
        };
        for &node_index in &aggregate.idxs {
            let ordinal = node_index as usize / nf;
            row.ids.push(graph.node_id(ordinal));
            row.self_sizes.push(f64::from(graph.node_self_size(ordinal)));
        }
        result.insert(class_name, row);
    }
    result
}

//! The snapshot engine: build pipeline and queries.
//!
//! [`HeapSnapshot::build`] is the only mutation entry point. It runs the
//! analysis passes in dependency order, publishing a milestone per stage and
//! polling the cancel token, and returns an engine whose derived arrays
//! never change again. Queries are pure over those arrays; the aggregate,
//! diff, and named-filter caches are engine-owned and reset explicitly.
//!
//! The retainers-view state (ignored nodes, their distance field, and the
//! ignored-edge set) is the one piece of post-build mutability; toggling it
//! recomputes both structures before returning.

use std::cmp::Ordering;

use ahash::{AHashMap, AHashSet};

use crate::stdx::DynamicBitSet;

use super::aggregates::{
    aggregates_for_diff, build_aggregates, calculate_classes_retained_size, Aggregate,
    AggregateForDiff, Aggregates,
};
use super::class_names::assign_class_indexes;
use super::diff::{calculate_snapshot_diff, Diff};
use super::distance::calculate_distances;
use super::dom_state::propagate_dom_state;
use super::dominators::build_dominator_tree;
use super::errors::{BuildError, QueryError};
use super::essential::EssentialEdges;
use super::filters::{build_named_filter, NamedFilter, NamedFilterBits};
use super::flags::calculate_flags;
use super::graph::HeapGraph;
use super::input::RawSnapshot;
use super::locations::LocationMap;
use super::meta::SnapshotMeta;
use super::postorder::build_post_order;
use super::progress::{CancelToken, NullProgress, ProgressSink, StructuralReport};
use super::provider::{ComparatorConfig, ItemProvider};
use super::retained::{build_dominated_nodes, calculate_retained_sizes, DominatedNodes};
use super::retainers::build_retainers;
use super::search::{search, SearchConfig};
use super::serialize::{
    ItemsRange, Location, Samples, SerializedEdge, SerializedNode, StaticData, Statistics,
};
use super::statistics::{build_samples, calculate_statistics};
use super::{BASE_UNREACHABLE_DISTANCE, FLAG_CAN_BE_QUERIED, FLAG_DETACHED_DOM_TREE_NODE};

/// Node-population filter for aggregation and search.
#[derive(Clone, Debug)]
pub enum AggregateFilter {
    /// Every node.
    All,
    /// Nodes allocated between two snapshots: `min_id < id <= max_id`.
    NodeIdRange { min_id: u32, max_id: u32 },
    /// Nodes attributed to an allocation-profile node. The trace ids come
    /// from the external profile's `traceIds(node_id)`.
    Allocation { node_id: u32, trace_ids: Vec<u32> },
    /// One of the engine's named filters.
    Named(NamedFilter),
}

impl AggregateFilter {
    /// Cache key for aggregate results.
    pub fn key(&self) -> String {
        match self {
            Self::All => "allObjects".to_owned(),
            Self::NodeIdRange { min_id, max_id } => format!("NodeIdRange: {min_id}..{max_id}"),
            Self::Allocation { node_id, .. } => format!("AllocationNodeId: {node_id}"),
            Self::Named(filter) => filter.name().to_owned(),
        }
    }
}

/// Fully analyzed heap snapshot.
#[derive(Debug)]
pub struct HeapSnapshot {
    graph: HeapGraph,
    node_flags: Vec<u32>,
    node_distances: Vec<i32>,
    dominators_tree: Vec<u32>,
    retained_sizes: Vec<f64>,
    dominated: DominatedNodes,
    essential: EssentialEdges,
    location_map: LocationMap,
    statistics: Statistics,
    samples: Samples,
    total_size: f64,
    max_js_node_id: u32,
    report: StructuralReport,
    /// Allocation-profile passthrough for the external consumer.
    trace_function_infos: Vec<u32>,
    trace_tree: Vec<i64>,

    ids_to_ordinals: Option<AHashMap<u32, u32>>,
    aggregates_cache: AHashMap<String, Aggregates>,
    aggregates_for_diff_cache: Option<AHashMap<String, AggregateForDiff>>,
    diff_cache: AHashMap<String, AHashMap<String, Diff>>,
    named_filter_cache: AHashMap<&'static str, NamedFilterBits>,

    ignored_nodes_in_retainers_view: AHashSet<usize>,
    distances_for_retainers_view: Option<Vec<i32>>,
    ignored_edges_in_retainers_view: Option<DynamicBitSet>,
}

impl HeapSnapshot {
    /// Builds the analytical model with no progress reporting.
    pub fn from_raw(input: RawSnapshot) -> Result<Self, BuildError> {
        Self::build(input, &NullProgress, &CancelToken::new())
    }

    /// Runs the full analysis pipeline.
    pub fn build(
        input: RawSnapshot,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Self, BuildError> {
        let RawSnapshot {
            meta: raw_meta,
            nodes,
            edges,
            strings,
            locations,
            samples: raw_samples,
            trace_function_infos,
            trace_tree,
            root_index,
        } = input;

        let total_steps = 12u64;
        let mut step = 0u64;
        let mut milestone = |status: &str| -> Result<(), BuildError> {
            if cancel.is_canceled() {
                return Err(BuildError::Canceled);
            }
            progress.update(status, step, total_steps);
            step += 1;
            Ok(())
        };

        milestone("Building edge indexes")?;
        let meta = SnapshotMeta::resolve(&raw_meta)?;
        let sample_fields = raw_meta.sample_fields;
        let mut graph = HeapGraph::new(nodes, edges, strings, root_index, meta)?;

        milestone("Building retainers")?;
        build_retainers(&mut graph)?;

        let mut node_flags = vec![0u32; graph.node_count()];
        milestone("Propagating DOM state")?;
        propagate_dom_state(&mut graph, &mut node_flags);

        milestone("Calculating node flags")?;
        calculate_flags(&graph, &mut node_flags);

        milestone("Calculating shallow sizes")?;
        super::owners::reassign_shallow_sizes(&mut graph)?;

        milestone("Calculating distances")?;
        let node_distances = calculate_distances(&graph, None, cancel)?;

        let mut essential = EssentialEdges::new();
        let mut report = StructuralReport::new();
        milestone("Building postorder index")?;
        let post_order =
            build_post_order(&graph, &mut essential, &node_flags, &mut report, cancel)?;

        milestone("Building dominator tree")?;
        let dominators_tree =
            build_dominator_tree(&graph, &mut essential, &node_flags, &post_order, cancel)?;

        milestone("Calculating retained sizes")?;
        let retained_sizes = calculate_retained_sizes(&graph, &post_order, &dominators_tree);
        let dominated = build_dominated_nodes(&graph, &dominators_tree);

        milestone("Calculating object names")?;
        assign_class_indexes(&mut graph)?;

        milestone("Calculating statistics")?;
        let total_size = retained_sizes[graph.root_ordinal()];
        let statistics = calculate_statistics(&graph, &node_distances, total_size);
        let max_js_node_id = (0..graph.node_count())
            .map(|o| graph.node_id(o))
            .filter(|id| id % 2 == 1)
            .max()
            .unwrap_or(0);

        milestone("Building locations and samples")?;
        let location_map = LocationMap::build(graph.meta(), &locations)?;
        let samples = build_samples(&graph, &raw_samples, &sample_fields);

        progress.update("Finished processing", total_steps, total_steps);

        Ok(Self {
            graph,
            node_flags,
            node_distances,
            dominators_tree,
            retained_sizes,
            dominated,
            essential,
            location_map,
            statistics,
            samples,
            total_size,
            max_js_node_id,
            report,
            trace_function_infos,
            trace_tree,
            ids_to_ordinals: None,
            aggregates_cache: AHashMap::new(),
            aggregates_for_diff_cache: None,
            diff_cache: AHashMap::new(),
            named_filter_cache: AHashMap::new(),
            ignored_nodes_in_retainers_view: AHashSet::new(),
            distances_for_retainers_view: None,
            ignored_edges_in_retainers_view: None,
        })
    }

    // ------------------------------------------------------------------
    // Plain accessors
    // ------------------------------------------------------------------

    #[inline]
    pub fn graph(&self) -> &HeapGraph {
        &self.graph
    }

    pub fn static_data(&self) -> StaticData {
        StaticData {
            node_count: self.graph.node_count(),
            root_node_index: self.graph.root_node_index(),
            total_size: self.total_size,
            max_js_node_id: self.max_js_node_id,
        }
    }

    #[inline]
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    #[inline]
    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    #[inline]
    pub fn structural_report(&self) -> &StructuralReport {
        &self.report
    }

    #[inline]
    pub fn total_size(&self) -> f64 {
        self.total_size
    }

    #[inline]
    pub fn node_distance(&self, ordinal: usize) -> i32 {
        self.node_distances[ordinal]
    }

    #[inline]
    pub fn retained_size(&self, ordinal: usize) -> f64 {
        self.retained_sizes[ordinal]
    }

    #[inline]
    pub fn dominator_of(&self, ordinal: usize) -> usize {
        self.dominators_tree[ordinal] as usize
    }

    #[inline]
    pub fn node_flags(&self, ordinal: usize) -> u32 {
        self.node_flags[ordinal]
    }

    /// Dominated children of a node, as node indexes (field units).
    pub fn dominated_children(&self, ordinal: usize) -> &[u32] {
        let from = self.dominated.first_dominated_node_index[ordinal] as usize;
        let to = self.dominated.first_dominated_node_index[ordinal + 1] as usize;
        &self.dominated.dominated_nodes[from..to]
    }

    /// Allocation-profile passthrough: the snapshot's trace metadata.
    pub fn trace_data(&self) -> (&[u32], &[i64]) {
        (&self.trace_function_infos, &self.trace_tree)
    }

    /// Trace node id of a heap node (0 when absent).
    pub fn trace_node_id(&self, ordinal: usize) -> u32 {
        self.graph.node_trace_node_id(ordinal)
    }

    /// Source location of a node, when the snapshot recorded one.
    pub fn get_location(&self, node_index: usize) -> Option<Location> {
        self.location_map.get(node_index)
    }

    /// Class name of the node with the given snapshot object id.
    pub fn class_name_for_object_id(&mut self, id: u32) -> Option<&str> {
        self.ensure_id_map();
        let map = self.ids_to_ordinals.as_ref().expect("id map just built");
        let &ordinal = map.get(&id)?;
        Some(self.graph.node_class_name(ordinal as usize))
    }

    fn ensure_id_map(&mut self) {
        if self.ids_to_ordinals.is_some() {
            return;
        }
        let mut map = AHashMap::with_capacity(self.graph.node_count());
        for ordinal in 0..self.graph.node_count() {
            map.insert(self.graph.node_id(ordinal), ordinal as u32);
        }
        self.ids_to_ordinals = Some(map);
    }

    /// Drops every cached query result.
    pub fn reset_caches(&mut self) {
        self.aggregates_cache.clear();
        self.aggregates_for_diff_cache = None;
        self.diff_cache.clear();
        self.named_filter_cache.clear();
        self.ids_to_ordinals = None;
    }

    // ------------------------------------------------------------------
    // Aggregates and diff
    // ------------------------------------------------------------------

    fn ensure_named_filter(&mut self, filter: NamedFilter) {
        if self.named_filter_cache.contains_key(filter.name()) {
            return;
        }
        let bits = build_named_filter(&self.graph, &self.node_distances, filter);
        self.named_filter_cache.insert(filter.name(), bits);
    }

    /// Whether a node passes a filter. Named filters must be built first.
    fn filter_passes(&self, filter: &AggregateFilter, ordinal: usize) -> bool {
        match filter {
            AggregateFilter::All => true,
            AggregateFilter::NodeIdRange { min_id, max_id } => {
                let id = self.graph.node_id(ordinal);
                id > *min_id && id <= *max_id
            }
            AggregateFilter::Allocation { trace_ids, .. } => {
                trace_ids.contains(&self.graph.node_trace_node_id(ordinal))
            }
            AggregateFilter::Named(named) => self
                .named_filter_cache
                .get(named.name())
                .map_or(false, |bits| bits.passes(ordinal)),
        }
    }

    /// Aggregates for the filtered node population, cached by filter key.
    /// With `sorted_indexes`, each class's index list is ordered by node id.
    pub fn aggregates(
        &mut self,
        filter: &AggregateFilter,
        sorted_indexes: bool,
    ) -> &AHashMap<u32, Aggregate> {
        if let AggregateFilter::Named(named) = filter {
            self.ensure_named_filter(*named);
        }
        let key = filter.key();
        if !self.aggregates_cache.contains_key(&key) {
            let predicate = |ordinal: usize| self.filter_passes(filter, ordinal);
            let uses_filter = !matches!(filter, AggregateFilter::All);
            let filter_arg: Option<&dyn Fn(usize) -> bool> =
                if uses_filter { Some(&predicate) } else { None };
            let mut aggregates =
                build_aggregates(&self.graph, &self.node_distances, filter_arg);
            calculate_classes_retained_size(
                &self.graph,
                &mut aggregates,
                &self.dominated,
                &self.retained_sizes,
                filter_arg,
            );
            self.aggregates_cache.insert(key.clone(), aggregates);
        }
        let graph = &self.graph;
        let aggregates = self
            .aggregates_cache
            .get_mut(&key)
            .expect("aggregate cache entry just inserted");
        if sorted_indexes {
            aggregates.ensure_sorted_indexes(graph);
        }
        &aggregates.by_class_index
    }

    /// Aggregates keyed by class name instead of class index, for callers
    /// that address classes by display name.
    pub fn aggregates_by_class_name(
        &mut self,
        filter: &AggregateFilter,
        sorted_indexes: bool,
    ) -> AHashMap<String, Aggregate> {
        self.aggregates(filter, sorted_indexes);
        let graph = &self.graph;
        self.aggregates_cache
            .get(&filter.key())
            .expect("aggregates just built")
            .by_class_index
            .iter()
            .map(|(&class_index, aggregate)| {
                (
                    graph.strings().get(class_index as usize).to_owned(),
                    aggregate.clone(),
                )
            })
            .collect()
    }

    /// Sorted per-class arrays for diffing, built from the unfiltered
    /// aggregates and cached.
    pub fn aggregates_for_diff(&mut self) -> &AHashMap<String, AggregateForDiff> {
        if self.aggregates_for_diff_cache.is_none() {
            self.aggregates(&AggregateFilter::All, true);
            let aggregates = self
                .aggregates_cache
                .get(&AggregateFilter::All.key())
                .expect("unfiltered aggregates just built");
            let for_diff = aggregates_for_diff(&self.graph, aggregates);
            self.aggregates_for_diff_cache = Some(for_diff);
        }
        self.aggregates_for_diff_cache
            .as_ref()
            .expect("diff aggregates just built")
    }

    /// Diff of this snapshot against a base snapshot's per-class arrays,
    /// cached by the base snapshot id.
    pub fn calculate_snapshot_diff(
        &mut self,
        base_snapshot_id: &str,
        base_aggregates: &AHashMap<String, AggregateForDiff>,
    ) -> &AHashMap<String, Diff> {
        if !self.diff_cache.contains_key(base_snapshot_id) {
            let current = self.aggregates_for_diff();
            let diff = calculate_snapshot_diff(base_aggregates, current);
            self.diff_cache.insert(base_snapshot_id.to_owned(), diff);
        }
        self.diff_cache
            .get(base_snapshot_id)
            .expect("diff cache entry just inserted")
    }

    /// Returns the cached diff for a base snapshot id computed earlier by
    /// [`calculate_snapshot_diff`](Self::calculate_snapshot_diff).
    pub fn cached_diff(
        &self,
        base_snapshot_id: &str,
    ) -> Result<&AHashMap<String, Diff>, QueryError> {
        self.diff_cache
            .get(base_snapshot_id)
            .ok_or_else(|| QueryError::UnknownBaseSnapshot {
                base_id: base_snapshot_id.to_owned(),
            })
    }

    /// Resolves a named filter into a per-ordinal predicate handle.
    pub fn named_filter(&mut self, name: &str) -> Result<&NamedFilterBits, QueryError> {
        let named = NamedFilter::from_name(name).ok_or_else(|| QueryError::UnknownFilter {
            name: name.to_owned(),
        })?;
        self.ensure_named_filter(named);
        Ok(self
            .named_filter_cache
            .get(named.name())
            .expect("named filter just built"))
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// Searches node names and ids; returns matching node indexes.
    pub fn search(
        &mut self,
        config: &SearchConfig,
        filter: Option<&AggregateFilter>,
    ) -> Result<Vec<u32>, QueryError> {
        if let Some(AggregateFilter::Named(named)) = filter {
            self.ensure_named_filter(*named);
        }
        match filter {
            Some(filter) => {
                let predicate = |ordinal: usize| self.filter_passes(filter, ordinal);
                search(&self.graph, config, Some(&predicate))
            }
            None => search(&self.graph, config, None),
        }
    }

    // ------------------------------------------------------------------
    // Retainers view
    // ------------------------------------------------------------------

    /// Hides a node from retainer paths and recomputes the retainers-view
    /// distances and ignored-edge set before returning.
    pub fn ignore_node_in_retainers_view(&mut self, node_index: usize) {
        let ordinal = self.graph.to_ordinal(node_index);
        self.ignored_nodes_in_retainers_view.insert(ordinal);
        self.recompute_retainers_view();
    }

    /// Makes a node visible in retainer paths again.
    pub fn unignore_node_in_retainers_view(&mut self, node_index: usize) {
        let ordinal = self.graph.to_ordinal(node_index);
        self.ignored_nodes_in_retainers_view.remove(&ordinal);
        self.recompute_retainers_view();
    }

    /// Clears the ignored-node set.
    pub fn unignore_all_nodes_in_retainers_view(&mut self) {
        self.ignored_nodes_in_retainers_view.clear();
        self.recompute_retainers_view();
    }

    pub fn are_nodes_ignored_in_retainers_view(&self) -> bool {
        !self.ignored_nodes_in_retainers_view.is_empty()
    }

    fn recompute_retainers_view(&mut self) {
        if self.ignored_nodes_in_retainers_view.is_empty() {
            self.distances_for_retainers_view = None;
            self.ignored_edges_in_retainers_view = None;
            return;
        }
        let ignored = &self.ignored_nodes_in_retainers_view;
        let filter = |graph: &HeapGraph, _src: usize, edge_index: usize| {
            !ignored.contains(&graph.edge_to_ordinal(edge_index))
        };
        let distances = calculate_distances(&self.graph, Some(&filter), &CancelToken::new())
            .expect("distance recompute cannot be cancelled");
        self.distances_for_retainers_view = Some(distances);
        self.update_ignored_edges_in_retainers_view();
    }

    /// Completes WeakMap pairs in the ignored-edge set: the table's copy of
    /// a pair edge is hidden when the pair's key node became unreachable in
    /// the retainers view, otherwise the value would still appear retained
    /// by the map alone.
    fn update_ignored_edges_in_retainers_view(&mut self) {
        self.ensure_id_map();
        let distances = self
            .distances_for_retainers_view
            .as_ref()
            .expect("retainers-view distances computed first");
        let ids = self.ids_to_ordinals.as_ref().expect("id map just built");
        let graph = &self.graph;
        let meta = graph.meta();
        let ef = meta.edge_field_count;
        let parser = self.essential.ephemeron_parser_mut();

        let mut ignored_edges = DynamicBitSet::empty(graph.edge_count());
        for record in 0..graph.edge_count() {
            let edge_index = record * ef;
            if !graph.edge_is_internal(edge_index) {
                continue;
            }
            let name_index = graph.edge_name_or_index(edge_index);
            let Some(pair) = parser.parse(graph.strings(), name_index) else {
                continue;
            };
            let key_unreachable = ids
                .get(&pair.key_id)
                .map_or(true, |&key_ordinal| {
                    distances[key_ordinal as usize] == super::NO_DISTANCE
                });
            if key_unreachable {
                ignored_edges.set(record);
            }
        }
        self.ignored_edges_in_retainers_view = Some(ignored_edges);
    }

    /// Whether an edge is hidden in the retainers view.
    pub fn is_edge_ignored_in_retainers_view(&self, edge_index: usize) -> bool {
        let ef = self.graph.meta().edge_field_count;
        self.ignored_edges_in_retainers_view
            .as_ref()
            .is_some_and(|bits| bits.is_set(edge_index / ef))
    }

    fn retainers_view_distance(&self, ordinal: usize) -> i32 {
        match &self.distances_for_retainers_view {
            Some(distances) => distances[ordinal],
            None => self.node_distances[ordinal],
        }
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serializes a node row, optionally overriding its distance.
    pub fn serialize_node(&self, ordinal: usize, distance: Option<i32>) -> SerializedNode {
        let flags = self.node_flags[ordinal];
        SerializedNode {
            id: self.graph.node_id(ordinal),
            name: self.graph.node_name(ordinal).to_owned(),
            distance: distance.unwrap_or(self.node_distances[ordinal]),
            node_index: self.graph.to_node_index(ordinal) as u32,
            retained_size: self.retained_sizes[ordinal],
            self_size: f64::from(self.graph.node_self_size(ordinal)),
            node_type: self
                .graph
                .meta()
                .node_type_name(self.graph.node_type(ordinal))
                .to_owned(),
            can_be_queried: Some(flags & FLAG_CAN_BE_QUERIED != 0),
            detached_dom_tree_node: (flags & FLAG_DETACHED_DOM_TREE_NODE != 0).then_some(true),
        }
    }

    fn edge_display_name(&self, edge_index: usize) -> String {
        match self.graph.edge_name(edge_index) {
            Some(name) => name.to_owned(),
            None => self.graph.edge_name_or_index(edge_index).to_string(),
        }
    }

    /// Serializes a containment edge: the target node with the edge label.
    pub fn serialize_edge(&self, edge_index: usize) -> SerializedEdge {
        let target = self.graph.edge_to_ordinal(edge_index);
        SerializedEdge {
            name: self.edge_display_name(edge_index),
            node: self.serialize_node(target, None),
            edge_type: self
                .graph
                .meta()
                .edge_type_name(self.graph.edge_type(edge_index))
                .to_owned(),
            edge_index: edge_index as u32,
        }
    }

    /// Serializes a retainer slot: the retaining node with the edge label.
    /// Edges hidden in the retainers view read as unreachable.
    pub fn serialize_retainer(&self, slot: usize) -> SerializedEdge {
        let edge_index = self.graph.retaining_edge_index(slot);
        let source = self.graph.to_ordinal(self.graph.retaining_node_index(slot));
        let distance = if self.is_edge_ignored_in_retainers_view(edge_index) {
            BASE_UNREACHABLE_DISTANCE
        } else {
            self.retainers_view_distance(source)
        };
        SerializedEdge {
            name: self.edge_display_name(edge_index),
            node: self.serialize_node(source, Some(distance)),
            edge_type: self
                .graph
                .meta()
                .edge_type_name(self.graph.edge_type(edge_index))
                .to_owned(),
            edge_index: edge_index as u32,
        }
    }

    // ------------------------------------------------------------------
    // Providers
    // ------------------------------------------------------------------

    /// Provider over the outgoing edges of a node.
    pub fn create_edges_provider(&self, node_index: usize) -> EdgesProvider {
        let ordinal = self.graph.to_ordinal(node_index);
        let order: Vec<u32> = self.graph.edges_of(ordinal).map(|e| e as u32).collect();
        EdgesProvider {
            items: ItemProvider::new(order),
            comparator: None,
        }
    }

    /// Provider over the retainer slots of a node.
    pub fn create_retaining_edges_provider(&self, node_index: usize) -> RetainersProvider {
        let ordinal = self.graph.to_ordinal(node_index);
        let order: Vec<u32> = (self.graph.first_retainer_slot(ordinal)
            ..self.graph.end_retainer_slot(ordinal))
            .map(|s| s as u32)
            .collect();
        RetainersProvider {
            items: ItemProvider::new(order),
            comparator: None,
        }
    }

    /// Provider over the member nodes of a class, restricted by a filter.
    pub fn create_nodes_provider_for_class(
        &mut self,
        class_name: &str,
        filter: &AggregateFilter,
    ) -> NodesProvider {
        self.aggregates(filter, false);
        let key = filter.key();
        let graph = &self.graph;
        let order = self
            .aggregates_cache
            .get(&key)
            .expect("aggregates just built")
            .by_class_index
            .iter()
            .find(|(&class_index, _)| graph.strings().get(class_index as usize) == class_name)
            .map(|(_, aggregate)| aggregate.idxs.clone())
            .unwrap_or_default();
        NodesProvider {
            items: ItemProvider::new(order),
            comparator: None,
        }
    }

    /// Provider over explicit node indexes (search results).
    pub fn create_nodes_provider(&self, node_indexes: Vec<u32>) -> NodesProvider {
        NodesProvider {
            items: ItemProvider::new(node_indexes),
            comparator: None,
        }
    }

    // ------------------------------------------------------------------
    // Comparators
    // ------------------------------------------------------------------

    fn compare_node_field(&self, field: &str, a_ordinal: usize, b_ordinal: usize) -> Ordering {
        match field {
            "name" => self
                .graph
                .node_name(a_ordinal)
                .cmp(self.graph.node_name(b_ordinal)),
            "distance" => self.node_distances[a_ordinal].cmp(&self.node_distances[b_ordinal]),
            "selfSize" | "shallowSize" => {
                let a = self.graph.node_self_size(a_ordinal);
                let b = self.graph.node_self_size(b_ordinal);
                a.cmp(&b)
            }
            "retainedSize" => self.retained_sizes[a_ordinal]
                .partial_cmp(&self.retained_sizes[b_ordinal])
                .unwrap_or(Ordering::Equal),
            _ => self.graph.node_id(a_ordinal).cmp(&self.graph.node_id(b_ordinal)),
        }
    }

    /// `__proto__` sorts last regardless of direction; string-named edges
    /// sort before index-named ones; otherwise lexicographic / numeric.
    fn compare_edge_names(&self, a_edge: usize, b_edge: usize, ascending: bool) -> Ordering {
        let a_name = self.graph.edge_name(a_edge);
        let b_name = self.graph.edge_name(b_edge);
        match (a_name, b_name) {
            (Some("__proto__"), Some("__proto__")) => Ordering::Equal,
            (Some("__proto__"), _) => return Ordering::Greater,
            (_, Some("__proto__")) => return Ordering::Less,
            _ => Ordering::Equal,
        }
        .then_with(|| {
            let result = match (a_name, b_name) {
                (Some(a), Some(b)) => a.cmp(b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => self
                    .graph
                    .edge_name_or_index(a_edge)
                    .cmp(&self.graph.edge_name_or_index(b_edge)),
            };
            if ascending {
                result
            } else {
                result.reverse()
            }
        })
    }

    fn compare_edge_field(
        &self,
        field: &str,
        ascending: bool,
        a_edge: usize,
        b_edge: usize,
        a_node: usize,
        b_node: usize,
    ) -> Ordering {
        if field == "!edgeName" {
            return self.compare_edge_names(a_edge, b_edge, ascending);
        }
        let result = if field == "!edgeDistance" {
            self.retainers_view_distance(a_node)
                .cmp(&self.retainers_view_distance(b_node))
        } else {
            self.compare_node_field(field, a_node, b_node)
        };
        if ascending {
            result
        } else {
            result.reverse()
        }
    }

    fn edge_comparator<'a>(
        &'a self,
        config: &'a ComparatorConfig,
        retainer: bool,
    ) -> impl Fn(u32, u32) -> Ordering + 'a {
        move |a_item: u32, b_item: u32| {
            let (a_edge, a_node) = self.resolve_edge_item(a_item, retainer);
            let (b_edge, b_node) = self.resolve_edge_item(b_item, retainer);
            self.compare_edge_field(
                &config.field_name1,
                config.ascending1,
                a_edge,
                b_edge,
                a_node,
                b_node,
            )
            .then_with(|| {
                self.compare_edge_field(
                    &config.field_name2,
                    config.ascending2,
                    a_edge,
                    b_edge,
                    a_node,
                    b_node,
                )
            })
            .then_with(|| a_item.cmp(&b_item))
        }
    }

    /// Resolves a provider item to `(edge_index, node_ordinal)`: the target
    /// node for containment edges, the retaining node for retainer slots.
    fn resolve_edge_item(&self, item: u32, retainer: bool) -> (usize, usize) {
        if retainer {
            let slot = item as usize;
            let edge_index = self.graph.retaining_edge_index(slot);
            let source = self.graph.to_ordinal(self.graph.retaining_node_index(slot));
            (edge_index, source)
        } else {
            let edge_index = item as usize;
            (edge_index, self.graph.edge_to_ordinal(edge_index))
        }
    }

    fn node_comparator<'a>(
        &'a self,
        config: &'a ComparatorConfig,
    ) -> impl Fn(u32, u32) -> Ordering + 'a {
        let nf = self.graph.meta().node_field_count;
        move |a_item: u32, b_item: u32| {
            let a = a_item as usize / nf;
            let b = b_item as usize / nf;
            let first = self.compare_node_field(&config.field_name1, a, b);
            let first = if config.ascending1 { first } else { first.reverse() };
            first
                .then_with(|| {
                    let second = self.compare_node_field(&config.field_name2, a, b);
                    if config.ascending2 {
                        second
                    } else {
                        second.reverse()
                    }
                })
                .then_with(|| a_item.cmp(&b_item))
        }
    }
}

/// Windowed provider over a node's outgoing edges.
pub struct EdgesProvider {
    items: ItemProvider,
    comparator: Option<ComparatorConfig>,
}

impl EdgesProvider {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Installs a comparator and forgets previous sort progress.
    pub fn sort_and_rewind(&mut self, comparator: ComparatorConfig) {
        self.comparator = Some(comparator);
        self.items.rewind();
    }

    pub fn serialize_items_range(
        &mut self,
        snapshot: &HeapSnapshot,
        begin: usize,
        end: usize,
    ) -> Result<ItemsRange<SerializedEdge>, QueryError> {
        match &self.comparator {
            Some(config) => {
                let comparator = snapshot.edge_comparator(config, false);
                self.items.serialize_items_range(begin, end, Some(&comparator), |item| {
                    snapshot.serialize_edge(item as usize)
                })
            }
            None => self.items.serialize_items_range(begin, end, None, |item| {
                snapshot.serialize_edge(item as usize)
            }),
        }
    }
}

/// Windowed provider over a node's retainer edges.
pub struct RetainersProvider {
    items: ItemProvider,
    comparator: Option<ComparatorConfig>,
}

impl RetainersProvider {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn sort_and_rewind(&mut self, comparator: ComparatorConfig) {
        self.comparator = Some(comparator);
        self.items.rewind();
    }

    pub fn serialize_items_range(
        &mut self,
        snapshot: &HeapSnapshot,
        begin: usize,
        end: usize,
    ) -> Result<ItemsRange<SerializedEdge>, QueryError> {
        match &self.comparator {
            Some(config) => {
                let comparator = snapshot.edge_comparator(config, true);
                self.items.serialize_items_range(begin, end, Some(&comparator), |item| {
                    snapshot.serialize_retainer(item as usize)
                })
            }
            None => self.items.serialize_items_range(begin, end, None, |item| {
                snapshot.serialize_retainer(item as usize)
            }),
        }
    }
}

/// Windowed provider over node indexes (class members, search results).
pub struct NodesProvider {
    items: ItemProvider,
    comparator: Option<ComparatorConfig>,
}

impl NodesProvider {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn sort_and_rewind(&mut self, comparator: ComparatorConfig) {
        self.comparator = Some(comparator);
        self.items.rewind();
    }

    pub fn serialize_items_range(
        &mut self,
        snapshot: &HeapSnapshot,
        begin: usize,
        end: usize,
    ) -> Result<ItemsRange<SerializedNode>, QueryError> {
        let nf = snapshot.graph.meta().node_field_count;
        match &self.comparator {
            Some(config) => {
                let comparator = snapshot.node_comparator(config);
                self.items.serialize_items_range(begin, end, Some(&comparator), |item| {
                    snapshot.serialize_node(item as usize / nf, None)
                })
            }
            None => self.items.serialize_items_range(begin, end, None, |item| {
                snapshot.serialize_node(item as usize / nf, None)
            }),
        }
    }
}

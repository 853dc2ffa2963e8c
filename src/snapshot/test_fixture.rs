//! In-test snapshot builder.
//!
//! Builds `RawSnapshot` values with the standard meta-schema so unit tests
//! can describe graphs as nodes and edges instead of hand-packed arrays.
//! Ordinals returned by the node methods match graph ordinals.

use super::graph::HeapGraph;
use super::input::{FieldType, RawMeta, RawSnapshot};
use super::meta::SnapshotMeta;
use super::retainers::build_retainers;
use super::errors::SnapshotDataError;

const NODE_TYPES: &[&str] = &[
    "hidden",
    "array",
    "string",
    "object",
    "code",
    "closure",
    "regexp",
    "number",
    "native",
    "synthetic",
    "concatenated string",
    "sliced string",
];

const EDGE_TYPES: &[&str] = &[
    "context",
    "element",
    "property",
    "internal",
    "hidden",
    "shortcut",
    "weak",
];

struct NodeSpec {
    type_index: u32,
    name: String,
    id: u32,
    self_size: u32,
    detachedness: u32,
}

struct EdgeSpec {
    src: usize,
    type_index: u32,
    name_or_index: NameOrIndex,
    to: usize,
}

enum NameOrIndex {
    Name(String),
    Index(u32),
}

/// Test-only snapshot builder with the standard meta-schema.
pub struct SnapshotBuilder {
    nodes: Vec<NodeSpec>,
    edges: Vec<EdgeSpec>,
    samples: Vec<u64>,
    locations: Vec<(usize, u32, u32, u32)>,
    with_detachedness: bool,
    next_js_id: u32,
    next_native_id: u32,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            samples: Vec::new(),
            locations: Vec::new(),
            with_detachedness: false,
            next_js_id: 1,
            next_native_id: 2,
        }
    }

    fn type_index(name: &str) -> u32 {
        NODE_TYPES
            .iter()
            .position(|t| *t == name)
            .expect("unknown node type in fixture") as u32
    }

    fn edge_type_index(name: &str) -> u32 {
        EDGE_TYPES
            .iter()
            .position(|t| *t == name)
            .expect("unknown edge type in fixture") as u32
    }

    fn push_node(&mut self, type_name: &str, name: &str, id: u32, self_size: u32) -> usize {
        let ordinal = self.nodes.len();
        self.nodes.push(NodeSpec {
            type_index: Self::type_index(type_name),
            name: name.to_owned(),
            id,
            self_size,
            detachedness: 0,
        });
        ordinal
    }

    fn next_js_id(&mut self) -> u32 {
        let id = self.next_js_id;
        self.next_js_id += 2;
        id
    }

    fn next_native_id(&mut self) -> u32 {
        let id = self.next_native_id;
        self.next_native_id += 2;
        id
    }

    /// Adds the synthetic root node. Call first: the root must be ordinal 0.
    pub fn root(&mut self) -> usize {
        assert!(self.nodes.is_empty(), "root must be the first node");
        let id = self.next_js_id();
        self.push_node("synthetic", "", id, 0)
    }

    pub fn object(&mut self, name: &str, self_size: u32) -> usize {
        let id = self.next_js_id();
        self.push_node("object", name, id, self_size)
    }

    pub fn object_with_id(&mut self, name: &str, self_size: u32, id: u32) -> usize {
        self.push_node("object", name, id, self_size)
    }

    pub fn native(&mut self, name: &str, self_size: u32) -> usize {
        let id = self.next_native_id();
        self.push_node("native", name, id, self_size)
    }

    pub fn synthetic(&mut self, name: &str, self_size: u32) -> usize {
        let id = self.next_js_id();
        self.push_node("synthetic", name, id, self_size)
    }

    pub fn hidden(&mut self, name: &str, self_size: u32) -> usize {
        let id = self.next_js_id();
        self.push_node("hidden", name, id, self_size)
    }

    pub fn array(&mut self, name: &str, self_size: u32) -> usize {
        let id = self.next_js_id();
        self.push_node("array", name, id, self_size)
    }

    pub fn string_node(&mut self, name: &str, self_size: u32) -> usize {
        let id = self.next_js_id();
        self.push_node("string", name, id, self_size)
    }

    pub fn cons_string(&mut self, name: &str, self_size: u32) -> usize {
        let id = self.next_js_id();
        self.push_node("concatenated string", name, id, self_size)
    }

    pub fn closure(&mut self, name: &str, self_size: u32) -> usize {
        let id = self.next_js_id();
        self.push_node("closure", name, id, self_size)
    }

    pub fn code(&mut self, name: &str, self_size: u32) -> usize {
        let id = self.next_js_id();
        self.push_node("code", name, id, self_size)
    }

    pub fn typed(&mut self, type_name: &str, name: &str, self_size: u32) -> usize {
        let id = self.next_js_id();
        self.push_node(type_name, name, id, self_size)
    }

    /// Sets the serialized detachedness of a node (0 unknown / 1 attached /
    /// 2 detached) and enables the detachedness field for the snapshot.
    pub fn detachedness(&mut self, ordinal: usize, state: u32) {
        self.with_detachedness = true;
        self.nodes[ordinal].detachedness = state;
    }

    /// Forces the detachedness field to be present even if no node sets it.
    pub fn with_detachedness_field(&mut self) {
        self.with_detachedness = true;
    }

    fn push_edge(&mut self, src: usize, to: usize, type_name: &str, name: NameOrIndex) {
        self.edges.push(EdgeSpec {
            src,
            type_index: Self::edge_type_index(type_name),
            name_or_index: name,
            to,
        });
    }

    pub fn property(&mut self, src: usize, to: usize, name: &str) {
        self.push_edge(src, to, "property", NameOrIndex::Name(name.to_owned()));
    }

    pub fn internal(&mut self, src: usize, to: usize, name: &str) {
        self.push_edge(src, to, "internal", NameOrIndex::Name(name.to_owned()));
    }

    pub fn weak(&mut self, src: usize, to: usize, name: &str) {
        self.push_edge(src, to, "weak", NameOrIndex::Name(name.to_owned()));
    }

    pub fn shortcut(&mut self, src: usize, to: usize, name: &str) {
        self.push_edge(src, to, "shortcut", NameOrIndex::Name(name.to_owned()));
    }

    pub fn element(&mut self, src: usize, to: usize, index: u32) {
        self.push_edge(src, to, "element", NameOrIndex::Index(index));
    }

    pub fn hidden_edge(&mut self, src: usize, to: usize, index: u32) {
        self.push_edge(src, to, "hidden", NameOrIndex::Index(index));
    }

    pub fn sample(&mut self, timestamp_us: u64, last_assigned_id: u64) {
        self.samples.push(timestamp_us);
        self.samples.push(last_assigned_id);
    }

    pub fn location(&mut self, ordinal: usize, script_id: u32, line: u32, column: u32) {
        self.locations.push((ordinal, script_id, line, column));
    }

    fn meta(&self) -> RawMeta {
        let mut node_fields: Vec<String> = ["type", "name", "id", "self_size", "edge_count", "trace_node_id"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if self.with_detachedness {
            node_fields.push("detachedness".to_owned());
        }
        RawMeta {
            node_fields,
            node_types: vec![FieldType::Enum(
                NODE_TYPES.iter().map(|s| s.to_string()).collect(),
            )],
            edge_fields: ["type", "name_or_index", "to_node"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            edge_types: vec![FieldType::Enum(
                EDGE_TYPES.iter().map(|s| s.to_string()).collect(),
            )],
            location_fields: ["object_index", "script_id", "line", "column"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sample_fields: ["timestamp_us", "last_assigned_id"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Serializes the described graph into a `RawSnapshot`.
    pub fn build_raw(&self) -> RawSnapshot {
        let nf = if self.with_detachedness { 7 } else { 6 };
        let ef = 3;
        let mut strings: Vec<String> = Vec::new();
        let mut string_index = |s: &str, strings: &mut Vec<String>| -> u32 {
            if let Some(pos) = strings.iter().position(|x| x == s) {
                return pos as u32;
            }
            strings.push(s.to_owned());
            (strings.len() - 1) as u32
        };

        let mut nodes = Vec::with_capacity(self.nodes.len() * nf);
        // Edges must be grouped by source in node order.
        let mut edges_by_src: Vec<Vec<&EdgeSpec>> = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            edges_by_src[edge.src].push(edge);
        }

        for (ordinal, node) in self.nodes.iter().enumerate() {
            nodes.push(node.type_index);
            nodes.push(string_index(&node.name, &mut strings));
            nodes.push(node.id);
            nodes.push(node.self_size);
            nodes.push(edges_by_src[ordinal].len() as u32);
            nodes.push(0); // trace_node_id
            if self.with_detachedness {
                nodes.push(node.detachedness);
            }
        }

        let mut edges = Vec::with_capacity(self.edges.len() * ef);
        for src_edges in &edges_by_src {
            for edge in src_edges {
                edges.push(edge.type_index);
                match &edge.name_or_index {
                    NameOrIndex::Name(name) => edges.push(string_index(name, &mut strings)),
                    NameOrIndex::Index(index) => edges.push(*index),
                }
                edges.push((edge.to * nf) as u32);
            }
        }

        let mut locations = Vec::with_capacity(self.locations.len() * 4);
        for &(ordinal, script_id, line, column) in &self.locations {
            locations.push((ordinal * nf) as u32);
            locations.push(script_id);
            locations.push(line);
            locations.push(column);
        }

        RawSnapshot {
            meta: self.meta(),
            nodes,
            edges,
            strings,
            locations,
            samples: self.samples.clone(),
            trace_function_infos: Vec::new(),
            trace_tree: Vec::new(),
            root_index: 0,
        }
    }

    /// Builds the graph view with retainers filled.
    pub fn build_graph(&self) -> HeapGraph {
        Self::graph_from_raw(self.build_raw()).expect("fixture graph build failed")
    }

    /// Builds a graph from an explicit raw snapshot (for corruption tests).
    pub fn graph_from_raw(raw: RawSnapshot) -> Result<HeapGraph, SnapshotDataError> {
        let meta = SnapshotMeta::resolve(&raw.meta)?;
        let mut graph =
            HeapGraph::new(raw.nodes, raw.edges, raw.strings, raw.root_index, meta)?;
        build_retainers(&mut graph)?;
        Ok(graph)
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

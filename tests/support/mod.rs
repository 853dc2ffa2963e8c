//! Shared snapshot fixtures for integration tests.
//!
//! Describes graphs as nodes and edges and serializes them into the
//! standard meta-schema. Node methods return ordinals that match the built
//! graph's ordinals.

use heapgraph::snapshot::{FieldType, RawMeta, RawSnapshot};

pub const NODE_TYPES: &[&str] = &[
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

pub const EDGE_TYPES: &[&str] = &[
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
    name: Option<String>,
    index: u32,
    to: usize,
}

/// Integration-test snapshot builder over the standard meta-schema.
pub struct GraphSpec {
    nodes: Vec<NodeSpec>,
    edges: Vec<EdgeSpec>,
    samples: Vec<u64>,
    with_detachedness: bool,
    next_js_id: u32,
    next_native_id: u32,
}

#[allow(dead_code)]
impl GraphSpec {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            samples: Vec::new(),
            with_detachedness: false,
            next_js_id: 1,
            next_native_id: 2,
        }
    }

    fn type_index(name: &str) -> u32 {
        NODE_TYPES.iter().position(|t| *t == name).unwrap() as u32
    }

    fn edge_type_index(name: &str) -> u32 {
        EDGE_TYPES.iter().position(|t| *t == name).unwrap() as u32
    }

    pub fn node(&mut self, type_name: &str, name: &str, self_size: u32) -> usize {
        let id = if type_name == "native" {
            let id = self.next_native_id;
            self.next_native_id += 2;
            id
        } else {
            let id = self.next_js_id;
            self.next_js_id += 2;
            id
        };
        self.node_with_id(type_name, name, self_size, id)
    }

    pub fn node_with_id(
        &mut self,
        type_name: &str,
        name: &str,
        self_size: u32,
        id: u32,
    ) -> usize {
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

    pub fn root(&mut self) -> usize {
        assert!(self.nodes.is_empty(), "root must be first");
        self.node("synthetic", "", 0)
    }

    pub fn object(&mut self, name: &str, self_size: u32) -> usize {
        self.node("object", name, self_size)
    }

    pub fn native(&mut self, name: &str, self_size: u32) -> usize {
        self.node("native", name, self_size)
    }

    pub fn detachedness(&mut self, ordinal: usize, state: u32) {
        self.with_detachedness = true;
        self.nodes[ordinal].detachedness = state;
    }

    pub fn edge(&mut self, src: usize, to: usize, type_name: &str, name: &str) {
        self.edges.push(EdgeSpec {
            src,
            type_index: Self::edge_type_index(type_name),
            name: Some(name.to_owned()),
            index: 0,
            to,
        });
    }

    pub fn property(&mut self, src: usize, to: usize, name: &str) {
        self.edge(src, to, "property", name);
    }

    pub fn internal(&mut self, src: usize, to: usize, name: &str) {
        self.edge(src, to, "internal", name);
    }

    pub fn weak(&mut self, src: usize, to: usize, name: &str) {
        self.edge(src, to, "weak", name);
    }

    pub fn shortcut(&mut self, src: usize, to: usize, name: &str) {
        self.edge(src, to, "shortcut", name);
    }

    pub fn element(&mut self, src: usize, to: usize, index: u32) {
        self.edges.push(EdgeSpec {
            src,
            type_index: Self::edge_type_index("element"),
            name: None,
            index,
            to,
        });
    }

    pub fn sample(&mut self, timestamp_us: u64, last_assigned_id: u64) {
        self.samples.push(timestamp_us);
        self.samples.push(last_assigned_id);
    }

    pub fn build(&self) -> RawSnapshot {
        let nf = if self.with_detachedness { 7 } else { 6 };
        let mut node_fields: Vec<String> =
            ["type", "name", "id", "self_size", "edge_count", "trace_node_id"]
                .iter()
                .map(|s| s.to_string())
                .collect();
        if self.with_detachedness {
            node_fields.push("detachedness".to_owned());
        }

        let mut strings: Vec<String> = Vec::new();
        let mut string_index = |s: &str, strings: &mut Vec<String>| -> u32 {
            match strings.iter().position(|x| x == s) {
                Some(pos) => pos as u32,
                None => {
                    strings.push(s.to_owned());
                    (strings.len() - 1) as u32
                }
            }
        };

        let mut edges_by_src: Vec<Vec<&EdgeSpec>> = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            edges_by_src[edge.src].push(edge);
        }

        let mut nodes = Vec::new();
        for (ordinal, node) in self.nodes.iter().enumerate() {
            nodes.push(node.type_index);
            nodes.push(string_index(&node.name, &mut strings));
            nodes.push(node.id);
            nodes.push(node.self_size);
            nodes.push(edges_by_src[ordinal].len() as u32);
            nodes.push(0);
            if self.with_detachedness {
                nodes.push(node.detachedness);
            }
        }

        let mut edges = Vec::new();
        for src_edges in &edges_by_src {
            for edge in src_edges {
                edges.push(edge.type_index);
                match &edge.name {
                    Some(name) => edges.push(string_index(name, &mut strings)),
                    None => edges.push(edge.index),
                }
                edges.push((edge.to * nf) as u32);
            }
        }

        RawSnapshot {
            meta: RawMeta {
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
            },
            nodes,
            edges,
            strings,
            locations: Vec::new(),
            samples: self.samples.clone(),
            trace_function_infos: Vec::new(),
            trace_tree: Vec::new(),
            root_index: 0,
        }
    }
}

impl Default for GraphSpec {
    fn default() -> Self {
        Self::new()
    }
}

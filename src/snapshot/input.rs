//! Parsed-snapshot input value.
//!
//! The engine consumes a snapshot that has already been parsed from its
//! serialized form: flat integer arrays plus the string table and the
//! meta-schema describing field layout. Parsing and streaming live outside
//! this crate.

/// Declared type of one record field in the meta-schema.
///
/// Most fields are scalars; the field at the type offset is an enum listing
/// the valid type names in index order.
#[derive(Clone, Debug)]
pub enum FieldType {
    /// Enum field: value is an index into the listed names.
    Enum(Vec<String>),
    /// Scalar field with a declared primitive kind (informational).
    Scalar(String),
}

/// The snapshot meta-schema as parsed from the input.
#[derive(Clone, Debug, Default)]
pub struct RawMeta {
    pub node_fields: Vec<String>,
    pub node_types: Vec<FieldType>,
    pub edge_fields: Vec<String>,
    pub edge_types: Vec<FieldType>,
    pub location_fields: Vec<String>,
    pub sample_fields: Vec<String>,
}

/// A fully parsed heap snapshot, ready for analysis.
///
/// `nodes` and `edges` are flat arrays of fixed-width records as described
/// by `meta`. `samples` holds `(timestamp_us, last_assigned_id)` pairs
/// flattened; timestamps are u64 since long profiling sessions overflow u32.
/// `trace_function_infos` and `trace_tree` pass through untouched for the
/// external allocation-profile consumer.
#[derive(Clone, Debug, Default)]
pub struct RawSnapshot {
    pub meta: RawMeta,
    pub nodes: Vec<u32>,
    pub edges: Vec<u32>,
    pub strings: Vec<String>,
    pub locations: Vec<u32>,
    pub samples: Vec<u64>,
    pub trace_function_infos: Vec<u32>,
    pub trace_tree: Vec<i64>,
    /// Node index (field units) of the synthetic root, usually 0.
    pub root_index: usize,
}

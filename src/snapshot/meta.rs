//! Meta-schema resolution: field offsets and type enum indexes.
//!
//! Snapshots declare their record layout at load time; nothing in the engine
//! hard-codes field positions. Required fields resolve to offsets here, once,
//! and every later pass indexes the flat arrays through
//! [`SnapshotMeta`]. Type names resolve to enum indexes, with a sentinel for
//! names a given snapshot does not declare.
//!
//! # Invariants
//! - `node_field_count` / `edge_field_count` match the declared field lists
//!   and never change.
//! - `edge_type_invisible` always resolves: the synthetic `invisible` edge
//!   type is appended to the declared list after load.

use super::errors::SnapshotDataError;
use super::input::{FieldType, RawMeta};

/// Sentinel for a type name the snapshot does not declare. Comparisons
/// against it never match a real record value.
pub const NO_TYPE: u32 = u32::MAX;

/// Resolved meta-schema: offsets for every field the engine touches and
/// enum indexes for every node/edge type it distinguishes.
#[derive(Clone, Debug)]
pub struct SnapshotMeta {
    pub node_field_count: usize,
    pub node_type_offset: usize,
    pub node_name_offset: usize,
    pub node_id_offset: usize,
    pub node_self_size_offset: usize,
    pub node_edge_count_offset: usize,
    pub node_trace_node_id_offset: Option<usize>,
    /// Present only when the snapshot carries DOM detachedness.
    pub node_detachedness_offset: Option<usize>,

    pub node_type_names: Vec<String>,
    pub node_type_hidden: u32,
    pub node_type_array: u32,
    pub node_type_object: u32,
    pub node_type_native: u32,
    pub node_type_string: u32,
    pub node_type_cons_string: u32,
    pub node_type_sliced_string: u32,
    pub node_type_code: u32,
    pub node_type_closure: u32,
    pub node_type_regexp: u32,
    pub node_type_synthetic: u32,

    pub edge_field_count: usize,
    pub edge_type_offset: usize,
    pub edge_name_or_index_offset: usize,
    pub edge_to_node_offset: usize,

    pub edge_type_names: Vec<String>,
    pub edge_type_element: u32,
    pub edge_type_hidden: u32,
    pub edge_type_internal: u32,
    pub edge_type_shortcut: u32,
    pub edge_type_weak: u32,
    /// Synthetic type appended after load; never present in input records.
    pub edge_type_invisible: u32,

    pub location_field_count: usize,
    pub location_object_index_offset: usize,
    pub location_script_id_offset: usize,
    pub location_line_offset: usize,
    pub location_column_offset: usize,
}

fn field_offset(
    fields: &[String],
    record: &'static str,
    name: &'static str,
) -> Result<usize, SnapshotDataError> {
    fields
        .iter()
        .position(|f| f == name)
        .ok_or(SnapshotDataError::MissingField {
            record,
            field: name,
        })
}

fn optional_field_offset(fields: &[String], name: &str) -> Option<usize> {
    fields.iter().position(|f| f == name)
}

fn type_index(names: &[String], name: &str) -> u32 {
    names
        .iter()
        .position(|n| n == name)
        .map_or(NO_TYPE, |i| i as u32)
}

fn enum_names(
    types: &[FieldType],
    offset: usize,
    record: &'static str,
) -> Result<Vec<String>, SnapshotDataError> {
    match types.get(offset) {
        Some(FieldType::Enum(names)) => Ok(names.clone()),
        _ => Err(SnapshotDataError::MissingType {
            record,
            type_name: "type enum",
        }),
    }
}

impl SnapshotMeta {
    /// Resolves the raw meta-schema into offsets and type indexes.
    ///
    /// Fails on any missing required field; type names absent from the
    /// declared enum resolve to [`NO_TYPE`] and simply never match.
    pub fn resolve(raw: &RawMeta) -> Result<Self, SnapshotDataError> {
        let node_type_offset = field_offset(&raw.node_fields, "node", "type")?;
        let node_name_offset = field_offset(&raw.node_fields, "node", "name")?;
        let node_id_offset = field_offset(&raw.node_fields, "node", "id")?;
        let node_self_size_offset = field_offset(&raw.node_fields, "node", "self_size")?;
        let node_edge_count_offset = field_offset(&raw.node_fields, "node", "edge_count")?;
        let node_trace_node_id_offset = optional_field_offset(&raw.node_fields, "trace_node_id");
        let node_detachedness_offset = optional_field_offset(&raw.node_fields, "detachedness");

        let node_type_names = enum_names(&raw.node_types, node_type_offset, "node")?;

        let edge_type_offset = field_offset(&raw.edge_fields, "edge", "type")?;
        let edge_name_or_index_offset = field_offset(&raw.edge_fields, "edge", "name_or_index")?;
        let edge_to_node_offset = field_offset(&raw.edge_fields, "edge", "to_node")?;

        let mut edge_type_names = enum_names(&raw.edge_types, edge_type_offset, "edge")?;
        // The invisible type exists only in the analytical model.
        let edge_type_invisible = edge_type_names.len() as u32;
        edge_type_names.push("invisible".to_owned());

        // Location fields are optional as a block: snapshots without script
        // locations carry an empty list.
        let (
            location_field_count,
            location_object_index_offset,
            location_script_id_offset,
            location_line_offset,
            location_column_offset,
        ) = if raw.location_fields.is_empty() {
            (0, 0, 0, 0, 0)
        } else {
            (
                raw.location_fields.len(),
                field_offset(&raw.location_fields, "location", "object_index")?,
                field_offset(&raw.location_fields, "location", "script_id")?,
                field_offset(&raw.location_fields, "location", "line")?,
                field_offset(&raw.location_fields, "location", "column")?,
            )
        };

        Ok(Self {
            node_field_count: raw.node_fields.len(),
            node_type_offset,
            node_name_offset,
            node_id_offset,
            node_self_size_offset,
            node_edge_count_offset,
            node_trace_node_id_offset,
            node_detachedness_offset,
            node_type_hidden: type_index(&node_type_names, "hidden"),
            node_type_array: type_index(&node_type_names, "array"),
            node_type_object: type_index(&node_type_names, "object"),
            node_type_native: type_index(&node_type_names, "native"),
            node_type_string: type_index(&node_type_names, "string"),
            node_type_cons_string: type_index(&node_type_names, "concatenated string"),
            node_type_sliced_string: type_index(&node_type_names, "sliced string"),
            node_type_code: type_index(&node_type_names, "code"),
            node_type_closure: type_index(&node_type_names, "closure"),
            node_type_regexp: type_index(&node_type_names, "regexp"),
            node_type_synthetic: type_index(&node_type_names, "synthetic"),
            node_type_names,
            edge_field_count: raw.edge_fields.len(),
            edge_type_offset,
            edge_name_or_index_offset,
            edge_to_node_offset,
            edge_type_element: type_index(&edge_type_names, "element"),
            edge_type_hidden: type_index(&edge_type_names, "hidden"),
            edge_type_internal: type_index(&edge_type_names, "internal"),
            edge_type_shortcut: type_index(&edge_type_names, "shortcut"),
            edge_type_weak: type_index(&edge_type_names, "weak"),
            edge_type_invisible,
            edge_type_names,
            location_field_count,
            location_object_index_offset,
            location_script_id_offset,
            location_line_offset,
            location_column_offset,
        })
    }

    /// Name of a node type enum index, or `"invalid"` when out of range.
    pub fn node_type_name(&self, type_index: u32) -> &str {
        self.node_type_names
            .get(type_index as usize)
            .map_or("invalid", String::as_str)
    }

    /// Name of an edge type enum index, or `"invalid"` when out of range.
    pub fn edge_type_name(&self, type_index: u32) -> &str {
        self.edge_type_names
            .get(type_index as usize)
            .map_or("invalid", String::as_str)
    }
}

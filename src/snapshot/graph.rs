//! Packed graph view over the flat snapshot arrays.
//!
//! Nodes and edges live in fixed-width integer records; this module provides
//! the typed accessors every pass uses, the forward edge index, and the
//! retainer (reverse edge) storage. All reads are O(1) and allocation-free.
//!
//! # Invariants
//! - Every node index is a multiple of the node field count; every edge
//!   index a multiple of the edge field count.
//! - `first_edge_indexes` has `node_count + 1` entries; entry `i` is the
//!   first edge index (field units) of ordinal `i`, entry `node_count` is
//!   the edges array length.
//! - After the retainer build, `retaining_nodes` and `retaining_edges` each
//!   hold exactly one slot per edge and `first_retainer_index` has
//!   `node_count + 1` entries in slot units.
//! - DOM link state lives in the low 2 bits of the detachedness field, the
//!   class index in the upper 30.

use crate::stdx::PagedU32;

use super::errors::SnapshotDataError;
use super::meta::SnapshotMeta;
use super::strings::StringTable;

/// DOM link state stored in the low 2 bits of the detachedness field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DomState {
    Unknown,
    Attached,
    Detached,
}

impl DomState {
    #[inline]
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            1 => Self::Attached,
            2 => Self::Detached,
            _ => Self::Unknown,
        }
    }

    #[inline]
    pub fn to_bits(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Attached => 1,
            Self::Detached => 2,
        }
    }
}

/// The packed heap graph: node and edge records, string table, forward edge
/// index, and retainer storage.
#[derive(Debug)]
pub struct HeapGraph {
    pub(crate) meta: SnapshotMeta,
    nodes: PagedU32,
    edges: PagedU32,
    strings: StringTable,
    node_count: usize,
    edge_count: usize,
    root_ordinal: usize,
    first_edge_indexes: Vec<u32>,
    retaining_nodes: PagedU32,
    retaining_edges: PagedU32,
    first_retainer_index: Vec<u32>,
    /// Parallel detachedness/class storage when the snapshot lacks the field.
    detachedness_aux: Vec<u32>,
}

impl HeapGraph {
    /// Builds the graph view: validates alignment, computes the forward edge
    /// index, and allocates (but does not fill) the retainer arrays.
    pub fn new(
        raw_nodes: Vec<u32>,
        raw_edges: Vec<u32>,
        strings: Vec<String>,
        root_index: usize,
        meta: SnapshotMeta,
    ) -> Result<Self, SnapshotDataError> {
        let nf = meta.node_field_count;
        let ef = meta.edge_field_count;

        if nf == 0 || raw_nodes.len() % nf != 0 {
            return Err(SnapshotDataError::NodesLengthMisaligned {
                len: raw_nodes.len(),
                field_count: nf,
            });
        }
        if ef == 0 || raw_edges.len() % ef != 0 {
            return Err(SnapshotDataError::EdgesLengthMisaligned {
                len: raw_edges.len(),
                field_count: ef,
            });
        }

        let node_count = raw_nodes.len() / nf;
        let edge_count = raw_edges.len() / ef;

        if root_index % nf != 0 || root_index / nf >= node_count {
            return Err(SnapshotDataError::InvalidRootIndex { root_index });
        }
        let root_ordinal = root_index / nf;

        let nodes = PagedU32::from_vec(raw_nodes);
        let edges = PagedU32::from_vec(raw_edges);

        // Forward index: prefix sum over per-node edge counts, in edge-array
        // field units. Validates that the declared counts cover the edges
        // array exactly.
        let mut first_edge_indexes = Vec::with_capacity(node_count + 1);
        let mut offset = 0usize;
        for ordinal in 0..node_count {
            first_edge_indexes.push(offset as u32);
            let edge_count_field = nodes.get(ordinal * nf + meta.node_edge_count_offset) as usize;
            offset += edge_count_field * ef;
        }
        if offset != edges.len() {
            return Err(SnapshotDataError::EdgeCountMismatch {
                declared: offset / ef.max(1),
                actual: edge_count,
            });
        }
        first_edge_indexes.push(offset as u32);

        let detachedness_aux = if meta.node_detachedness_offset.is_none() {
            vec![0u32; node_count]
        } else {
            Vec::new()
        };

        Ok(Self {
            meta,
            nodes,
            edges,
            strings: StringTable::from_vec(strings),
            node_count,
            edge_count,
            root_ordinal,
            first_edge_indexes,
            retaining_nodes: PagedU32::zeroed(edge_count),
            retaining_edges: PagedU32::zeroed(edge_count),
            first_retainer_index: vec![0u32; node_count + 1],
            detachedness_aux,
        })
    }

    // ------------------------------------------------------------------
    // Counts and identity
    // ------------------------------------------------------------------

    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    #[inline]
    pub fn root_ordinal(&self) -> usize {
        self.root_ordinal
    }

    #[inline]
    pub fn root_node_index(&self) -> usize {
        self.root_ordinal * self.meta.node_field_count
    }

    #[inline]
    pub fn meta(&self) -> &SnapshotMeta {
        &self.meta
    }

    #[inline]
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    #[inline]
    pub fn strings_mut(&mut self) -> &mut StringTable {
        &mut self.strings
    }

    /// Converts a node index (field units) to an ordinal.
    #[inline]
    pub fn to_ordinal(&self, node_index: usize) -> usize {
        node_index / self.meta.node_field_count
    }

    /// Converts an ordinal to a node index (field units).
    #[inline]
    pub fn to_node_index(&self, ordinal: usize) -> usize {
        ordinal * self.meta.node_field_count
    }

    // ------------------------------------------------------------------
    // Raw field access
    // ------------------------------------------------------------------

    #[inline]
    pub fn node_field(&self, ordinal: usize, offset: usize) -> u32 {
        self.nodes.get(ordinal * self.meta.node_field_count + offset)
    }

    #[inline]
    pub fn set_node_field(&mut self, ordinal: usize, offset: usize, value: u32) {
        self.nodes
            .set(ordinal * self.meta.node_field_count + offset, value);
    }

    /// Reads an edge field; `edge_index` is in field units.
    #[inline]
    pub fn edge_field(&self, edge_index: usize, offset: usize) -> u32 {
        self.edges.get(edge_index + offset)
    }

    // ------------------------------------------------------------------
    // Typed node accessors
    // ------------------------------------------------------------------

    #[inline]
    pub fn node_type(&self, ordinal: usize) -> u32 {
        self.node_field(ordinal, self.meta.node_type_offset)
    }

    #[inline]
    pub fn node_name_index(&self, ordinal: usize) -> u32 {
        self.node_field(ordinal, self.meta.node_name_offset)
    }

    #[inline]
    pub fn node_name(&self, ordinal: usize) -> &str {
        self.strings.get(self.node_name_index(ordinal) as usize)
    }

    #[inline]
    pub fn set_node_name_index(&mut self, ordinal: usize, index: u32) {
        self.set_node_field(ordinal, self.meta.node_name_offset, index);
    }

    #[inline]
    pub fn node_id(&self, ordinal: usize) -> u32 {
        self.node_field(ordinal, self.meta.node_id_offset)
    }

    #[inline]
    pub fn node_self_size(&self, ordinal: usize) -> u32 {
        self.node_field(ordinal, self.meta.node_self_size_offset)
    }

    #[inline]
    pub fn set_node_self_size(&mut self, ordinal: usize, size: u32) {
        self.set_node_field(ordinal, self.meta.node_self_size_offset, size);
    }

    #[inline]
    pub fn node_edge_count(&self, ordinal: usize) -> u32 {
        self.node_field(ordinal, self.meta.node_edge_count_offset)
    }

    #[inline]
    pub fn node_trace_node_id(&self, ordinal: usize) -> u32 {
        match self.meta.node_trace_node_id_offset {
            Some(offset) => self.node_field(ordinal, offset),
            None => 0,
        }
    }

    // Type predicates. A `NO_TYPE` meta entry never matches.

    #[inline]
    pub fn is_root(&self, ordinal: usize) -> bool {
        ordinal == self.root_ordinal
    }

    #[inline]
    pub fn node_is_hidden(&self, ordinal: usize) -> bool {
        self.node_type(ordinal) == self.meta.node_type_hidden
    }

    #[inline]
    pub fn node_is_array(&self, ordinal: usize) -> bool {
        self.node_type(ordinal) == self.meta.node_type_array
    }

    #[inline]
    pub fn node_is_object(&self, ordinal: usize) -> bool {
        self.node_type(ordinal) == self.meta.node_type_object
    }

    #[inline]
    pub fn node_is_native(&self, ordinal: usize) -> bool {
        self.node_type(ordinal) == self.meta.node_type_native
    }

    #[inline]
    pub fn node_is_synthetic(&self, ordinal: usize) -> bool {
        self.node_type(ordinal) == self.meta.node_type_synthetic
    }

    #[inline]
    pub fn node_is_string(&self, ordinal: usize) -> bool {
        let t = self.node_type(ordinal);
        t == self.meta.node_type_string
            || t == self.meta.node_type_cons_string
            || t == self.meta.node_type_sliced_string
    }

    /// JS heap node ids are odd; native ids are even.
    #[inline]
    pub fn node_has_js_id(&self, ordinal: usize) -> bool {
        self.node_id(ordinal) % 2 == 1
    }

    /// A user root is a non-synthetic child of the root, or the synthetic
    /// Document-DOM-trees node.
    #[inline]
    pub fn node_is_user_root(&self, ordinal: usize) -> bool {
        !self.node_is_synthetic(ordinal) || self.node_is_document_dom_trees_root(ordinal)
    }

    #[inline]
    pub fn node_is_document_dom_trees_root(&self, ordinal: usize) -> bool {
        self.node_is_synthetic(ordinal) && self.node_name(ordinal) == "(Document DOM trees)"
    }

    // ------------------------------------------------------------------
    // Detachedness + class index (packed)
    // ------------------------------------------------------------------

    #[inline]
    fn detachedness_and_class(&self, ordinal: usize) -> u32 {
        match self.meta.node_detachedness_offset {
            Some(offset) => self.node_field(ordinal, offset),
            None => self.detachedness_aux[ordinal],
        }
    }

    #[inline]
    fn set_detachedness_and_class(&mut self, ordinal: usize, value: u32) {
        match self.meta.node_detachedness_offset {
            Some(offset) => self.set_node_field(ordinal, offset, value),
            None => self.detachedness_aux[ordinal] = value,
        }
    }

    /// Whether the snapshot serialized a detachedness field at all.
    #[inline]
    pub fn has_detachedness(&self) -> bool {
        self.meta.node_detachedness_offset.is_some()
    }

    #[inline]
    pub fn node_dom_state(&self, ordinal: usize) -> DomState {
        DomState::from_bits(self.detachedness_and_class(ordinal))
    }

    #[inline]
    pub fn set_node_dom_state(&mut self, ordinal: usize, state: DomState) {
        let packed = self.detachedness_and_class(ordinal);
        self.set_detachedness_and_class(ordinal, (packed & !3) | state.to_bits());
    }

    #[inline]
    pub fn node_class_index(&self, ordinal: usize) -> u32 {
        self.detachedness_and_class(ordinal) >> 2
    }

    #[inline]
    pub fn set_node_class_index(&mut self, ordinal: usize, class_index: u32) {
        let state = self.detachedness_and_class(ordinal) & 3;
        self.set_detachedness_and_class(ordinal, (class_index << 2) | state);
    }

    /// Class name of a node, resolved through its class index.
    #[inline]
    pub fn node_class_name(&self, ordinal: usize) -> &str {
        self.strings.get(self.node_class_index(ordinal) as usize)
    }

    // ------------------------------------------------------------------
    // Typed edge accessors
    // ------------------------------------------------------------------

    #[inline]
    pub fn edge_type(&self, edge_index: usize) -> u32 {
        self.edge_field(edge_index, self.meta.edge_type_offset)
    }

    #[inline]
    pub fn edge_name_or_index(&self, edge_index: usize) -> u32 {
        self.edge_field(edge_index, self.meta.edge_name_or_index_offset)
    }

    #[inline]
    pub fn edge_to_node_index(&self, edge_index: usize) -> usize {
        self.edge_field(edge_index, self.meta.edge_to_node_offset) as usize
    }

    #[inline]
    pub fn edge_to_ordinal(&self, edge_index: usize) -> usize {
        self.edge_to_node_index(edge_index) / self.meta.node_field_count
    }

    #[inline]
    pub fn edge_is_weak(&self, edge_index: usize) -> bool {
        self.edge_type(edge_index) == self.meta.edge_type_weak
    }

    #[inline]
    pub fn edge_is_hidden(&self, edge_index: usize) -> bool {
        self.edge_type(edge_index) == self.meta.edge_type_hidden
    }

    #[inline]
    pub fn edge_is_internal(&self, edge_index: usize) -> bool {
        self.edge_type(edge_index) == self.meta.edge_type_internal
    }

    #[inline]
    pub fn edge_is_shortcut(&self, edge_index: usize) -> bool {
        self.edge_type(edge_index) == self.meta.edge_type_shortcut
    }

    #[inline]
    pub fn edge_is_invisible(&self, edge_index: usize) -> bool {
        self.edge_type(edge_index) == self.meta.edge_type_invisible
    }

    #[inline]
    pub fn edge_is_element(&self, edge_index: usize) -> bool {
        self.edge_type(edge_index) == self.meta.edge_type_element
    }

    /// Whether the edge's `name_or_index` field is a string-table index
    /// (as opposed to an array element / hidden position index).
    #[inline]
    pub fn edge_has_string_name(&self, edge_index: usize) -> bool {
        let t = self.edge_type(edge_index);
        !(t == self.meta.edge_type_element || t == self.meta.edge_type_hidden)
    }

    /// Edge name for string-named edges, `None` for index-named ones.
    #[inline]
    pub fn edge_name(&self, edge_index: usize) -> Option<&str> {
        if self.edge_has_string_name(edge_index) {
            Some(self.strings.get(self.edge_name_or_index(edge_index) as usize))
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Forward edge iteration
    // ------------------------------------------------------------------

    /// First edge index (field units) of an ordinal.
    #[inline]
    pub fn first_edge_index(&self, ordinal: usize) -> usize {
        self.first_edge_indexes[ordinal] as usize
    }

    /// One-past-the-last edge index (field units) of an ordinal.
    #[inline]
    pub fn end_edge_index(&self, ordinal: usize) -> usize {
        self.first_edge_indexes[ordinal + 1] as usize
    }

    /// Iterates the outgoing edge indexes (field units) of an ordinal.
    #[inline]
    pub fn edges_of(&self, ordinal: usize) -> impl Iterator<Item = usize> + '_ {
        (self.first_edge_index(ordinal)..self.end_edge_index(ordinal))
            .step_by(self.meta.edge_field_count)
    }

    // ------------------------------------------------------------------
    // Retainer storage (filled by the retainer builder)
    // ------------------------------------------------------------------

    /// Moves the retainer arrays out for the builder to fill. The graph's
    /// retainer accessors must not be used until they are put back.
    pub(crate) fn take_retainer_arrays(&mut self) -> (PagedU32, PagedU32, Vec<u32>) {
        (
            std::mem::replace(&mut self.retaining_nodes, PagedU32::zeroed(0)),
            std::mem::replace(&mut self.retaining_edges, PagedU32::zeroed(0)),
            std::mem::take(&mut self.first_retainer_index),
        )
    }

    /// Restores the retainer arrays after the builder filled them.
    pub(crate) fn put_retainer_arrays(
        &mut self,
        retaining_nodes: PagedU32,
        retaining_edges: PagedU32,
        first_retainer_index: Vec<u32>,
    ) {
        debug_assert_eq!(retaining_nodes.len(), self.edge_count);
        debug_assert_eq!(retaining_edges.len(), self.edge_count);
        debug_assert_eq!(first_retainer_index.len(), self.node_count + 1);
        self.retaining_nodes = retaining_nodes;
        self.retaining_edges = retaining_edges;
        self.first_retainer_index = first_retainer_index;
    }

    /// First retainer slot of an ordinal.
    #[inline]
    pub fn first_retainer_slot(&self, ordinal: usize) -> usize {
        self.first_retainer_index[ordinal] as usize
    }

    /// One-past-the-last retainer slot of an ordinal.
    #[inline]
    pub fn end_retainer_slot(&self, ordinal: usize) -> usize {
        self.first_retainer_index[ordinal + 1] as usize
    }

    /// Number of retainers of an ordinal.
    #[inline]
    pub fn retainer_count(&self, ordinal: usize) -> usize {
        self.end_retainer_slot(ordinal) - self.first_retainer_slot(ordinal)
    }

    /// Retaining node index (field units) stored in a slot.
    #[inline]
    pub fn retaining_node_index(&self, slot: usize) -> usize {
        self.retaining_nodes.get(slot) as usize
    }

    /// Retaining edge index (field units) stored in a slot.
    #[inline]
    pub fn retaining_edge_index(&self, slot: usize) -> usize {
        self.retaining_edges.get(slot) as usize
    }

    /// Iterates `(retaining_node_ordinal, edge_index)` pairs for an ordinal.
    #[inline]
    pub fn retainers_of(&self, ordinal: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.first_retainer_slot(ordinal)..self.end_retainer_slot(ordinal)).map(move |slot| {
            (
                self.retaining_node_index(slot) / self.meta.node_field_count,
                self.retaining_edge_index(slot),
            )
        })
    }

    /// True when every retainer edge of the ordinal is weak or shortcut.
    pub fn has_only_weak_retainers(&self, ordinal: usize) -> bool {
        self.retainers_of(ordinal).all(|(_, edge_index)| {
            let t = self.edge_type(edge_index);
            t == self.meta.edge_type_weak || t == self.meta.edge_type_shortcut
        })
    }
}

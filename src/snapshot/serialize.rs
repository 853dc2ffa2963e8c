//! Wire types consumed by the UI layer.
//!
//! Field names follow the UI protocol (camelCase); everything here is plain
//! data produced from the engine's derived arrays. Sizes are f64 at this
//! level because aggregate native heaps exceed 32 bits.

use serde::Serialize;

/// One serialized node row.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNode {
    pub id: u32,
    pub name: String,
    pub distance: i32,
    pub node_index: u32,
    pub retained_size: f64,
    pub self_size: f64,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_be_queried: Option<bool>,
    #[serde(
        rename = "detachedDOMTreeNode",
        skip_serializing_if = "Option::is_none"
    )]
    pub detached_dom_tree_node: Option<bool>,
}

/// One serialized edge row (containment or retainer direction).
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedEdge {
    /// Edge name for string-named edges, the element index rendered as a
    /// string otherwise.
    pub name: String,
    pub node: SerializedNode,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub edge_index: u32,
}

/// A paged window of serialized items.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsRange<T> {
    pub start_position: usize,
    pub end_position: usize,
    pub total_length: usize,
    pub items: Vec<T>,
}

/// Snapshot-wide facts the UI caches once.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticData {
    pub node_count: usize,
    pub root_node_index: usize,
    pub total_size: f64,
    /// Largest odd (JS) node id; 0 when the snapshot has none.
    pub max_js_node_id: u32,
}

/// Heap composition totals for the statistics pie.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: f64,
    pub v8heap: f64,
    pub native: f64,
    pub code: f64,
    pub js_arrays: f64,
    pub strings: f64,
    pub system: f64,
}

/// Allocation samples rebinned for the timeline overview.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Samples {
    pub timestamps_ms: Vec<f64>,
    pub last_assigned_ids: Vec<u32>,
    pub sizes: Vec<f64>,
}

/// Source position of an allocation site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub script_id: u32,
    pub line: u32,
    pub column: u32,
}

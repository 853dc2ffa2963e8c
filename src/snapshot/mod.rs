//! Heap snapshot analysis engine.
//!
//! Takes a parsed V8/Chromium heap snapshot (flat node/edge arrays, string
//! table, meta-schema) and derives everything interactive analysis needs:
//! retainer indexes, BFS distances, a dominator tree with retained sizes,
//! DOM attachedness, class aggregation, snapshot diffs, named filters, and
//! windowed providers for paginating results to a UI.
//!
//! Build order follows the data dependencies: edge indexes → retainers →
//! DOM state → flags → shallow sizes → distances → post-order → dominators
//! → retained sizes → class names → statistics. [`HeapSnapshot::build`]
//! runs them all; everything afterwards is a query.

pub mod aggregates;
pub mod class_names;
pub mod diff;
pub mod distance;
pub mod dom_state;
pub mod dominators;
pub mod engine;
pub mod errors;
pub mod essential;
pub mod filters;
pub mod flags;
pub mod graph;
pub mod input;
pub mod locations;
pub mod meta;
pub mod owners;
pub mod postorder;
pub mod progress;
pub mod provider;
pub mod retained;
pub mod retainers;
pub mod search;
pub mod serialize;
pub mod statistics;
pub mod strings;
#[cfg(test)]
pub(crate) mod test_fixture;

pub use aggregates::{Aggregate, AggregateForDiff};
pub use diff::Diff;
pub use engine::{AggregateFilter, EdgesProvider, HeapSnapshot, NodesProvider, RetainersProvider};
pub use errors::{BuildError, QueryError, SnapshotDataError};
pub use filters::NamedFilter;
pub use graph::{DomState, HeapGraph};
pub use input::{FieldType, RawMeta, RawSnapshot};
pub use progress::{CancelToken, NullProgress, ProgressSink, StructuralReport, VecProgress};
pub use provider::ComparatorConfig;
pub use search::SearchConfig;
pub use serialize::{
    ItemsRange, Location, Samples, SerializedEdge, SerializedNode, StaticData, Statistics,
};

/// Distance of a node no non-weak path reaches.
pub const NO_DISTANCE: i32 = -5;

/// Distance offset keeping system-only objects sorted after everything
/// page-visible.
pub const BASE_SYSTEM_DISTANCE: i32 = 100_000_000;

/// Distance for retainer edges hidden in the retainers view; sorts strictly
/// after system objects.
pub const BASE_UNREACHABLE_DISTANCE: i32 = BASE_SYSTEM_DISTANCE + 1000;

/// Node flag: the runtime can inspect the object from a page context.
pub const FLAG_CAN_BE_QUERIED: u32 = 1;
/// Node flag: part of a detached DOM tree.
pub const FLAG_DETACHED_DOM_TREE_NODE: u32 = 2;
/// Node flag: reachable from user roots over non-weak edges.
pub const FLAG_PAGE_OBJECT: u32 = 4;

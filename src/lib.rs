//! Queryable analytical model over V8/Chromium heap snapshots.
//!
//! A heap snapshot is a serialized memory graph: flat integer arrays of
//! nodes and edges plus a string table, described by a meta-schema. This
//! crate turns one into the derived structures interactive analysis needs:
//!
//! - Retainer (reverse-edge) indexes and retainer browsing.
//! - BFS distances with pluggable edge filters.
//! - An iterative dominator tree (Cooper–Harvey–Kennedy) with retained
//!   sizes and dominated-children buckets.
//! - DOM attachedness propagation and "Detached " renaming.
//! - Class-based aggregation, snapshot diffing, duplicate-string detection.
//! - Named filters, search, and comparator-driven windowed providers that
//!   paginate sorted results to a UI.
//!
//! Everything is computed exactly once by [`snapshot::HeapSnapshot::build`]
//! and cached; queries never mutate the graph. Snapshot parsing, UI
//! rendering, and allocation-profile tree construction live outside this
//! crate.
//!
//! ```
//! use heapgraph::snapshot::{HeapSnapshot, RawSnapshot};
//!
//! let snapshot = HeapSnapshot::from_raw(RawSnapshot::default());
//! // An empty snapshot fails fast: no nodes means no valid root.
//! assert!(snapshot.is_err());
//! ```

pub mod snapshot;
pub mod stdx;

//! Snapshot diffing by class.
//!
//! Two snapshots are compared per class name through their sorted id lists:
//! a two-pointer merge classifies every node as removed (only in base),
//! added (only in current), or unchanged. Node ids define identity: JS ids
//! are odd and survive across snapshots of the same heap, and native ids
//! are even, so the two ranges never collide.
//!
//! Classes are matched by name, not class index: indexes are interning
//! order and differ between snapshots.

use ahash::AHashMap;
use serde::Serialize;

use super::aggregates::AggregateForDiff;

/// Per-class diff between two snapshots.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diff {
    /// Node indexes in the current snapshot.
    pub added_indexes: Vec<u32>,
    /// Node indexes in the base snapshot.
    pub deleted_indexes: Vec<u32>,
    pub added_count: u32,
    pub removed_count: u32,
    pub added_size: f64,
    pub removed_size: f64,
    pub count_delta: i64,
    pub size_delta: f64,
}

/// Diffs one class. Returns `None` when nothing was added or removed.
pub fn diff_for_class(base: &AggregateForDiff, current: &AggregateForDiff) -> Option<Diff> {
    let mut diff = Diff::default();
    let mut i = 0;
    let mut j = 0;
    while i < base.ids.len() && j < current.ids.len() {
        let base_id = base.ids[i];
        let current_id = current.ids[j];
        if base_id < current_id {
            diff.deleted_indexes.push(base.indexes[i]);
            diff.removed_count += 1;
            diff.removed_size += base.self_sizes[i];
            i += 1;
        } else if base_id > current_id {
            diff.added_indexes.push(current.indexes[j]);
            diff.added_count += 1;
            diff.added_size += current.self_sizes[j];
            j += 1;
        } else {
            i += 1;
            j += 1;
        }
    }
    while i < base.ids.len() {
        diff.deleted_indexes.push(base.indexes[i]);
        diff.removed_count += 1;
        diff.removed_size += base.self_sizes[i];
        i += 1;
    }
    while j < current.ids.len() {
        diff.added_indexes.push(current.indexes[j]);
        diff.added_count += 1;
        diff.added_size += current.self_sizes[j];
        j += 1;
    }
    if diff.added_count == 0 && diff.removed_count == 0 {
        return None;
    }
    diff.count_delta = i64::from(diff.added_count) - i64::from(diff.removed_count);
    diff.size_delta = diff.added_size - diff.removed_size;
    Some(diff)
}

/// Diffs every class present in either snapshot, keyed by class name.
pub fn calculate_snapshot_diff(
    base: &AHashMap<String, AggregateForDiff>,
    current: &AHashMap<String, AggregateForDiff>,
) -> AHashMap<String, Diff> {
    let empty = AggregateForDiff::default();
    let mut result = AHashMap::new();

    for (class_name, current_row) in current {
        let base_row = base.get(class_name).unwrap_or(&empty);
        if let Some(diff) = diff_for_class(base_row, current_row) {
            result.insert(class_name.clone(), diff);
        }
    }
    // Classes that vanished entirely: everything removed.
    for (class_name, base_row) in base {
        if current.contains_key(class_name) {
            continue;
        }
        if let Some(diff) = diff_for_class(base_row, &empty) {
            result.insert(class_name.clone(), diff);
        }
    }
    result
}

//! Item providers and the windowed partial sort.
//!
//! UI grids page through edge and node lists tens of thousands of entries
//! long; only the requested window ever needs to be in order. The provider
//! keeps a materialized iteration order plus two scalars tracking how much
//! of the front and back is already sorted, and runs a partial quicksort
//! that recurses only into partitions intersecting the requested window.
//!
//! # Invariants
//! - `iteration_order` is a permutation of the provider's item indexes.
//! - `[0, sorted_prefix_length)` and `[len - sorted_suffix_length, len)`
//!   are in final sorted position under the current comparator.
//! - Changing the comparator resets both scalars.

use std::cmp::Ordering;

use super::errors::QueryError;
use super::serialize::ItemsRange;

/// Two-field sort specification from the UI.
///
/// Field names starting with `!edge` sort by edge attributes; all others by
/// attributes of the target node. Ties break on original item index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComparatorConfig {
    pub field_name1: String,
    pub ascending1: bool,
    pub field_name2: String,
    pub ascending2: bool,
}

/// Comparator over item indexes.
pub type ItemComparator<'a> = dyn Fn(u32, u32) -> Ordering + 'a;

/// Windowed view over an index array.
#[derive(Debug)]
pub struct ItemProvider {
    iteration_order: Vec<u32>,
    sorted_prefix_length: usize,
    sorted_suffix_length: usize,
}

impl ItemProvider {
    pub fn new(iteration_order: Vec<u32>) -> Self {
        Self {
            iteration_order,
            sorted_prefix_length: 0,
            sorted_suffix_length: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.iteration_order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.iteration_order.is_empty()
    }

    /// Forgets sorted state; call when the comparator changes.
    pub fn rewind(&mut self) {
        self.sorted_prefix_length = 0;
        self.sorted_suffix_length = 0;
    }

    /// Sorts `[begin, end)` under `comparator` if needed and materializes it
    /// through `materialize`.
    pub fn serialize_items_range<T>(
        &mut self,
        begin: usize,
        end: usize,
        comparator: Option<&ItemComparator<'_>>,
        mut materialize: impl FnMut(u32) -> T,
    ) -> Result<ItemsRange<T>, QueryError> {
        if begin > end {
            return Err(QueryError::InvalidWindow { begin, end });
        }
        let length = self.iteration_order.len();
        if begin >= length {
            return Ok(ItemsRange {
                start_position: begin,
                end_position: end,
                total_length: length,
                items: Vec::new(),
            });
        }
        let end = end.min(length);

        if let Some(comparator) = comparator {
            if self.sorted_prefix_length < end && begin < length - self.sorted_suffix_length {
                sort_range(
                    &mut self.iteration_order,
                    comparator,
                    self.sorted_prefix_length,
                    length - 1 - self.sorted_suffix_length,
                    begin,
                    end - 1,
                );
                if begin <= self.sorted_prefix_length {
                    self.sorted_prefix_length = end;
                }
                if end >= length - self.sorted_suffix_length {
                    self.sorted_suffix_length = length - begin;
                }
            }
        }

        let items = self.iteration_order[begin..end]
            .iter()
            .map(|&item| materialize(item))
            .collect();
        Ok(ItemsRange {
            start_position: begin,
            end_position: end,
            total_length: length,
            items,
        })
    }

    /// Current iteration order, for tests and full materialization.
    pub fn iteration_order(&self) -> &[u32] {
        &self.iteration_order
    }
}

/// Short ranges fall back to insertion sort.
const INSERTION_SORT_THRESHOLD: usize = 8;

/// Partially sorts `array[left..=right]` so that `[win_left, win_right]`
/// lands in final sorted position. Partitions entirely outside the window
/// are left unsorted.
pub fn sort_range(
    array: &mut [u32],
    comparator: &ItemComparator<'_>,
    left: usize,
    right: usize,
    win_left: usize,
    win_right: usize,
) {
    if left >= right {
        return;
    }
    quick_sort_range(array, comparator, left, right, win_left, win_right);
}

fn quick_sort_range(
    array: &mut [u32],
    comparator: &ItemComparator<'_>,
    left: usize,
    right: usize,
    win_left: usize,
    win_right: usize,
) {
    if right - left < INSERTION_SORT_THRESHOLD {
        insertion_sort(array, comparator, left, right);
        return;
    }
    let pivot_index = median_of_three(array, comparator, left, (left + right) / 2, right);
    let pivot_position = lomuto_partition(array, comparator, left, right, pivot_index);
    if win_left < pivot_position && pivot_position > left {
        quick_sort_range(array, comparator, left, pivot_position - 1, win_left, win_right);
    }
    if pivot_position < win_right && pivot_position < right {
        quick_sort_range(array, comparator, pivot_position + 1, right, win_left, win_right);
    }
}

fn insertion_sort(array: &mut [u32], comparator: &ItemComparator<'_>, left: usize, right: usize) {
    for i in left + 1..=right {
        let mut j = i;
        while j > left && comparator(array[j - 1], array[j]) == Ordering::Greater {
            array.swap(j - 1, j);
            j -= 1;
        }
    }
}

fn median_of_three(
    array: &[u32],
    comparator: &ItemComparator<'_>,
    a: usize,
    b: usize,
    c: usize,
) -> usize {
    let ab = comparator(array[a], array[b]);
    let bc = comparator(array[b], array[c]);
    let ac = comparator(array[a], array[c]);
    if ab != Ordering::Greater {
        if bc != Ordering::Greater {
            b
        } else if ac != Ordering::Greater {
            c
        } else {
            a
        }
    } else if bc == Ordering::Greater {
        b
    } else if ac == Ordering::Greater {
        c
    } else {
        a
    }
}

/// Lomuto partition: moves the pivot to the end, sweeps once, and returns
/// the pivot's final position.
fn lomuto_partition(
    array: &mut [u32],
    comparator: &ItemComparator<'_>,
    left: usize,
    right: usize,
    pivot_index: usize,
) -> usize {
    array.swap(pivot_index, right);
    let mut store = left;
    for i in left..right {
        if comparator(array[i], array[right]) == Ordering::Less {
            array.swap(i, store);
            store += 1;
        }
    }
    array.swap(store, right);
    store
}

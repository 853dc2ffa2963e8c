//! Small, self-contained data structures backing the snapshot engine.
//!
//! # Scope
//! `stdx` hosts narrow, allocation-light storage types used by the analysis
//! passes. They are tuned for predictable memory use and O(1) accessors
//! rather than general-purpose ergonomics.
//!
//! # Module map
//! - `bitset`: heap-allocated bitset with word-level operations.
//! - `paged`: chunked u32 vector for bulk arrays that may exceed what a
//!   single contiguous allocation should hold.

pub mod bitset;
pub mod paged;

pub use bitset::DynamicBitSet;
pub use paged::PagedU32;

//! Essential-edge policy shared by the distance, post-order, and dominator
//! passes.
//!
//! An edge is essential when it participates in dominator and post-order
//! computation:
//! - weak edges never are;
//! - shortcut edges are essential only at the root (root shortcuts mark user
//!   globals; elsewhere they are informational duplicates);
//! - an internal edge whose name parses as a WeakMap pair entry is
//!   non-essential when it originates at the WeakMap's table node (the
//!   parallel edge from the key stays essential, so the value is retained by
//!   key and map together rather than twice).
//!
//! Ephemeron names are parsed with a regex; a bit-vector over string indexes
//! caches negative matches so each non-matching name is parsed once.

use regex::Regex;

use crate::stdx::DynamicBitSet;

use super::graph::HeapGraph;
use super::strings::StringTable;

/// Parsed WeakMap pair edge name.
///
/// The serialized name looks like
/// `"1 / part of key (K @5) -> value (V @7) pair in WeakMap (table @3)"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeakMapEdgeName {
    pub key_id: u32,
    pub table_id: u32,
}

/// Caching parser for WeakMap pair edge names.
#[derive(Debug)]
pub struct EphemeronNameParser {
    re: Regex,
    non_matching: DynamicBitSet,
}

impl EphemeronNameParser {
    pub fn new() -> Self {
        Self {
            re: Regex::new(
                r"^\d+( / part of key \(.*? @(\d+)\) -> value \(.*? @\d+\) pair in WeakMap \(table @(\d+)\))$",
            )
            .expect("ephemeron name regex"),
            non_matching: DynamicBitSet::empty(0),
        }
    }

    /// Parses the string at `name_index`, caching negative results.
    pub fn parse(&mut self, strings: &StringTable, name_index: u32) -> Option<WeakMapEdgeName> {
        let idx = name_index as usize;
        if idx < self.non_matching.bit_length() && self.non_matching.is_set(idx) {
            return None;
        }
        let name = strings.get(idx);
        match self.re.captures(name) {
            Some(caps) => {
                let key_id: u32 = caps.get(2)?.as_str().parse().ok()?;
                let table_id: u32 = caps.get(3)?.as_str().parse().ok()?;
                Some(WeakMapEdgeName { key_id, table_id })
            }
            None => {
                self.remember_non_matching(idx, strings.len());
                None
            }
        }
    }

    fn remember_non_matching(&mut self, idx: usize, table_len: usize) {
        // The string table grows during analysis; resize the cache lazily.
        if idx >= self.non_matching.bit_length() {
            let mut grown = DynamicBitSet::empty(table_len.max(idx + 1));
            for bit in self.non_matching.iter_set() {
                grown.set(bit);
            }
            self.non_matching = grown;
        }
        self.non_matching.set(idx);
    }
}

impl Default for EphemeronNameParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared essential-edge predicate state.
#[derive(Debug)]
pub struct EssentialEdges {
    ephemeron: EphemeronNameParser,
}

impl EssentialEdges {
    pub fn new() -> Self {
        Self {
            ephemeron: EphemeronNameParser::new(),
        }
    }

    /// Whether the edge participates in post-order and dominator passes.
    ///
    /// `src_node_index` is the edge's source node index in field units.
    pub fn is_essential(
        &mut self,
        graph: &HeapGraph,
        src_node_index: usize,
        edge_index: usize,
    ) -> bool {
        let meta = graph.meta();
        let edge_type = graph.edge_type(edge_index);
        if edge_type == meta.edge_type_weak {
            return false;
        }
        if edge_type == meta.edge_type_shortcut {
            return src_node_index == graph.root_node_index();
        }
        if edge_type == meta.edge_type_internal {
            let name_index = graph.edge_name_or_index(edge_index);
            if let Some(pair) = self.ephemeron.parse(graph.strings(), name_index) {
                let src_ordinal = src_node_index / meta.node_field_count;
                // The table's copy of the pair edge is skipped; the key's
                // copy is kept.
                return graph.node_id(src_ordinal) != pair.table_id;
            }
        }
        true
    }

    pub fn ephemeron_parser_mut(&mut self) -> &mut EphemeronNameParser {
        &mut self.ephemeron
    }
}

impl Default for EssentialEdges {
    fn default() -> Self {
        Self::new()
    }
}

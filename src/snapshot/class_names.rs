//! Class-index assignment.
//!
//! Every node gets a class index packed into the upper 30 bits of the
//! detachedness field. The class index is a string-table index naming the
//! class the node aggregates under:
//!
//! - hidden nodes collapse to `"(system)"`, code nodes to
//!   `"(compiled code)"`, closures to `"Function"`, regexps to `"RegExp"`;
//! - object and native nodes named `<tag …>` (and their
//!   `Detached <tag …>` variants) truncate to `<tag>`;
//! - other object and native nodes reuse their own name's string index
//!   verbatim, so aggregation keys line up with node names;
//! - anything else becomes `"(" + type name + ")"`.
//!
//! Runs after DOM propagation: detached renames must land before class
//! indexes are packed. The string table grows here and nowhere later.

use super::errors::SnapshotDataError;
use super::graph::HeapGraph;

/// Largest class index the 30-bit packed field can hold.
const MAX_CLASS_INDEX: u32 = (1 << 30) - 1;

enum ClassKey {
    Interned(String),
    NameIndex(u32),
}

/// Assigns a class index to every node.
pub fn assign_class_indexes(graph: &mut HeapGraph) -> Result<(), SnapshotDataError> {
    let node_count = graph.node_count();
    for ordinal in 0..node_count {
        let key = class_key(graph, ordinal);
        let class_index = match key {
            ClassKey::NameIndex(index) => index,
            ClassKey::Interned(name) => graph.strings_mut().intern(&name),
        };
        if class_index > MAX_CLASS_INDEX {
            return Err(SnapshotDataError::ClassIndexOverflow {
                class_index: class_index as usize,
            });
        }
        graph.set_node_class_index(ordinal, class_index);
    }
    Ok(())
}

fn class_key(graph: &HeapGraph, ordinal: usize) -> ClassKey {
    let meta = graph.meta();
    let node_type = graph.node_type(ordinal);
    if node_type == meta.node_type_hidden {
        return ClassKey::Interned("(system)".to_owned());
    }
    if node_type == meta.node_type_code {
        return ClassKey::Interned("(compiled code)".to_owned());
    }
    if node_type == meta.node_type_closure {
        return ClassKey::Interned("Function".to_owned());
    }
    if node_type == meta.node_type_regexp {
        return ClassKey::Interned("RegExp".to_owned());
    }
    if node_type == meta.node_type_object || node_type == meta.node_type_native {
        let name = graph.node_name(ordinal);
        // Angle-bracket names always intern so `<tag>` literals and
        // truncated `<tag …>` variants share one class index.
        if let Some(rest) = name.strip_prefix('<') {
            return ClassKey::Interned(match rest.find(' ') {
                Some(space) => format!("<{}>", &rest[..space]),
                None => name.to_owned(),
            });
        }
        if name.starts_with("Detached <") {
            return ClassKey::Interned(match name[10..].find(' ') {
                Some(space) => format!("{}>", &name[..10 + space]),
                None => name.to_owned(),
            });
        }
        return ClassKey::NameIndex(graph.node_name_index(ordinal));
    }
    ClassKey::Interned(format!("({})", meta.node_type_name(node_type)))
}

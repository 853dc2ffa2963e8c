//! Error types for snapshot loading and queries.
//!
//! Errors are split by stage so diagnostics stay precise: data-invariant
//! violations abort the build, caller mistakes are returned from queries
//! without touching engine state. All enums are `#[non_exhaustive]` so new
//! variants can be added without breaking callers.

use std::fmt;

/// Fatal data-invariant violations detected while building the analytical
/// model. Any of these means the input arrays are corrupt or exceed the
/// engine's representable ranges; the build stops and no partial engine is
/// returned.
#[derive(Debug)]
#[non_exhaustive]
pub enum SnapshotDataError {
    /// A required meta field is missing from the schema.
    MissingField {
        record: &'static str,
        field: &'static str,
    },
    /// A required type name is absent from the declared type enum.
    MissingType {
        record: &'static str,
        type_name: &'static str,
    },
    /// The nodes array length is not a multiple of the node field count.
    NodesLengthMisaligned { len: usize, field_count: usize },
    /// The edges array length is not a multiple of the edge field count.
    EdgesLengthMisaligned { len: usize, field_count: usize },
    /// Sum of per-node edge counts disagrees with the edges array.
    EdgeCountMismatch { declared: usize, actual: usize },
    /// An edge target is not aligned to the node field count.
    InvalidToNodeIndex { edge_index: usize, to_node: usize },
    /// A name references a string outside the string table.
    StringIndexOutOfRange { index: usize, table_len: usize },
    /// The root node index is out of range or misaligned.
    InvalidRootIndex { root_index: usize },
    /// A class index does not fit the 30-bit packed field.
    ClassIndexOverflow { class_index: usize },
    /// Node count exceeds what shallow-size reassignment can represent.
    TooManyNodesForOwners { node_count: usize },
    /// The locations array length is not a multiple of the location field count.
    LocationsLengthMisaligned { len: usize, field_count: usize },
}

impl fmt::Display for SnapshotDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { record, field } => {
                write!(f, "snapshot meta is missing {record} field {field:?}")
            }
            Self::MissingType { record, type_name } => {
                write!(f, "snapshot meta is missing {record} type {type_name:?}")
            }
            Self::NodesLengthMisaligned { len, field_count } => {
                write!(
                    f,
                    "nodes array length {len} is not a multiple of the field count {field_count}"
                )
            }
            Self::EdgesLengthMisaligned { len, field_count } => {
                write!(
                    f,
                    "edges array length {len} is not a multiple of the field count {field_count}"
                )
            }
            Self::EdgeCountMismatch { declared, actual } => {
                write!(
                    f,
                    "edge count mismatch: node records declare {declared} edges, edges array holds {actual}"
                )
            }
            Self::InvalidToNodeIndex { edge_index, to_node } => {
                write!(f, "invalid toNodeIndex {to_node} at edge {edge_index}")
            }
            Self::StringIndexOutOfRange { index, table_len } => {
                write!(
                    f,
                    "string index {index} out of range (table holds {table_len})"
                )
            }
            Self::InvalidRootIndex { root_index } => {
                write!(f, "invalid root node index {root_index}")
            }
            Self::ClassIndexOverflow { class_index } => {
                write!(f, "class index {class_index} exceeds the 30-bit packed field")
            }
            Self::TooManyNodesForOwners { node_count } => {
                write!(
                    f,
                    "node count {node_count} too large for shallow-size reassignment"
                )
            }
            Self::LocationsLengthMisaligned { len, field_count } => {
                write!(
                    f,
                    "locations array length {len} is not a multiple of the field count {field_count}"
                )
            }
        }
    }
}

impl std::error::Error for SnapshotDataError {}

/// Errors terminating [`HeapSnapshot::build`](crate::snapshot::HeapSnapshot::build).
#[derive(Debug)]
#[non_exhaustive]
pub enum BuildError {
    /// The input violated a data invariant.
    Data(SnapshotDataError),
    /// The host cancelled the build through its [`CancelToken`](super::progress::CancelToken).
    Canceled,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(err) => write!(f, "{err}"),
            Self::Canceled => write!(f, "snapshot build cancelled"),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Data(err) => Some(err),
            Self::Canceled => None,
        }
    }
}

impl From<SnapshotDataError> for BuildError {
    fn from(err: SnapshotDataError) -> Self {
        Self::Data(err)
    }
}

/// Caller errors returned from queries. These never alter engine state.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueryError {
    /// The named filter does not exist.
    UnknownFilter { name: String },
    /// A provider window with `begin > end` or other malformed bounds.
    InvalidWindow { begin: usize, end: usize },
    /// A diff was requested against an unknown base snapshot id.
    UnknownBaseSnapshot { base_id: String },
    /// A search query failed to compile as a regular expression.
    BadSearchQuery { detail: String },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFilter { name } => write!(f, "unknown filter: {name:?}"),
            Self::InvalidWindow { begin, end } => {
                write!(f, "invalid items window: {begin}..{end}")
            }
            Self::UnknownBaseSnapshot { base_id } => {
                write!(f, "unknown base snapshot id: {base_id:?}")
            }
            Self::BadSearchQuery { detail } => write!(f, "bad search query: {detail}"),
        }
    }
}

impl std::error::Error for QueryError {}

// SPDX-License-Identifier: Apache-2.0
//! The single error family surfaced by the staging machine, delta engine,
//! node store, and field API.
//!
//! All variants are disjoint kinds; none are retried internally. Errors
//! surface synchronously from the entry point that raised them — a failed
//! mutator leaves the `Stage` unchanged, and a failed reconstruction
//! aborts with the offending node id rather than returning a partial
//! table.

/// An axis-labeled lookup or predicate error's axis field.
pub type AxisIndex = deltaflow_format::Axis;

/// Every error this workspace can raise above the format/hash layer.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The field directory at the given path does not exist or is not a
    /// valid field.
    #[error("field path error: {0}")]
    FieldPath(String),

    /// A name lookup (origin, arrow) found nothing.
    #[error("no {kind} named '{name}'")]
    NameLookup {
        /// What kind of name was being looked up (`origin`, `arrow`).
        kind: &'static str,
        /// The name that was not found.
        name: String,
    },

    /// A node id lookup found nothing on disk.
    #[error("no node with id {0}")]
    IdLookup(String),

    /// An `add_origin`/`add_arrow` name was already taken.
    #[error("a {kind} named '{name}' already exists")]
    NameExists {
        /// What kind of name collided (`origin`, `arrow`).
        kind: &'static str,
        /// The name that already existed.
        name: String,
    },

    /// `add_arrow` was called with a name starting with `.`, which is
    /// reserved for the per-origin default arrow `add_origin` creates.
    #[error("arrow name '{0}' starts with the reserved '.' prefix")]
    ReservedName(String),

    /// `add_origin` was called with content identical to an existing
    /// origin under a different name.
    #[error("{kind} with id {id} already holds this content")]
    Information {
        /// What kind of object already held this content.
        kind: &'static str,
        /// The id of the existing object.
        id: String,
    },

    /// A value did not have the type an operation required.
    #[error("object type error")]
    ObjectType,

    /// An axis indexer referenced a label that does not make sense for
    /// the requested axis.
    #[error("bad indexer on axis {axis:?}: {value}")]
    Indexer {
        /// The axis the indexer targeted.
        axis: AxisIndex,
        /// A description of the offending value.
        value: String,
    },

    /// An axis label's shape did not match what was expected (e.g. an
    /// unnamed `Series` where a label was required).
    #[error("axis label error: {0}")]
    AxisLabel(String),

    /// A cell or column value had an incompatible dtype.
    #[error("data type error")]
    DataType,

    /// A `relabel` call's new labels had the wrong length.
    #[error("set index error: expected {expected} labels, got {got}")]
    SetIndex {
        /// The length the target axis required.
        expected: usize,
        /// The length actually supplied.
        got: usize,
    },

    /// An `extend` call's table did not align on the expected axis.
    #[error("insertion error: expected {expected}, got {got}")]
    Insertion {
        /// The length or shape expected.
        expected: usize,
        /// The length or shape supplied.
        got: usize,
    },

    /// An `extend` call introduced no new labels on the target axis.
    #[error("extension error on axis {0:?}")]
    Extension(AxisIndex),

    /// A `drop(method = intersection)` selection was empty.
    #[error("intersection error: no matching labels")]
    Intersection,

    /// A `drop(method = difference)` selection was empty.
    #[error("difference error: no new labels to drop")]
    Difference,

    /// A `put` call's `y` (the net change) was empty — it would be a
    /// no-op.
    #[error("put error: no net change")]
    Put,

    /// `undo` was called with an empty log.
    #[error("undo error: nothing to undo")]
    Undo,

    /// Reconstruction found a header hash or data hash that disagreed with
    /// the stored node id.
    #[error("integrity error: node {node} ({kind}) failed verification")]
    Integrity {
        /// The node id whose hash failed to verify.
        node: String,
        /// What was being verified (`header`, `data`, `origin`).
        kind: &'static str,
    },

    /// A block's metadata or payload was malformed.
    #[error(transparent)]
    Format(#[from] deltaflow_format::FormatError),

    /// An I/O failure while reading or writing a field directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A header or origins-index file failed to parse as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// SPDX-License-Identifier: Apache-2.0
//! Errors raised by the table model, block codec, and delta file container.

/// Failures raised while building, diffing, or (de)serializing tables and
/// delta file containers.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// A column label repeated within a single table.
    #[error("duplicate column label: {0}")]
    DuplicateLabel(String),

    /// A row-index key repeated within a single table.
    #[error("duplicate row label: {0}")]
    DuplicateRow(i64),

    /// A column's or index's length disagreed with the table's shape.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch {
        /// The length the table's current shape required.
        expected: usize,
        /// The length actually supplied.
        got: usize,
    },

    /// A cell write used a value whose type did not match the target
    /// column's dtype and could not be coerced.
    #[error("cell value does not match column dtype")]
    DataType,

    /// A row or column label referenced in an operation does not exist in
    /// the target table.
    #[error("referenced row or column label does not exist in this table")]
    UnknownLabel,

    /// A block's metadata was structurally malformed or named an unknown
    /// block class.
    #[error("malformed block: {0}")]
    Block(String),

    /// The underlying table payload codec failed to encode or decode.
    #[error("table codec error: {0}")]
    Codec(String),

    /// The delta file container's trailing metadata directory or length
    /// tail could not be parsed.
    #[error("malformed delta file container: {0}")]
    Container(String),

    /// An I/O failure while reading or writing a delta file / origin file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

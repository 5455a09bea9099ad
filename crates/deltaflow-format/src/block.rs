// SPDX-License-Identifier: Apache-2.0
//! The three block kinds a delta payload is built from: axis, put, and
//! extend. Each knows how to serialize itself to a [`PartitionWriter`],
//! parse itself back from its raw partitions, and fold itself into a
//! table.

use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::partition::{split_partitions, PartitionWriter};
use crate::table::{Axis, Dtype, Table};

/// The kind of index an axis carries, recorded for round-trip fidelity
/// with the source format this container descends from. This
/// implementation only ever produces `IntegerIndex` (rows) and
/// `LabelIndex` (columns), but a reader tolerates all three.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum AxisKind {
    /// A contiguous default integer range.
    RangeIndex,
    /// An explicit, possibly non-contiguous integer index.
    IntegerIndex,
    /// A string-labeled index.
    LabelIndex,
}

/// Per-axis structural metadata inside an [`AxisBlockMeta`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AxisMeta {
    /// Number of labels affected on this axis.
    pub shape: usize,
    /// The axis's index kind.
    #[serde(rename = "type")]
    pub kind: AxisKind,
    /// An optional axis name, carried for round-trip fidelity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A block's chunk length: one integer for a single-partition block, or an
/// ordered tuple of integers for a multi-partition block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Chunk {
    /// A single partition's byte length.
    Single(u64),
    /// An ordered tuple of partition byte lengths.
    Multi(Vec<u64>),
}

impl Chunk {
    /// The partition lengths this chunk describes, as a flat slice view.
    #[must_use]
    pub fn lengths(&self) -> Vec<u64> {
        match self {
            Self::Single(n) => vec![*n],
            Self::Multi(ns) => ns.clone(),
        }
    }
}

/// Metadata for an [`AxisBlock`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AxisBlockMeta {
    /// Always `"axis"`.
    pub class: String,
    /// Partition byte lengths, always four: drop rows, drop columns,
    /// relabel rows, relabel columns.
    pub chunk: Chunk,
    /// Row-axis structure, present only if rows were dropped or relabeled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis0: Option<AxisMeta>,
    /// Column-axis structure, present only if columns were dropped or
    /// relabeled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis1: Option<AxisMeta>,
}

/// Drops and relabels for both axes, expressed in baseline coordinates.
///
/// Drops are interpreted in the coordinates of the table *before* any
/// relabel recorded in this same block — [`AxisBlock::apply`] always
/// drops before relabeling, independently per axis.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AxisBlock {
    /// Row labels to drop, in baseline coordinates.
    pub drop_rows: Vec<i64>,
    /// Column labels to drop, in baseline coordinates.
    pub drop_cols: Vec<String>,
    /// New row labels, replacing the row axis element-wise after drops.
    pub relabel_rows: Vec<i64>,
    /// New column labels, replacing the column axis element-wise after
    /// drops.
    pub relabel_cols: Vec<String>,
}

impl AxisBlock {
    /// Whether this block carries no work at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drop_rows.is_empty()
            && self.drop_cols.is_empty()
            && self.relabel_rows.is_empty()
            && self.relabel_cols.is_empty()
    }

    /// Serialize this block's four partitions and build its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Codec`] if the inner CBOR encoding fails.
    pub fn write(&self) -> Result<(AxisBlockMeta, Vec<u8>), FormatError> {
        let mut w = PartitionWriter::new();
        ciborium::ser::into_writer(&self.drop_rows, &mut w).map_err(|e| FormatError::Codec(e.to_string()))?;
        w.next();
        ciborium::ser::into_writer(&self.drop_cols, &mut w).map_err(|e| FormatError::Codec(e.to_string()))?;
        w.next();
        ciborium::ser::into_writer(&self.relabel_rows, &mut w).map_err(|e| FormatError::Codec(e.to_string()))?;
        w.next();
        ciborium::ser::into_writer(&self.relabel_cols, &mut w).map_err(|e| FormatError::Codec(e.to_string()))?;
        let (payload, lens) = w.finish();

        let axis0 = if self.drop_rows.is_empty() && self.relabel_rows.is_empty() {
            None
        } else {
            let shape = if self.relabel_rows.is_empty() { self.drop_rows.len() } else { self.relabel_rows.len() };
            Some(AxisMeta { shape, kind: AxisKind::IntegerIndex, name: None })
        };
        let axis1 = if self.drop_cols.is_empty() && self.relabel_cols.is_empty() {
            None
        } else {
            let shape = if self.relabel_cols.is_empty() { self.drop_cols.len() } else { self.relabel_cols.len() };
            Some(AxisMeta { shape, kind: AxisKind::LabelIndex, name: None })
        };

        let meta = AxisBlockMeta { class: "axis".to_string(), chunk: Chunk::Multi(lens), axis0, axis1 };
        Ok((meta, payload))
    }

    /// Parse a block back from its raw payload and chunk lengths.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Block`] if the partition count is wrong, or
    /// [`FormatError::Codec`] if a partition fails to decode.
    pub fn parse(meta: &AxisBlockMeta, payload: &[u8]) -> Result<Self, FormatError> {
        let lens = meta.chunk.lengths();
        if lens.len() != 4 {
            return Err(FormatError::Block(format!("axis block expects 4 partitions, got {}", lens.len())));
        }
        let parts = split_partitions(payload, &lens);
        let decode = |bytes: &[u8]| -> Result<_, FormatError> {
            ciborium::de::from_reader(bytes).map_err(|e| FormatError::Codec(e.to_string()))
        };
        Ok(Self {
            drop_rows: decode(parts[0])?,
            drop_cols: decode(parts[1])?,
            relabel_rows: decode(parts[2])?,
            relabel_cols: decode(parts[3])?,
        })
    }

    /// Fold this block into `table`: drops on both axes, then relabels on
    /// both axes.
    #[must_use]
    pub fn apply(&self, mut table: Table) -> Table {
        if !self.drop_rows.is_empty() {
            table = table.drop_rows(&self.drop_rows);
        }
        if !self.drop_cols.is_empty() {
            let labels: Vec<&str> = self.drop_cols.iter().map(String::as_str).collect();
            table = table.drop_columns(&labels);
        }
        if !self.relabel_rows.is_empty() {
            // Apply failures here would indicate a corrupt delta file;
            // surfaced to the caller via the container's integrity check
            // rather than panicking mid-fold.
            let _ = table.relabel_rows(&self.relabel_rows);
        }
        if !self.relabel_cols.is_empty() {
            let _ = table.relabel_columns(&self.relabel_cols);
        }
        table
    }
}

/// Metadata for a [`PutBlock`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PutBlockMeta {
    /// Always `"put"`.
    pub class: String,
    /// Per-column dtype to coerce to after the update, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtypes: Option<Vec<(String, Dtype)>>,
    /// `[row_count, column_count]` of the put payload.
    pub shape: [usize; 2],
    /// Total number of overwritten cells.
    pub count: usize,
    /// Single-partition byte length.
    pub chunk: Chunk,
}

/// Non-null value overrides at live coordinates, with optional dtype
/// preservation.
#[derive(Clone, Debug, PartialEq)]
pub struct PutBlock {
    /// The sparse cells to overwrite, keyed by row-index and column label.
    pub values: Table,
    /// Dtypes to coerce touched columns to after applying, if the dtype at
    /// commit time diverged from the baseline.
    pub dtypes: Option<Vec<(String, Dtype)>>,
}

impl PutBlock {
    /// Serialize this block's single partition and build its metadata.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Codec`] if the inner CBOR encoding fails.
    pub fn write(&self) -> Result<(PutBlockMeta, Vec<u8>), FormatError> {
        let mut w = PartitionWriter::new();
        self.values.to_cbor(&mut w)?;
        let (payload, lens) = w.finish();
        let count = self.values.index().len() * self.values.column_labels().len();
        let meta = PutBlockMeta {
            class: "put".to_string(),
            dtypes: self.dtypes.clone(),
            shape: [self.values.shape(Axis::Row), self.values.shape(Axis::Column)],
            count,
            chunk: Chunk::Single(lens.first().copied().unwrap_or(0)),
        };
        Ok((meta, payload))
    }

    /// Parse a block back from its raw payload.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Codec`] if the payload fails to decode.
    pub fn parse(meta: &PutBlockMeta, payload: &[u8]) -> Result<Self, FormatError> {
        let values = Table::from_cbor(payload)?;
        Ok(Self { values, dtypes: meta.dtypes.clone() })
    }

    /// Fold this block into `table`: update targeted cells, then coerce
    /// dtypes of touched columns to their recorded tag, if any.
    #[must_use]
    pub fn apply(&self, mut table: Table) -> Table {
        let _ = table.update_from(&self.values);
        if let Some(dtypes) = &self.dtypes {
            for (label, dtype) in dtypes {
                let _ = table.cast_column(label, *dtype);
            }
        }
        table
    }
}

/// Metadata for an [`ExtensionBlock`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtensionBlockMeta {
    /// Always `"extend"`.
    pub class: String,
    /// `[row_count, col_count]` of the appended-columns partition, or
    /// `None` if no columns were appended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols_shape: Option<[usize; 2]>,
    /// `[row_count, col_count]` of the appended-rows partition, or `None`
    /// if no rows were appended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows_shape: Option<[usize; 2]>,
    /// Two-partition byte lengths: appended columns, then appended rows.
    pub chunk: Chunk,
}

/// Appended columns and appended rows for a single commit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtensionBlock {
    /// New columns, aligned on the current row-index; `None` if none.
    pub cols: Option<Table>,
    /// New rows, carrying all current columns; `None` if none.
    pub rows: Option<Table>,
}

impl ExtensionBlock {
    /// Whether this block carries no work at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cols.is_none() && self.rows.is_none()
    }

    /// Serialize this block's (up to) two partitions and build its
    /// metadata.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Codec`] if the inner CBOR encoding fails.
    pub fn write(&self) -> Result<(ExtensionBlockMeta, Vec<u8>), FormatError> {
        let mut w = PartitionWriter::new();
        let empty = Table::empty();
        self.cols.as_ref().unwrap_or(&empty).to_cbor(&mut w)?;
        w.next();
        self.rows.as_ref().unwrap_or(&empty).to_cbor(&mut w)?;
        let (payload, lens) = w.finish();
        let meta = ExtensionBlockMeta {
            class: "extend".to_string(),
            cols_shape: self.cols.as_ref().map(|t| [t.shape(Axis::Row), t.shape(Axis::Column)]),
            rows_shape: self.rows.as_ref().map(|t| [t.shape(Axis::Row), t.shape(Axis::Column)]),
            chunk: Chunk::Multi(lens),
        };
        Ok((meta, payload))
    }

    /// Parse a block back from its raw payload.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Block`] if the partition count is wrong, or
    /// [`FormatError::Codec`] if a partition fails to decode.
    pub fn parse(meta: &ExtensionBlockMeta, payload: &[u8]) -> Result<Self, FormatError> {
        let lens = meta.chunk.lengths();
        if lens.len() != 2 {
            return Err(FormatError::Block(format!("extend block expects 2 partitions, got {}", lens.len())));
        }
        let parts = split_partitions(payload, &lens);
        let cols = if meta.cols_shape.is_some() { Some(Table::from_cbor(parts[0])?) } else { None };
        let rows = if meta.rows_shape.is_some() { Some(Table::from_cbor(parts[1])?) } else { None };
        Ok(Self { cols, rows })
    }

    /// Fold this block into `table`: concatenate columns first, then rows.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if a shape mismatch makes the
    /// concatenation impossible.
    pub fn apply(&self, mut table: Table) -> Result<Table, FormatError> {
        if let Some(cols) = self.cols.clone() {
            table.extend_columns(cols)?;
        }
        if let Some(rows) = self.rows.clone() {
            table.extend_rows(rows)?;
        }
        Ok(table)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn one_col_table() -> Table {
        Table::new(vec![0, 1], vec![("a".to_string(), Column::Int64(vec![Some(1), Some(2)]))]).unwrap()
    }

    // ── 1. axis block round trips drops and relabels ──
    #[test]
    fn axis_block_round_trip() {
        let block = AxisBlock {
            drop_rows: vec![1],
            drop_cols: vec![],
            relabel_rows: vec![],
            relabel_cols: vec!["renamed".to_string()],
        };
        let (meta, payload) = block.write().unwrap();
        assert!(meta.axis0.is_some());
        assert!(meta.axis1.is_some());
        let parsed = AxisBlock::parse(&meta, &payload).unwrap();
        assert_eq!(parsed, block);
    }

    // ── 2. axis block apply drops before relabeling ──
    #[test]
    fn axis_block_apply_drops_then_relabels() {
        let block = AxisBlock { drop_rows: vec![1], relabel_rows: vec![10], ..Default::default() };
        let out = block.apply(one_col_table());
        assert_eq!(out.index(), &[10]);
    }

    // ── 3. put block round trips values and dtypes ──
    #[test]
    fn put_block_round_trip() {
        let values = Table::new(vec![0], vec![("a".to_string(), Column::Int64(vec![Some(9)]))]).unwrap();
        let block = PutBlock { values, dtypes: Some(vec![("a".to_string(), Dtype::Int64)]) };
        let (meta, payload) = block.write().unwrap();
        assert_eq!(meta.count, 1);
        let parsed = PutBlock::parse(&meta, &payload).unwrap();
        assert_eq!(parsed.values, block.values);
    }

    // ── 4. extend block carries independent cols/rows partitions ──
    #[test]
    fn extension_block_round_trip_cols_only() {
        let cols = Table::new(vec![0, 1], vec![("c".to_string(), Column::Int64(vec![Some(1), Some(2)]))]).unwrap();
        let block = ExtensionBlock { cols: Some(cols), rows: None };
        let (meta, payload) = block.write().unwrap();
        assert!(meta.cols_shape.is_some());
        assert!(meta.rows_shape.is_none());
        let parsed = ExtensionBlock::parse(&meta, &payload).unwrap();
        assert_eq!(parsed.cols, block.cols);
        assert_eq!(parsed.rows, None);
    }

    // ── 5. extend block apply concatenates columns before rows ──
    #[test]
    fn extension_block_apply_extends_table() {
        let new_col = Table::new(vec![0, 1], vec![("b".to_string(), Column::Int64(vec![Some(5), Some(6)]))]).unwrap();
        let block = ExtensionBlock { cols: Some(new_col), rows: None };
        let out = block.apply(one_col_table()).unwrap();
        assert_eq!(out.shape(Axis::Column), 2);
    }

    // ── 6. chunk serializes single as a bare number, multi as an array ──
    #[test]
    fn chunk_serializes_untagged() {
        let single = serde_json::to_string(&Chunk::Single(5)).unwrap();
        assert_eq!(single, "5");
        let multi = serde_json::to_string(&Chunk::Multi(vec![1, 2])).unwrap();
        assert_eq!(multi, "[1,2]");
    }
}

// SPDX-License-Identifier: Apache-2.0
//! The in-memory columnar table: an ordered sequence of uniquely-labeled
//! columns over an ordered, uniquely-keyed row-index.
//!
//! The row-index is a label, not a positional offset — row `7` is wherever
//! it is in [`Table::index`], not necessarily the eighth row physically.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// Which axis an operation targets: rows (`Row`) or columns (`Column`).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Axis {
    /// The row axis (axis 0).
    Row,
    /// The column axis (axis 1).
    Column,
}

impl Axis {
    /// The numeric axis index used in wire metadata (0 = row, 1 = column).
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Row => 0,
            Self::Column => 1,
        }
    }
}

/// A column's declared data type, preserved across block round trips.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Dtype {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

/// A single cell value, or the absence of one.
#[derive(Clone, PartialEq, Debug)]
pub enum Cell {
    /// An integer cell.
    Int64(i64),
    /// A floating-point cell.
    Float64(f64),
    /// A boolean cell.
    Bool(bool),
    /// A string cell.
    Utf8(String),
    /// An absent (null) cell.
    Null,
}

/// A single column's storage: a dtype-homogeneous, nullable vector.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum Column {
    /// Integer column.
    Int64(Vec<Option<i64>>),
    /// Floating-point column.
    Float64(Vec<Option<f64>>),
    /// Boolean column.
    Bool(Vec<Option<bool>>),
    /// String column.
    Utf8(Vec<Option<String>>),
}

impl Column {
    /// This column's declared dtype.
    #[must_use]
    pub const fn dtype(&self) -> Dtype {
        match self {
            Self::Int64(_) => Dtype::Int64,
            Self::Float64(_) => Dtype::Float64,
            Self::Bool(_) => Dtype::Bool,
            Self::Utf8(_) => Dtype::Utf8,
        }
    }

    /// Number of rows stored in this column.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Int64(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Utf8(v) => v.len(),
        }
    }

    /// Whether this column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the cell at physical row position `pos`.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is out of bounds; callers always resolve a row
    /// label to a position via [`Table::row_position`] first, so an
    /// out-of-bounds position indicates an internal inconsistency rather
    /// than a reachable user error.
    #[must_use]
    pub fn get(&self, pos: usize) -> Cell {
        match self {
            Self::Int64(v) => v[pos].map_or(Cell::Null, Cell::Int64),
            Self::Float64(v) => v[pos].map_or(Cell::Null, Cell::Float64),
            Self::Bool(v) => v[pos].map_or(Cell::Null, Cell::Bool),
            Self::Utf8(v) => v[pos].clone().map_or(Cell::Null, Cell::Utf8),
        }
    }

    /// Overwrite the cell at physical row position `pos`.
    ///
    /// A type mismatch between `cell` and this column's dtype is not an
    /// error here: the caller (the `put` operation) is responsible for
    /// dtype coercion after the write, per the block codec's `dtypes`
    /// metadata contract.
    pub fn set(&mut self, pos: usize, cell: &Cell) -> Result<(), FormatError> {
        match (self, cell) {
            (Self::Int64(v), Cell::Int64(x)) => v[pos] = Some(*x),
            (Self::Int64(v), Cell::Null) => v[pos] = None,
            (Self::Float64(v), Cell::Float64(x)) => v[pos] = Some(*x),
            (Self::Float64(v), Cell::Null) => v[pos] = None,
            (Self::Bool(v), Cell::Bool(x)) => v[pos] = Some(*x),
            (Self::Bool(v), Cell::Null) => v[pos] = None,
            (Self::Utf8(v), Cell::Utf8(x)) => v[pos] = Some(x.clone()),
            (Self::Utf8(v), Cell::Null) => v[pos] = None,
            _ => return Err(FormatError::DataType),
        }
        Ok(())
    }

    fn select(&self, positions: &[usize]) -> Self {
        match self {
            Self::Int64(v) => Self::Int64(positions.iter().map(|&p| v[p]).collect()),
            Self::Float64(v) => Self::Float64(positions.iter().map(|&p| v[p]).collect()),
            Self::Bool(v) => Self::Bool(positions.iter().map(|&p| v[p]).collect()),
            Self::Utf8(v) => Self::Utf8(positions.iter().map(|&p| v[p].clone()).collect()),
        }
    }

    fn null_of_len(dtype: Dtype, len: usize) -> Self {
        match dtype {
            Dtype::Int64 => Self::Int64(vec![None; len]),
            Dtype::Float64 => Self::Float64(vec![None; len]),
            Dtype::Bool => Self::Bool(vec![None; len]),
            Dtype::Utf8 => Self::Utf8(vec![None; len]),
        }
    }

    fn cast(&self, dtype: Dtype) -> Self {
        if self.dtype() == dtype {
            return self.clone();
        }
        let len = self.len();
        let mut out = Self::null_of_len(dtype, len);
        for pos in 0..len {
            let cell = self.get(pos);
            let coerced = match (&dtype, cell) {
                (Dtype::Int64, Cell::Float64(x)) => Cell::Int64(x as i64),
                (Dtype::Float64, Cell::Int64(x)) => Cell::Float64(x as f64),
                (_, Cell::Null) => Cell::Null,
                (_, other) => other,
            };
            // A best-effort cast never fails: incompatible combinations
            // (e.g. `Utf8` -> `Bool`) fall through `set`'s match and are
            // silently left null, since `cast` is only ever invoked with
            // dtypes recorded by a prior successful write in this format.
            let _ = out.set(pos, &coerced);
        }
        out
    }

    fn is_fully_null(&self) -> bool {
        match self {
            Self::Int64(v) => v.iter().all(Option::is_none),
            Self::Float64(v) => v.iter().all(Option::is_none),
            Self::Bool(v) => v.iter().all(Option::is_none),
            Self::Utf8(v) => v.iter().all(Option::is_none),
        }
    }
}

/// An ordered sequence of uniquely-labeled columns over an ordered,
/// uniquely-keyed row-index.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Table {
    index: Vec<i64>,
    columns: Vec<(String, Column)>,
}

impl Table {
    /// Build a table from a row-index and an ordered list of labeled
    /// columns.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::DuplicateLabel`] or [`FormatError::DuplicateRow`]
    /// if labels or row keys repeat, and [`FormatError::ShapeMismatch`] if a
    /// column's length disagrees with the index length.
    pub fn new(index: Vec<i64>, columns: Vec<(String, Column)>) -> Result<Self, FormatError> {
        let mut seen_rows = std::collections::HashSet::with_capacity(index.len());
        for &row in &index {
            if !seen_rows.insert(row) {
                return Err(FormatError::DuplicateRow(row));
            }
        }
        let mut seen_cols = std::collections::HashSet::with_capacity(columns.len());
        for (label, column) in &columns {
            if !seen_cols.insert(label.clone()) {
                return Err(FormatError::DuplicateLabel(label.clone()));
            }
            if column.len() != index.len() {
                return Err(FormatError::ShapeMismatch {
                    expected: index.len(),
                    got: column.len(),
                });
            }
        }
        Ok(Self { index, columns })
    }

    /// An empty table with no rows and no columns.
    #[must_use]
    pub fn empty() -> Self {
        Self { index: Vec::new(), columns: Vec::new() }
    }

    /// The row-index, in table order.
    #[must_use]
    pub fn index(&self) -> &[i64] {
        &self.index
    }

    /// The column labels, in table order.
    #[must_use]
    pub fn column_labels(&self) -> Vec<&str> {
        self.columns.iter().map(|(l, _)| l.as_str()).collect()
    }

    /// The number of entries along `axis`.
    #[must_use]
    pub fn shape(&self, axis: Axis) -> usize {
        match axis {
            Axis::Row => self.index.len(),
            Axis::Column => self.columns.len(),
        }
    }

    /// Borrow a column by label.
    #[must_use]
    pub fn column(&self, label: &str) -> Option<&Column> {
        self.columns.iter().find(|(l, _)| l == label).map(|(_, c)| c)
    }

    /// Resolve a row label to its physical position.
    #[must_use]
    pub fn row_position(&self, row: i64) -> Option<usize> {
        self.index.iter().position(|&r| r == row)
    }

    /// Resolve a column label to its physical position.
    #[must_use]
    pub fn column_position(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|(l, _)| l == label)
    }

    /// Read the cell at `(row, column)`, if both labels exist.
    #[must_use]
    pub fn get(&self, row: i64, label: &str) -> Option<Cell> {
        let pos = self.row_position(row)?;
        self.column(label).map(|c| c.get(pos))
    }

    /// Build the submatrix containing only `rows`, preserving column order.
    ///
    /// Rows not present in this table are silently skipped; callers that
    /// need strict membership checking do so before calling this.
    #[must_use]
    pub fn select_rows(&self, rows: &[i64]) -> Self {
        let positions: Vec<usize> = rows.iter().filter_map(|&r| self.row_position(r)).collect();
        let kept_rows: Vec<i64> = positions.iter().map(|&p| self.index[p]).collect();
        let columns = self
            .columns
            .iter()
            .map(|(label, col)| (label.clone(), col.select(&positions)))
            .collect();
        Self { index: kept_rows, columns }
    }

    /// Build the submatrix containing only `labels`, preserving row order.
    #[must_use]
    pub fn select_columns(&self, labels: &[&str]) -> Self {
        let columns = labels
            .iter()
            .filter_map(|&label| self.column(label).map(|c| (label.to_string(), c.clone())))
            .collect();
        Self { index: self.index.clone(), columns }
    }

    /// Build this table with `rows` removed from the row-index.
    #[must_use]
    pub fn drop_rows(&self, rows: &[i64]) -> Self {
        let keep: Vec<i64> = self.index.iter().copied().filter(|r| !rows.contains(r)).collect();
        self.select_rows(&keep)
    }

    /// Build this table with `labels` removed from the columns.
    #[must_use]
    pub fn drop_columns(&self, labels: &[&str]) -> Self {
        let keep: Vec<&str> = self
            .columns
            .iter()
            .map(|(l, _)| l.as_str())
            .filter(|l| !labels.contains(l))
            .collect();
        self.select_columns(&keep)
    }

    /// Replace the row-index element-wise, in position order.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::ShapeMismatch`] if `new_labels` has a
    /// different length than the current index.
    pub fn relabel_rows(&mut self, new_labels: &[i64]) -> Result<(), FormatError> {
        if new_labels.len() != self.index.len() {
            return Err(FormatError::ShapeMismatch { expected: self.index.len(), got: new_labels.len() });
        }
        self.index = new_labels.to_vec();
        Ok(())
    }

    /// Replace the column labels element-wise, in position order.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::ShapeMismatch`] if `new_labels` has a
    /// different length than the current column count.
    pub fn relabel_columns(&mut self, new_labels: &[String]) -> Result<(), FormatError> {
        if new_labels.len() != self.columns.len() {
            return Err(FormatError::ShapeMismatch { expected: self.columns.len(), got: new_labels.len() });
        }
        for (slot, new_label) in self.columns.iter_mut().zip(new_labels) {
            slot.0 = new_label.clone();
        }
        Ok(())
    }

    /// Overwrite every cell present in `values` into this table, by
    /// row/column label. `values`'s rows and columns must already be a
    /// subset of this table's.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::UnknownLabel`] if `values` references a row
    /// or column label absent from this table.
    pub fn update_from(&mut self, values: &Table) -> Result<(), FormatError> {
        for (label, col) in &values.columns {
            let target = self.columns.iter_mut().find(|(l, _)| l == label).ok_or(FormatError::UnknownLabel)?;
            if target.1.dtype() != col.dtype() {
                target.1 = target.1.cast(col.dtype());
            }
        }
        for &row in &values.index {
            let pos = self.row_position(row).ok_or(FormatError::UnknownLabel)?;
            for (label, col) in &values.columns {
                let src_pos = values.row_position(row).ok_or(FormatError::UnknownLabel)?;
                let cell = col.get(src_pos);
                let target = self
                    .columns
                    .iter_mut()
                    .find(|(l, _)| l == label)
                    .ok_or(FormatError::UnknownLabel)?;
                target.1.set(pos, &cell)?;
            }
        }
        Ok(())
    }

    /// Coerce a column's storage to `dtype`, preserving cell values where
    /// representable.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::UnknownLabel`] if `label` is not a column of
    /// this table.
    pub fn cast_column(&mut self, label: &str, dtype: Dtype) -> Result<(), FormatError> {
        let slot = self.columns.iter_mut().find(|(l, _)| l == label).ok_or(FormatError::UnknownLabel)?;
        slot.1 = slot.1.cast(dtype);
        Ok(())
    }

    /// Append new columns, aligned on this table's row-index.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::ShapeMismatch`] if `extra`'s row-index does
    /// not match this table's exactly.
    pub fn extend_columns(&mut self, extra: Table) -> Result<(), FormatError> {
        if extra.index != self.index {
            return Err(FormatError::ShapeMismatch { expected: self.index.len(), got: extra.index.len() });
        }
        self.columns.extend(extra.columns);
        Ok(())
    }

    /// Append new rows, carrying all current columns.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::ShapeMismatch`] if `extra`'s columns do not
    /// match this table's columns exactly (label and order).
    pub fn extend_rows(&mut self, extra: Table) -> Result<(), FormatError> {
        if extra.column_labels() != self.column_labels() {
            return Err(FormatError::ShapeMismatch { expected: self.columns.len(), got: extra.columns.len() });
        }
        self.index.extend(extra.index);
        for ((_, col), (_, extra_col)) in self.columns.iter_mut().zip(extra.columns) {
            match (col, extra_col) {
                (Column::Int64(a), Column::Int64(b)) => a.extend(b),
                (Column::Float64(a), Column::Float64(b)) => a.extend(b),
                (Column::Bool(a), Column::Bool(b)) => a.extend(b),
                (Column::Utf8(a), Column::Utf8(b)) => a.extend(b),
                _ => return Err(FormatError::DataType),
            }
        }
        Ok(())
    }

    /// Drop rows and columns that are entirely null after selecting `mask`
    /// cells to keep; used by [`shrink`].
    fn dropna_empty_axes(mut self) -> Self {
        let keep_rows: Vec<i64> = self
            .index
            .iter()
            .copied()
            .filter(|&row| {
                let pos = self.row_position(row).unwrap_or(usize::MAX);
                self.columns.iter().any(|(_, col)| !matches!(col.get(pos), Cell::Null))
            })
            .collect();
        self = self.select_rows(&keep_rows);
        let keep_cols: Vec<&str> = self
            .columns
            .iter()
            .filter(|(_, col)| !col.is_fully_null())
            .map(|(l, _)| l.as_str())
            .collect();
        self.select_columns(&keep_cols)
    }

    /// Serialize this table to `writer` as a self-contained CBOR payload.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Codec`] on an underlying I/O or encoding
    /// failure.
    pub fn to_cbor<W: Write>(&self, writer: W) -> Result<(), FormatError> {
        ciborium::ser::into_writer(self, writer).map_err(|e| FormatError::Codec(e.to_string()))
    }

    /// Deserialize a table previously written by [`Table::to_cbor`].
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Codec`] on an underlying I/O or decoding
    /// failure.
    pub fn from_cbor<R: Read>(reader: R) -> Result<Self, FormatError> {
        ciborium::de::from_reader(reader).map_err(|e| FormatError::Codec(e.to_string()))
    }
}

/// The minimal submatrix of `y` whose cells differ from `x`, with rows and
/// columns that are entirely null after masking dropped.
///
/// This is the canonical minimization shared by the `put` operation and the
/// delta engine's value-diff stage. Only the row/column labels present in
/// *both* `x` and `y` are compared; `y`'s shape beyond that intersection is
/// ignored.
#[must_use]
pub fn shrink(x: &Table, y: &Table) -> Table {
    let rows: Vec<i64> = y.index.iter().copied().filter(|r| x.row_position(*r).is_some()).collect();
    let cols: Vec<&str> = y
        .column_labels()
        .into_iter()
        .filter(|c| x.column_position(c).is_some())
        .collect();
    let x_aligned = x.select_rows(&rows).select_columns(&cols);
    let mut y_aligned = y.select_rows(&rows).select_columns(&cols);

    for row in rows {
        for &label in &cols {
            let xv = x_aligned.get(row, label);
            let yv = y_aligned.get(row, label);
            if xv == yv {
                let pos = y_aligned.row_position(row).unwrap_or_default();
                if let Some((_, col)) = y_aligned.columns.iter_mut().find(|(l, _)| l == label) {
                    let _ = col.set(pos, &Cell::Null);
                }
            }
        }
    }
    y_aligned.dropna_empty_axes()
}

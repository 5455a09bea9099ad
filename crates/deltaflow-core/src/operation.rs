// SPDX-License-Identifier: Apache-2.0
//! Tagged operations over a staged table: `Put`, `Drop`, `Extend`,
//! `Relabel`. Each carries enough state to be inverted against the exact
//! live table state it produced — the delta engine later projects the
//! same state back into baseline coordinates.

use deltaflow_format::{Axis, Dtype, Table};

use crate::error::CoreError;

/// Axis labels in either their row (integer) or column (string) form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AxisLabels {
    /// Row-index keys.
    Rows(Vec<i64>),
    /// Column labels.
    Cols(Vec<String>),
}

impl AxisLabels {
    /// The number of labels carried.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Rows(v) => v.len(),
            Self::Cols(v) => v.len(),
        }
    }

    /// Whether no labels are carried.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single user edit, carrying exactly the state its delta-engine
/// projection needs: `x` (prior values), `y` (new values), `reference`
/// (pre-drop axis order), and `axis`.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    /// Non-null value overrides. `x` is the prior cell values, `y` the new
    /// ones, `dtypes` the column dtype to coerce to on either side of the
    /// round trip.
    Put {
        /// Cells before the write.
        x: Table,
        /// Cells after the write (the net change).
        y: Table,
        /// Dtype to preserve per touched column.
        dtypes: Vec<(String, Dtype)>,
    },
    /// A structural drop. `data` holds the removed rows/columns (with
    /// their values, for undo); `reference` is the pre-drop axis order so
    /// undo can reinsert at the original positions.
    Drop {
        /// The removed rows or columns, with their values.
        data: Table,
        /// The full axis order before this drop.
        reference: AxisLabels,
        /// Which axis was dropped.
        axis: Axis,
    },
    /// An appended set of rows or columns.
    Extend {
        /// The appended rows or columns.
        data: Table,
        /// Which axis was extended.
        axis: Axis,
    },
    /// An element-wise axis relabel.
    Relabel {
        /// The axis labels before the relabel.
        x: AxisLabels,
        /// The axis labels after the relabel.
        y: AxisLabels,
        /// Which axis was relabeled.
        axis: Axis,
    },
}

fn combine_and_reorder_rows(current: &Table, dropped: &Table, order: &[i64]) -> Result<Table, CoreError> {
    let mut combined = current.clone();
    combined.extend_rows(dropped.clone())?;
    Ok(combined.select_rows(order))
}

fn combine_and_reorder_cols(current: &Table, dropped: &Table, order: &[String]) -> Result<Table, CoreError> {
    let mut combined = current.clone();
    combined.extend_columns(dropped.clone())?;
    let order_refs: Vec<&str> = order.iter().map(String::as_str).collect();
    Ok(combined.select_columns(&order_refs))
}

impl Operation {
    /// Fold this operation forward into `table`.
    pub fn execute(&self, table: Table) -> Result<Table, CoreError> {
        match self {
            Self::Put { y, dtypes, .. } => {
                let mut t = table;
                t.update_from(y)?;
                for (label, dtype) in dtypes {
                    t.cast_column(label, *dtype)?;
                }
                Ok(t)
            }
            Self::Drop { data, axis, .. } => match axis {
                Axis::Row => Ok(table.drop_rows(data.index())),
                Axis::Column => {
                    let labels = data.column_labels();
                    Ok(table.drop_columns(&labels))
                }
            },
            Self::Extend { data, axis } => {
                let mut t = table;
                match axis {
                    Axis::Row => t.extend_rows(data.clone())?,
                    Axis::Column => t.extend_columns(data.clone())?,
                }
                Ok(t)
            }
            Self::Relabel { y, axis, .. } => {
                let mut t = table;
                match (axis, y) {
                    (Axis::Row, AxisLabels::Rows(labels)) => t.relabel_rows(labels)?,
                    (Axis::Column, AxisLabels::Cols(labels)) => t.relabel_columns(labels)?,
                    _ => return Err(CoreError::ObjectType),
                }
                Ok(t)
            }
        }
    }

    /// Invert this operation, recovering the table state it was applied
    /// against.
    pub fn undo(&self, table: Table) -> Result<Table, CoreError> {
        match self {
            Self::Put { x, dtypes, .. } => {
                let mut t = table;
                t.update_from(x)?;
                for (label, dtype) in dtypes {
                    t.cast_column(label, *dtype)?;
                }
                Ok(t)
            }
            Self::Drop { data, reference, axis, .. } => match (axis, reference) {
                (Axis::Row, AxisLabels::Rows(order)) => combine_and_reorder_rows(&table, data, order),
                (Axis::Column, AxisLabels::Cols(order)) => combine_and_reorder_cols(&table, data, order),
                _ => Err(CoreError::ObjectType),
            },
            Self::Extend { data, axis } => match axis {
                Axis::Row => Ok(table.drop_rows(data.index())),
                Axis::Column => {
                    let labels = data.column_labels();
                    Ok(table.drop_columns(&labels))
                }
            },
            Self::Relabel { x, axis, .. } => {
                let mut t = table;
                match (axis, x) {
                    (Axis::Row, AxisLabels::Rows(labels)) => t.relabel_rows(labels)?,
                    (Axis::Column, AxisLabels::Cols(labels)) => t.relabel_columns(labels)?,
                    _ => return Err(CoreError::ObjectType),
                }
                Ok(t)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use deltaflow_format::Column;

    fn sample() -> Table {
        Table::new(
            vec![0, 1],
            vec![
                ("a".to_string(), Column::Int64(vec![Some(1), Some(2)])),
                ("b".to_string(), Column::Int64(vec![Some(3), Some(4)])),
            ],
        )
        .unwrap()
    }

    // ── 1. put execute then undo restores the original table ──
    #[test]
    fn put_round_trips_through_undo() {
        let base = sample();
        let x = Table::new(vec![0], vec![("a".to_string(), Column::Int64(vec![Some(1)]))]).unwrap();
        let y = Table::new(vec![0], vec![("a".to_string(), Column::Int64(vec![Some(99)]))]).unwrap();
        let op = Operation::Put { x, y, dtypes: vec![("a".to_string(), Dtype::Int64)] };

        let after = op.execute(base.clone()).unwrap();
        assert_eq!(after.get(0, "a"), Some(deltaflow_format::Cell::Int64(99)));

        let restored = op.undo(after).unwrap();
        assert_eq!(restored, base);
    }

    // ── 2. drop then undo reinserts at the original position ──
    #[test]
    fn drop_round_trips_through_undo() {
        let base = sample();
        let dropped_data = base.select_rows(&[0]);
        let op = Operation::Drop { data: dropped_data, reference: AxisLabels::Rows(vec![0, 1]), axis: Axis::Row };

        let after = op.execute(base.clone()).unwrap();
        assert_eq!(after.index(), &[1]);

        let restored = op.undo(after).unwrap();
        assert_eq!(restored, base);
    }

    // ── 3. extend then undo removes exactly the appended rows ──
    #[test]
    fn extend_round_trips_through_undo() {
        let base = sample();
        let extra = Table::new(
            vec![2],
            vec![("a".to_string(), Column::Int64(vec![Some(5)])), ("b".to_string(), Column::Int64(vec![Some(6)]))],
        )
        .unwrap();
        let op = Operation::Extend { data: extra, axis: Axis::Row };

        let after = op.execute(base.clone()).unwrap();
        assert_eq!(after.index(), &[0, 1, 2]);

        let restored = op.undo(after).unwrap();
        assert_eq!(restored, base);
    }

    // ── 4. relabel then undo restores original labels ──
    #[test]
    fn relabel_round_trips_through_undo() {
        let base = sample();
        let op = Operation::Relabel {
            x: AxisLabels::Rows(vec![0, 1]),
            y: AxisLabels::Rows(vec![10, 11]),
            axis: Axis::Row,
        };

        let after = op.execute(base.clone()).unwrap();
        assert_eq!(after.index(), &[10, 11]);

        let restored = op.undo(after).unwrap();
        assert_eq!(restored, base);
    }
}

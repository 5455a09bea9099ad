// SPDX-License-Identifier: Apache-2.0
//! The four public staging mutators: `put`, `drop`, `extend`, `relabel`.
//!
//! Each validates its input against the current `live` table, builds the
//! `Operation` the delta engine will later project, and appends it as a new
//! [`Layer`] via [`Stage::commit_layer`]. A mutator that finds nothing to do
//! (an empty net diff, an empty drop/extend selection) returns an error
//! rather than silently pushing a vacuous layer — except `put`, whose
//! contract (`spec.md` §4.4, §8 property 3) is to no-op quietly so that the
//! *next* `commit()` is the one that raises [`CoreError::Put`].

use std::collections::HashSet;

use deltaflow_format::{shrink, Axis, Table};

use crate::error::CoreError;
use crate::operation::{AxisLabels, Operation};
use crate::stage::{Layer, Stage};

/// How [`Stage::drop`] selects labels to remove.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DropMethod {
    /// Drop the labels shared between `live` and the caller's selection.
    Intersection,
    /// Drop the `live` labels that are *not* in the caller's selection.
    Difference,
}

fn current_axis_labels(table: &Table, axis: Axis) -> AxisLabels {
    match axis {
        Axis::Row => AxisLabels::Rows(table.index().to_vec()),
        Axis::Column => AxisLabels::Cols(table.column_labels().iter().map(|s| (*s).to_string()).collect()),
    }
}

impl Stage {
    /// Overwrite cells of `live` with the non-null values of `data` at the
    /// intersection of their row and column labels.
    ///
    /// Columns that intersect must already share a dtype; a mismatch is
    /// rejected rather than silently coerced. If the net change is empty
    /// (every intersecting cell already agrees), this is a silent no-op: the
    /// log is not grown and `Ok(())` is returned, per `spec.md` §8 property
    /// 3 — it is `commit()`, not `put()`, that raises [`CoreError::Put`] for
    /// an empty log.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DataType`] if an intersecting column's dtype
    /// differs between `live` and `data`.
    pub fn put(&mut self, data: &Table) -> Result<(), CoreError> {
        let live = self.live();
        let update_rows: Vec<i64> =
            live.index().iter().copied().filter(|r| data.row_position(*r).is_some()).collect();
        let update_cols: Vec<&str> =
            live.column_labels().into_iter().filter(|c| data.column_position(c).is_some()).collect();

        let stage_slice = live.select_rows(&update_rows).select_columns(&update_cols);
        let data_slice = data.select_rows(&update_rows).select_columns(&update_cols);

        for label in &update_cols {
            let stage_dtype = stage_slice.column(label).map(deltaflow_format::Column::dtype);
            let data_dtype = data_slice.column(label).map(deltaflow_format::Column::dtype);
            if stage_dtype != data_dtype {
                return Err(CoreError::DataType);
            }
        }

        // `x` (prior values, per `Operation::Put`) is the side of the diff
        // that comes from the *live* table; `y` (new values) comes from the
        // incoming `data`. See DESIGN.md for why this is the opposite
        // argument order of spec.md §4.4's literal prose.
        let x = shrink(&data_slice, &stage_slice);
        let y = shrink(&stage_slice, &data_slice);

        if y.shape(Axis::Row) == 0 {
            return Ok(());
        }

        let dtypes: Vec<(String, deltaflow_format::Dtype)> = y
            .column_labels()
            .into_iter()
            .filter_map(|label| stage_slice.column(label).map(|c| (label.to_string(), c.dtype())))
            .collect();

        let mut layer = Layer::new();
        let op = Operation::Put { x, y, dtypes };
        let new_live = layer.push(live.clone(), op)?;
        self.commit_layer(layer, new_live);
        Ok(())
    }

    /// Remove labels from `axis`, selected either as the intersection with
    /// `index` or as `live`'s labels minus `index` (per `method`).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Intersection`] if `method` is
    /// [`DropMethod::Intersection`] and no labels match, or
    /// [`CoreError::Difference`] if `method` is [`DropMethod::Difference`]
    /// and every `live` label is already in `index`.
    pub fn drop(&mut self, index: &AxisLabels, axis: Axis, method: DropMethod) -> Result<(), CoreError> {
        let live = self.live();
        let reference = current_axis_labels(live, axis);

        let selected = match (&reference, index) {
            (AxisLabels::Rows(current), AxisLabels::Rows(want)) => {
                let want_set: HashSet<i64> = want.iter().copied().collect();
                let picked: Vec<i64> = match method {
                    DropMethod::Intersection => current.iter().copied().filter(|r| want_set.contains(r)).collect(),
                    DropMethod::Difference => current.iter().copied().filter(|r| !want_set.contains(r)).collect(),
                };
                AxisLabels::Rows(picked)
            }
            (AxisLabels::Cols(current), AxisLabels::Cols(want)) => {
                let want_set: HashSet<&str> = want.iter().map(String::as_str).collect();
                let picked: Vec<String> = match method {
                    DropMethod::Intersection => {
                        current.iter().filter(|c| want_set.contains(c.as_str())).cloned().collect()
                    }
                    DropMethod::Difference => {
                        current.iter().filter(|c| !want_set.contains(c.as_str())).cloned().collect()
                    }
                };
                AxisLabels::Cols(picked)
            }
            _ => return Err(CoreError::ObjectType),
        };

        if selected.is_empty() {
            return Err(if method == DropMethod::Intersection { CoreError::Intersection } else { CoreError::Difference });
        }

        let data = match &selected {
            AxisLabels::Rows(rows) => live.select_rows(rows),
            AxisLabels::Cols(cols) => {
                let refs: Vec<&str> = cols.iter().map(String::as_str).collect();
                live.select_columns(&refs)
            }
        };

        let mut layer = Layer::new();
        let op = Operation::Drop { data, reference, axis };
        let new_live = layer.push(live.clone(), op)?;
        self.commit_layer(layer, new_live);
        Ok(())
    }

    /// Append rows or columns to `live`.
    ///
    /// Extending axis 0 (rows) requires `data`'s columns to cover every
    /// column of `live`; extending axis 1 (columns) requires `data`'s rows
    /// to cover every row of `live`. Either way, `data` must introduce at
    /// least one new label on the target axis; labels on the *other* axis
    /// that don't intersect `live` are silently dropped from the appended
    /// slice rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Difference`] if `data` introduces no new labels
    /// on the target axis, or [`CoreError::Extension`] if `data` does not
    /// cover every label on the opposite axis.
    pub fn extend(&mut self, data: &Table, axis: Axis) -> Result<(), CoreError> {
        let live = self.live().clone();
        let ext = match axis {
            Axis::Row => {
                let new_rows: Vec<i64> =
                    data.index().iter().copied().filter(|r| live.row_position(*r).is_none()).collect();
                if new_rows.is_empty() {
                    return Err(CoreError::Difference);
                }
                let live_cols = live.column_labels();
                let covered = live_cols.iter().all(|c| data.column_position(c).is_some());
                if !covered {
                    return Err(CoreError::Extension(axis));
                }
                data.select_rows(&new_rows).select_columns(&live_cols)
            }
            Axis::Column => {
                let new_cols: Vec<&str> =
                    data.column_labels().into_iter().filter(|c| live.column_position(c).is_none()).collect();
                if new_cols.is_empty() {
                    return Err(CoreError::Difference);
                }
                let live_rows = live.index();
                let covered = live_rows.iter().all(|r| data.row_position(*r).is_some());
                if !covered {
                    return Err(CoreError::Extension(axis));
                }
                data.select_rows(live_rows).select_columns(&new_cols)
            }
        };

        let mut layer = Layer::new();
        let op = Operation::Extend { data: ext, axis };
        let new_live = layer.push(live, op)?;
        self.commit_layer(layer, new_live);
        Ok(())
    }

    /// Replace `axis`'s labels element-wise with `new_labels`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SetIndex`] if `new_labels`'s length does not
    /// match `live`'s current length on `axis`.
    pub fn relabel(&mut self, new_labels: &AxisLabels, axis: Axis) -> Result<(), CoreError> {
        let live = self.live();
        let expected = live.shape(axis);
        if new_labels.len() != expected {
            return Err(CoreError::SetIndex { expected, got: new_labels.len() });
        }

        let x = current_axis_labels(live, axis);
        let mut layer = Layer::new();
        let op = Operation::Relabel { x, y: new_labels.clone(), axis };
        let new_live = layer.push(live.clone(), op)?;
        self.commit_layer(layer, new_live);
        Ok(())
    }
}

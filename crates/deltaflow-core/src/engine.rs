// SPDX-License-Identifier: Apache-2.0
//! The delta engine: compiles a [`Stage`]'s `(base, live, log)` triple into
//! the minimal ordered [`DeltaPayload`] a commit persists.
//!
//! Three stages, run once per commit:
//!
//! - **Align** walks the operation log, projecting every `Drop`/`Relabel`
//!   into *baseline* coordinates against a shrinking shadow of the base
//!   axis labels.
//! - **Extract** strips the projected drops from `base`, carves any
//!   trailing extension labels off `live`, rewrites `live`'s relabeled axes
//!   back to baseline coordinates, and shrinks the remainder into the
//!   minimal put payload.
//! - **Build** emits only the blocks that carry work, in the canonical
//!   `axis`, `put`, `extend` order.
//!
//! The engine treats the log as a monoid over a three-axis state (drops,
//! relabels, in-place writes) projected into baseline coordinates; any
//! interleaving of the four mutators reduces to the same minimal triple
//! (`spec.md` §4.5, §8 property 5).

use std::collections::HashMap;

use deltaflow_format::{shrink, Axis, DeltaPayload, Dtype, ExtensionBlock, PutBlock, Table};

use crate::operation::AxisLabels;
use crate::stage::Stage;

#[derive(Default)]
struct AlignState {
    base_rows: Vec<i64>,
    base_cols: Vec<String>,
    drop_rows: Vec<i64>,
    drop_cols: Vec<String>,
    relabel_rows: Option<Vec<i64>>,
    relabel_cols: Option<Vec<String>>,
    row_map: Option<HashMap<i64, i64>>,
    col_map: Option<HashMap<String, String>>,
}

impl AlignState {
    fn new(base: &Table) -> Self {
        Self {
            base_rows: base.index().to_vec(),
            base_cols: base.column_labels().iter().map(|s| (*s).to_string()).collect(),
            ..Self::default()
        }
    }

    fn drop_row_label(&mut self, current: i64) {
        let base_label = match &self.row_map {
            Some(map) => map.get(&current).copied(),
            None => self.base_rows.contains(&current).then_some(current),
        };
        if let Some(base_label) = base_label {
            if let Some(pos) = self.base_rows.iter().position(|&r| r == base_label) {
                self.base_rows.remove(pos);
                if let Some(relabel_rows) = self.relabel_rows.as_mut() {
                    relabel_rows.remove(pos);
                }
            }
            self.drop_rows.push(base_label);
            if let Some(map) = self.row_map.as_mut() {
                map.remove(&current);
            }
        }
    }

    fn drop_col_label(&mut self, current: &str) {
        let base_label = match &self.col_map {
            Some(map) => map.get(current).cloned(),
            None => self.base_cols.iter().any(|c| c == current).then(|| current.to_string()),
        };
        if let Some(base_label) = base_label {
            if let Some(pos) = self.base_cols.iter().position(|c| c == &base_label) {
                self.base_cols.remove(pos);
                if let Some(relabel_cols) = self.relabel_cols.as_mut() {
                    relabel_cols.remove(pos);
                }
            }
            self.drop_cols.push(base_label);
            if let Some(map) = self.col_map.as_mut() {
                map.remove(current);
            }
        }
    }

    fn relabel_rows_to(&mut self, new_labels: &[i64]) {
        let n = self.base_rows.len();
        let taken: Vec<i64> = new_labels.iter().take(n).copied().collect();
        let mut map = HashMap::with_capacity(n);
        for (base_label, new_label) in self.base_rows.iter().zip(taken.iter()) {
            map.insert(*new_label, *base_label);
        }
        self.row_map = Some(map);
        self.relabel_rows = Some(taken);
    }

    fn relabel_cols_to(&mut self, new_labels: &[String]) {
        let n = self.base_cols.len();
        let taken: Vec<String> = new_labels.iter().take(n).cloned().collect();
        let mut map = HashMap::with_capacity(n);
        for (base_label, new_label) in self.base_cols.iter().zip(taken.iter()) {
            map.insert(new_label.clone(), base_label.clone());
        }
        self.col_map = Some(map);
        self.relabel_cols = Some(taken);
    }
}

/// Compile `stage`'s log into the minimal ordered block set a commit
/// persists.
#[must_use]
pub fn build_delta(stage: &Stage) -> DeltaPayload {
    let base = stage.base();
    let mut align = AlignState::new(base);

    for op in stage.iter_operations() {
        match op {
            crate::operation::Operation::Drop { data, axis, .. } => match axis {
                Axis::Row => {
                    for row in data.index() {
                        align.drop_row_label(*row);
                    }
                }
                Axis::Column => {
                    for label in data.column_labels() {
                        align.drop_col_label(label);
                    }
                }
            },
            crate::operation::Operation::Relabel { y, axis, .. } => match (axis, y) {
                (Axis::Row, AxisLabels::Rows(labels)) => align.relabel_rows_to(labels),
                (Axis::Column, AxisLabels::Cols(labels)) => align.relabel_cols_to(labels),
                _ => {}
            },
            crate::operation::Operation::Put { .. } | crate::operation::Operation::Extend { .. } => {}
        }
    }

    // Stage B — Extract.
    let drop_col_refs: Vec<&str> = align.drop_cols.iter().map(String::as_str).collect();
    let x = base.drop_rows(&align.drop_rows).drop_columns(&drop_col_refs);

    // Correspondence between `x` (baseline coordinates) and `live` (possibly
    // relabeled) is positional, not label-based: drops filter without
    // reordering, relabels replace labels element-wise in place, and
    // extensions always append at the tail. So the first `x.shape(axis)`
    // positions of `live` are exactly `x`'s rows/columns under whatever
    // labels `live` currently carries.
    let live = stage.live();
    let base_row_labels_in_live: Vec<i64> = live.index()[..x.shape(Axis::Row)].to_vec();
    let mut ext_cols_table = None;
    if live.shape(Axis::Column) > x.shape(Axis::Column) {
        let all_cols = live.column_labels();
        let trailing: Vec<&str> = all_cols[x.shape(Axis::Column)..].to_vec();
        ext_cols_table = Some(live.select_rows(&base_row_labels_in_live).select_columns(&trailing));
    }
    let mut ext_rows_table = None;
    if live.shape(Axis::Row) > x.shape(Axis::Row) {
        let all_rows = live.index();
        let trailing: Vec<i64> = all_rows[x.shape(Axis::Row)..].to_vec();
        // Carry every column `live` currently has, not just the base
        // columns: `ExtensionBlock::apply` concatenates the column block
        // first, so by the time the row block folds in, the table already
        // has any columns this same commit appended. `live` already holds
        // a value (possibly null) for new rows under those columns, since
        // `Table::extend_columns` requires full index coverage.
        let all_col_labels = live.column_labels();
        ext_rows_table = Some(live.select_rows(&trailing).select_columns(&all_col_labels));
    }

    let mut live_work = live.clone();
    if let Some(relabel_rows) = &align.relabel_rows {
        let _ = relabel_rows;
        let mut new_labels = x.index().to_vec();
        new_labels.extend(live.index()[x.shape(Axis::Row)..].iter().copied());
        let _ = live_work.relabel_rows(&new_labels);
    }
    if align.relabel_cols.is_some() {
        let mut new_labels: Vec<String> = x.column_labels().iter().map(|s| (*s).to_string()).collect();
        new_labels.extend(live.column_labels()[x.shape(Axis::Column)..].iter().map(|s| (*s).to_string()));
        let _ = live_work.relabel_columns(&new_labels);
    }

    let put_values = shrink(&x, &live_work);
    let dtypes = if put_values.shape(Axis::Row) == 0 {
        None
    } else {
        let recorded: Vec<(String, Dtype)> = put_values
            .column_labels()
            .into_iter()
            .filter_map(|label| {
                let x_dtype = x.column(label).map(deltaflow_format::Column::dtype)?;
                let put_dtype = put_values.column(label).map(deltaflow_format::Column::dtype)?;
                (x_dtype != put_dtype).then_some((label.to_string(), x_dtype))
            })
            .collect();
        if recorded.is_empty() { None } else { Some(recorded) }
    };

    // Stage C — Build.
    let axis_block = if align.drop_rows.is_empty()
        && align.drop_cols.is_empty()
        && align.relabel_rows.is_none()
        && align.relabel_cols.is_none()
    {
        None
    } else {
        Some(deltaflow_format::AxisBlock {
            drop_rows: align.drop_rows,
            drop_cols: align.drop_cols,
            relabel_rows: align.relabel_rows.unwrap_or_default(),
            relabel_cols: align.relabel_cols.unwrap_or_default(),
        })
    };

    let put_block = if put_values.shape(Axis::Row) == 0 { None } else { Some(PutBlock { values: put_values, dtypes }) };

    let extend_block = if ext_cols_table.is_none() && ext_rows_table.is_none() {
        None
    } else {
        Some(ExtensionBlock { cols: ext_cols_table, rows: ext_rows_table })
    };

    DeltaPayload { axis: axis_block, put: put_block, extend: extend_block }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mutate::DropMethod;
    use deltaflow_format::{Cell, Column};

    fn sample() -> Table {
        Table::new(
            vec![0, 1, 2],
            vec![
                ("a".to_string(), Column::Int64(vec![Some(1), Some(2), Some(3)])),
                ("b".to_string(), Column::Int64(vec![Some(4), Some(5), Some(6)])),
            ],
        )
        .unwrap()
    }

    // ── 1. a put-only stage emits exactly one put block ──
    #[test]
    fn put_only_emits_single_block() {
        let mut stage = Stage::new(sample());
        let patch = Table::new(vec![0], vec![("a".to_string(), Column::Int64(vec![Some(99)]))]).unwrap();
        stage.put(&patch).unwrap();

        let payload = build_delta(&stage);
        assert!(payload.axis.is_none());
        assert!(payload.extend.is_none());
        let put = payload.put.unwrap();
        assert_eq!(put.values.index(), &[0]);
        assert_eq!(put.values.get(0, "a"), Some(Cell::Int64(99)));
    }

    // ── 2. drop then extend yields one axis block and one extend block ──
    #[test]
    fn drop_then_extend_emits_axis_and_extend() {
        let mut stage = Stage::new(sample());
        stage.drop(&AxisLabels::Rows(vec![1]), Axis::Row, DropMethod::Intersection).unwrap();
        let new_col = Table::new(vec![0, 2], vec![("c".to_string(), Column::Int64(vec![Some(7), Some(9)]))]).unwrap();
        stage.extend(&new_col, Axis::Column).unwrap();

        let payload = build_delta(&stage);
        let axis = payload.axis.unwrap();
        assert_eq!(axis.drop_rows, vec![1]);
        let extend = payload.extend.unwrap();
        assert!(extend.cols.is_some());
        assert!(extend.rows.is_none());
    }

    // ── 3. minimality: a put touching one cell emits exactly that cell ──
    #[test]
    fn put_block_is_minimal() {
        let mut stage = Stage::new(sample());
        let patch = Table::new(
            vec![0, 1, 2],
            vec![
                ("a".to_string(), Column::Int64(vec![Some(1), Some(50), Some(3)])),
                ("b".to_string(), Column::Int64(vec![Some(4), Some(5), Some(6)])),
            ],
        )
        .unwrap();
        stage.put(&patch).unwrap();

        let payload = build_delta(&stage);
        let put = payload.put.unwrap();
        assert_eq!(put.values.index(), &[1]);
        assert_eq!(put.values.column_labels(), vec!["a"]);
    }

    // ── 4. an empty log compiles to an empty payload ──
    #[test]
    fn empty_log_compiles_to_empty_payload() {
        let stage = Stage::new(sample());
        let payload = build_delta(&stage);
        assert!(payload.is_empty());
    }

    // ── 5. relabel-only commit emits only an axis block ──
    #[test]
    fn relabel_only_emits_axis_block() {
        let mut stage = Stage::new(sample());
        stage.relabel(&AxisLabels::Rows(vec![10, 11, 12]), Axis::Row).unwrap();
        let payload = build_delta(&stage);
        assert!(payload.put.is_none());
        assert!(payload.extend.is_none());
        let axis = payload.axis.unwrap();
        assert_eq!(axis.relabel_rows, vec![10, 11, 12]);
    }

    // ── 6. drop-then-extend and extend-then-drop compile to the same payload ──
    #[test]
    fn drop_extend_commutation_emits_identical_payload() {
        let new_row =
            Table::new(vec![3], vec![("a".to_string(), Column::Int64(vec![Some(7)])), ("b".to_string(), Column::Int64(vec![Some(8)]))])
                .unwrap();

        let mut a = Stage::new(sample());
        a.drop(&AxisLabels::Rows(vec![1]), Axis::Row, DropMethod::Intersection).unwrap();
        a.extend(&new_row, Axis::Row).unwrap();

        let mut b = Stage::new(sample());
        b.extend(&new_row, Axis::Row).unwrap();
        b.drop(&AxisLabels::Rows(vec![1]), Axis::Row, DropMethod::Intersection).unwrap();

        assert_eq!(build_delta(&a), build_delta(&b));
    }

    // ── 7. a drop landing on a row relabeled earlier in the same commit
    // trims the relabel record at the same position, keeping the axis
    // block internally consistent ──
    #[test]
    fn drop_after_relabel_trims_relabel_record() {
        let mut stage = Stage::new(sample());
        stage.relabel(&AxisLabels::Rows(vec![10, 11, 12]), Axis::Row).unwrap();
        stage.drop(&AxisLabels::Rows(vec![11]), Axis::Row, DropMethod::Intersection).unwrap();

        let payload = build_delta(&stage);
        let axis = payload.axis.unwrap();
        assert_eq!(axis.drop_rows, vec![1]);
        assert_eq!(axis.relabel_rows, vec![10, 12]);

        let resolved = axis.apply(sample());
        assert_eq!(resolved.index(), &[10, 12]);
    }

    // ── 8. extending both columns and rows in one commit produces a row
    // block that carries the newly added column too, so applying column
    // extension before row extension doesn't hit a shape mismatch ──
    #[test]
    fn extend_cols_then_rows_row_block_carries_new_column() {
        let mut stage = Stage::new(sample());
        let new_col = Table::new(vec![0, 1, 2], vec![("c".to_string(), Column::Int64(vec![Some(7), Some(8), Some(9)]))]).unwrap();
        stage.extend(&new_col, Axis::Column).unwrap();
        let new_row = Table::new(
            vec![3],
            vec![
                ("a".to_string(), Column::Int64(vec![Some(1)])),
                ("b".to_string(), Column::Int64(vec![Some(2)])),
                ("c".to_string(), Column::Int64(vec![Some(3)])),
            ],
        )
        .unwrap();
        stage.extend(&new_row, Axis::Row).unwrap();

        let payload = build_delta(&stage);
        let extend = payload.extend.clone().unwrap();
        let rows = extend.rows.clone().unwrap();
        assert_eq!(rows.column_labels(), vec!["a", "b", "c"]);

        let resolved = extend.apply(sample()).unwrap();
        assert_eq!(resolved.shape(Axis::Row), 4);
        assert_eq!(resolved.shape(Axis::Column), 3);
        assert_eq!(resolved.get(3, "c"), Some(Cell::Int64(3)));
    }
}

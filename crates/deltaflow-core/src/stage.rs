// SPDX-License-Identifier: Apache-2.0
//! The in-memory `(base, live, log)` triple owned by a loaded arrow.
//!
//! `base` is the resolved head table and is never mutated by staging
//! operations. `live` is `base` with every operation in `log` applied in
//! order. `log` is an ordered list of [`Layer`]s; each layer is a
//! non-empty, atomically-applied group of [`Operation`]s produced by one
//! public mutator call.

use deltaflow_format::Table;

use crate::error::CoreError;
use crate::operation::Operation;

/// An atomic group of operations produced by a single mutator call.
///
/// A layer is never empty once pushed onto a [`Stage`]'s log — an
/// extension that introduces both new rows and new columns pushes both
/// operations into one layer, so a single `undo` reverses both together.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layer {
    ops: Vec<Operation>,
}

impl Layer {
    /// Start an empty layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute `op` against `table`, returning the new table, and record
    /// the operation in this layer.
    pub fn push(&mut self, table: Table, op: Operation) -> Result<Table, CoreError> {
        let table = op.execute(table)?;
        self.ops.push(op);
        Ok(table)
    }

    /// Whether this layer has no recorded operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The operations recorded in this layer, in append order.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }
}

/// The staging surface over a loaded arrow's head table.
#[derive(Clone, Debug)]
pub struct Stage {
    base: Table,
    live: Table,
    log: Vec<Layer>,
}

impl Stage {
    /// Start a new stage from a resolved head table. `live` starts equal
    /// to `base`.
    #[must_use]
    pub fn new(base: Table) -> Self {
        let live = base.clone();
        Self { base, live, log: Vec::new() }
    }

    /// The resolved head table. Never mutated by staging operations.
    #[must_use]
    pub const fn base(&self) -> &Table {
        &self.base
    }

    /// `base` with every operation in `log` applied, in order.
    #[must_use]
    pub const fn live(&self) -> &Table {
        &self.live
    }

    /// The ordered layer log.
    #[must_use]
    pub fn log(&self) -> &[Layer] {
        &self.log
    }

    /// Every operation across every layer, in append order.
    pub fn iter_operations(&self) -> impl Iterator<Item = &Operation> {
        self.log.iter().flat_map(|layer| layer.ops.iter())
    }

    /// Append a completed layer and its resulting live table.
    ///
    /// Callers build the layer by repeatedly calling [`Layer::push`]
    /// starting from `self.live().clone()`, then hand both the finished
    /// layer and the final table to this method.
    pub fn commit_layer(&mut self, layer: Layer, new_live: Table) {
        debug_assert!(!layer.is_empty(), "a layer must carry at least one operation");
        self.live = new_live;
        self.log.push(layer);
    }

    /// Pop the last layer and re-derive `live` by undoing its operations
    /// in reverse order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Undo`] if the log is empty.
    pub fn revert(&mut self) -> Result<(), CoreError> {
        let layer = self.log.pop().ok_or(CoreError::Undo)?;
        let mut table = self.live.clone();
        for op in layer.ops.iter().rev() {
            table = op.undo(table)?;
        }
        self.live = table;
        Ok(())
    }

    /// Clear the log after a successful commit; `base` becomes the new
    /// head's table (callers pass the materialized `live` as the new
    /// `base`).
    pub fn reset(&mut self, new_base: Table) {
        self.base = new_base.clone();
        self.live = new_base;
        self.log.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operation::AxisLabels;
    use deltaflow_format::{Axis, Column};

    fn sample() -> Table {
        Table::new(vec![0, 1], vec![("a".to_string(), Column::Int64(vec![Some(1), Some(2)]))]).unwrap()
    }

    // ── 1. a fresh stage has live == base and an empty log ──
    #[test]
    fn fresh_stage_live_equals_base() {
        let stage = Stage::new(sample());
        assert_eq!(stage.live(), stage.base());
        assert!(stage.log().is_empty());
    }

    // ── 2. pushing a layer advances live and extends the log ──
    #[test]
    fn commit_layer_advances_live() {
        let mut stage = Stage::new(sample());
        let mut layer = Layer::new();
        let op = Operation::Relabel {
            x: AxisLabels::Rows(vec![0, 1]),
            y: AxisLabels::Rows(vec![10, 11]),
            axis: Axis::Row,
        };
        let new_live = layer.push(stage.live().clone(), op).unwrap();
        stage.commit_layer(layer, new_live);

        assert_eq!(stage.live().index(), &[10, 11]);
        assert_eq!(stage.base().index(), &[0, 1]);
        assert_eq!(stage.log().len(), 1);
    }

    // ── 3. revert undoes the last layer and restores live ──
    #[test]
    fn revert_restores_live() {
        let mut stage = Stage::new(sample());
        let mut layer = Layer::new();
        let op = Operation::Relabel {
            x: AxisLabels::Rows(vec![0, 1]),
            y: AxisLabels::Rows(vec![10, 11]),
            axis: Axis::Row,
        };
        let new_live = layer.push(stage.live().clone(), op).unwrap();
        stage.commit_layer(layer, new_live);

        stage.revert().unwrap();
        assert_eq!(stage.live(), stage.base());
        assert!(stage.log().is_empty());
    }

    // ── 4. revert on an empty log raises UndoError ──
    #[test]
    fn revert_on_empty_log_errors() {
        let mut stage = Stage::new(sample());
        let result = stage.revert();
        assert!(matches!(result, Err(CoreError::Undo)));
    }
}

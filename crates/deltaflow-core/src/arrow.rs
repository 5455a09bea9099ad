// SPDX-License-Identifier: Apache-2.0
//! The named mutable cursor over a [`Tree`]: owns a [`Stage`] loaded from
//! its head node, and is the only thing that ever advances an arrow's head
//! or grows/shrinks its staging log.

use deltaflow_format::{Axis, Table};
use tracing::{debug, instrument, warn};

use crate::engine::build_delta;
use crate::error::CoreError;
use crate::fs;
use crate::hashing::hash_table;
use crate::mutate::DropMethod;
use crate::node::{delta_node_id, NodeHeader};
use crate::operation::AxisLabels;
use crate::stage::Stage;
use crate::tree::Tree;

/// A named mutable pointer into a [`Tree`], carrying the [`Stage`] loaded
/// from its current head.
#[derive(Debug)]
pub struct Arrow {
    tree: Tree,
    name: String,
    head_id: String,
    head_header: NodeHeader,
    stage: Stage,
}

impl Arrow {
    /// Load the arrow named `name` from `tree`: resolve its head node to a
    /// table (verifying every intermediate hash along the way) and start a
    /// fresh [`Stage`] over it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NameLookup`] if no arrow with this name exists,
    /// or [`CoreError::Integrity`] if reconstruction fails a hash check.
    #[instrument(skip(tree), fields(arrow = %name))]
    pub fn load(tree: Tree, name: &str) -> Result<Self, CoreError> {
        let head_id = tree.arrow_head(name)?;
        let head_header = tree.node(&head_id)?;
        let base = tree.resolve(&head_id)?;
        Ok(Self { tree, name: name.to_string(), head_id, head_header, stage: Stage::new(base) })
    }

    /// This arrow's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node id this arrow currently points at.
    #[must_use]
    pub fn head(&self) -> &str {
        &self.head_id
    }

    /// A snapshot of the staged live table.
    #[must_use]
    pub fn proxy(&self) -> Table {
        self.stage.live().clone()
    }

    /// Overwrite cells of the staged table with `data`'s non-null values at
    /// the intersection of their labels. A no-op if there is no net change.
    ///
    /// # Errors
    ///
    /// See [`Stage::put`].
    pub fn put(&mut self, data: &Table) -> Result<(), CoreError> {
        self.stage.put(data)
    }

    /// Remove labels from `axis`.
    ///
    /// # Errors
    ///
    /// See [`Stage::drop`].
    pub fn drop(&mut self, index: &AxisLabels, axis: Axis, method: DropMethod) -> Result<(), CoreError> {
        self.stage.drop(index, axis, method)
    }

    /// Append rows or columns to the staged table.
    ///
    /// # Errors
    ///
    /// See [`Stage::extend`].
    pub fn extend(&mut self, data: &Table, axis: Axis) -> Result<(), CoreError> {
        self.stage.extend(data, axis)
    }

    /// Replace `axis`'s labels element-wise.
    ///
    /// # Errors
    ///
    /// See [`Stage::relabel`].
    pub fn relabel(&mut self, new_labels: &AxisLabels, axis: Axis) -> Result<(), CoreError> {
        self.stage.relabel(new_labels, axis)
    }

    /// Pop the most recent layer, restoring the staged table to its state
    /// before that mutator call.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Undo`] if the staging log is empty.
    pub fn undo(&mut self) -> Result<(), CoreError> {
        self.stage.revert()
    }

    /// Compile the staging log into a minimal delta, persist the delta
    /// file and the new node header, advance this arrow's head, and clear
    /// the log.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Put`] if the log compiles to an empty delta
    /// (nothing was ever staged, or every staged change canceled out) —
    /// per `spec.md` §8 property 3, a no-op commit is rejected rather than
    /// silently advancing the head to an identical node.
    #[instrument(skip(self), fields(arrow = %self.name))]
    pub fn commit(&mut self) -> Result<String, CoreError> {
        let payload = build_delta(&self.stage);
        if payload.is_empty() {
            warn!("commit with no staged changes");
            return Err(CoreError::Put);
        }

        let lineage = match &self.head_header.lineage {
            Some(parent_lineage) => {
                let mut lineage = vec![self.head_id.clone()];
                lineage.extend(parent_lineage.iter().cloned());
                lineage
            }
            None => vec![self.head_id.clone()],
        };

        let new_header = NodeHeader::delta(self.head_header.origin.clone(), lineage);
        let header_hash = new_header.header_hash()?;
        let data_hash = hash_table(self.stage.live());
        let new_id = delta_node_id(header_hash, data_hash);
        let new_id_str = new_id.to_string();

        let delta_bytes = deltaflow_format::write_delta(&payload)?;
        let header_bytes = new_header.canonical_bytes()?;

        // Write order matters only for crash recovery (`spec.md` §4.6):
        // an orphaned node/delta pair from a crash before the arrow write
        // is harmless, while a crash after would leave the arrow pointing
        // past a node whose delta never made it to disk.
        fs::write_node_bytes(self.tree.path(), &new_id_str, &header_bytes)?;
        fs::write_delta_bytes(self.tree.path(), &new_id_str, &delta_bytes)?;
        fs::write_arrow(self.tree.path(), &self.name, &new_id_str)?;

        debug!(new_head = %new_id_str, "arrow advanced");

        self.stage.reset(self.stage.live().clone());
        self.head_id = new_id_str.clone();
        self.head_header = new_header;

        Ok(new_id_str)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::field::Field;
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

    fn load_arrow(dir: &std::path::Path, name: &str) -> Arrow {
        let tree = Tree::new(dir);
        Arrow::load(tree, name).unwrap()
    }

    // ── 1. committing a put advances the head to a new id ──
    #[test]
    fn commit_advances_head() {
        let dir = tempfile::tempdir().unwrap();
        let field = Field::touch(dir.path()).unwrap();
        field.add_origin(&sample(), "o").unwrap();
        let origin_head = field.tree().arrow_head(".o").unwrap();

        let mut arrow = load_arrow(dir.path(), ".o");
        let patch = Table::new(vec![0], vec![("a".to_string(), Column::Int64(vec![Some(10)]))]).unwrap();
        arrow.put(&patch).unwrap();
        let new_id = arrow.commit().unwrap();

        assert_ne!(new_id, origin_head);
        assert_eq!(field.tree().arrow_head(".o").unwrap(), new_id);
    }

    // ── 2. resolving the new head reflects the committed put ──
    #[test]
    fn resolve_after_commit_reflects_put() {
        let dir = tempfile::tempdir().unwrap();
        let field = Field::touch(dir.path()).unwrap();
        field.add_origin(&sample(), "o").unwrap();

        let mut arrow = load_arrow(dir.path(), ".o");
        let patch = Table::new(vec![0], vec![("a".to_string(), Column::Int64(vec![Some(10)]))]).unwrap();
        arrow.put(&patch).unwrap();
        arrow.commit().unwrap();

        let resolved = field.tree().resolve(&field.tree().arrow_head(".o").unwrap()).unwrap();
        assert_eq!(resolved.get(0, "a"), Some(Cell::Int64(10)));
    }

    // ── 3. committing an empty log raises PutError ──
    #[test]
    fn commit_with_nothing_staged_errors() {
        let dir = tempfile::tempdir().unwrap();
        let field = Field::touch(dir.path()).unwrap();
        field.add_origin(&sample(), "o").unwrap();

        let mut arrow = load_arrow(dir.path(), ".o");
        let result = arrow.commit();
        assert!(matches!(result, Err(CoreError::Put)));
    }

    // ── 4. a chained second commit carries the first in its lineage ──
    #[test]
    fn second_commit_chains_lineage() {
        let dir = tempfile::tempdir().unwrap();
        let field = Field::touch(dir.path()).unwrap();
        field.add_origin(&sample(), "o").unwrap();

        let mut arrow = load_arrow(dir.path(), ".o");
        let patch1 = Table::new(vec![0], vec![("a".to_string(), Column::Int64(vec![Some(10)]))]).unwrap();
        arrow.put(&patch1).unwrap();
        let id1 = arrow.commit().unwrap();

        arrow.drop(&AxisLabels::Rows(vec![1]), Axis::Row, DropMethod::Intersection).unwrap();
        let id2 = arrow.commit().unwrap();

        let header2 = field.tree().node(&id2).unwrap();
        assert_eq!(header2.lineage.as_ref().unwrap()[0], id1);
    }

    // ── 5. undo before commit restores the staged table exactly ──
    #[test]
    fn undo_restores_pre_mutation_state() {
        let dir = tempfile::tempdir().unwrap();
        let field = Field::touch(dir.path()).unwrap();
        field.add_origin(&sample(), "o").unwrap();

        let mut arrow = load_arrow(dir.path(), ".o");
        let before = arrow.proxy();
        let patch = Table::new(vec![0], vec![("a".to_string(), Column::Int64(vec![Some(10)]))]).unwrap();
        arrow.put(&patch).unwrap();
        arrow.undo().unwrap();
        assert_eq!(arrow.proxy(), before);
        assert!(matches!(arrow.undo(), Err(CoreError::Undo)));
    }
}

// SPDX-License-Identifier: Apache-2.0
//! `Field`: the top-level entry point. Wraps a validated field directory
//! path and a [`Tree`] handle; owns the two mutations that don't belong to
//! any one arrow (`add_origin`, `add_arrow`).

use std::path::{Path, PathBuf};

use deltaflow_format::Table;
use serde_json::Value;
use tracing::{info, instrument};

use crate::arrow::Arrow;
use crate::error::CoreError;
use crate::fs;
use crate::hashing::hash_table;
use crate::node::{origin_node_id, NodeHeader};
use crate::origin;
use crate::tree::Tree;

/// Initialize a field directory at `path`, creating every structural path
/// this store expects. Idempotent.
///
/// # Errors
///
/// Returns [`CoreError::Io`] on a filesystem failure.
pub fn touch(path: &Path) -> Result<(), CoreError> {
    fs::touch(path)
}

/// The top-level entry point into a field: a validated directory path plus
/// a [`Tree`] handle over it.
#[derive(Debug)]
pub struct Field {
    path: PathBuf,
    tree: Tree,
}

impl Field {
    /// Open an already-initialized field at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FieldPath`] if `path` is not an initialized
    /// field directory.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        if !fs::is_field(&path) {
            return Err(CoreError::FieldPath(path.display().to_string()));
        }
        let tree = Tree::new(path.clone());
        Ok(Self { path, tree })
    }

    /// Initialize a field directory at `path` and open it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] on a filesystem failure.
    pub fn touch(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        fs::touch(&path)?;
        Self::new(path)
    }

    /// The field's root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A read-only handle over this field's origins, nodes, and arrows.
    #[must_use]
    pub fn tree(&self) -> Tree {
        self.tree.clone()
    }

    /// Load the arrow named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NameLookup`] if no arrow with this name exists,
    /// or [`CoreError::Integrity`] if reconstructing its head table fails a
    /// hash check.
    pub fn arrow(&self, name: &str) -> Result<Arrow, CoreError> {
        Arrow::load(self.tree(), name)
    }

    /// Register `table` as a new origin named `name`, and create its
    /// auto-arrow `.{name}` pointing at the new origin node.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NameExists`] if `name` is already registered,
    /// or [`CoreError::Information`] if an origin with identical content
    /// already exists under a different name.
    #[instrument(skip(self, table), fields(origin = %name))]
    pub fn add_origin(&self, table: &Table, name: &str) -> Result<String, CoreError> {
        let origin_hash = hash_table(table);
        let header = NodeHeader::origin(origin_hash);
        let node_id = origin_node_id(header.header_hash()?);
        let node_id_str = node_id.to_string();

        let mut origins = self.tree.origins()?;
        if origins.contains_key(name) {
            return Err(CoreError::NameExists { kind: "origin", name: name.to_string() });
        }
        if let Some((existing_name, _)) = origins.iter().find(|(_, v)| v.as_str() == Some(node_id_str.as_str())) {
            return Err(CoreError::Information { kind: "origin", id: existing_name.clone() });
        }

        origin::write_origin(&self.path, name, table)?;
        fs::write_node_bytes(&self.path, &node_id_str, &header.canonical_bytes()?)?;

        origins.insert(name.to_string(), Value::String(node_id_str.clone()));
        fs::write_origins(&self.path, &origins)?;

        fs::write_arrow(&self.path, &format!(".{name}"), &node_id_str)?;
        info!(node = %node_id_str, "origin registered");

        Ok(node_id_str)
    }

    /// Create a new named arrow pointing at an existing node.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReservedName`] if `name` starts with `.`,
    /// [`CoreError::NameExists`] if an arrow with this name already
    /// exists, or [`CoreError::IdLookup`] if `node_id` does not exist.
    pub fn add_arrow(&self, node_id: &str, name: &str) -> Result<(), CoreError> {
        if name.starts_with('.') {
            return Err(CoreError::ReservedName(name.to_string()));
        }
        if fs::arrow_exists(&self.path, name) {
            return Err(CoreError::NameExists { kind: "arrow", name: name.to_string() });
        }
        if !self.tree.nodes()?.iter().any(|id| id == node_id) {
            return Err(CoreError::IdLookup(node_id.to_string()));
        }
        fs::write_arrow(&self.path, name, node_id)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use deltaflow_format::Column;

    fn sample() -> Table {
        Table::new(vec![0, 1, 2], vec![("a".to_string(), Column::Int64(vec![Some(1), Some(2), Some(3)]))]).unwrap()
    }

    // ── 1. add_origin registers the origin and its auto-arrow ──
    #[test]
    fn add_origin_registers_auto_arrow() {
        let dir = tempfile::tempdir().unwrap();
        let field = Field::touch(dir.path()).unwrap();
        let node_id = field.add_origin(&sample(), "o").unwrap();

        assert_eq!(field.tree().origins().unwrap().get("o").and_then(Value::as_str), Some(node_id.as_str()));
        assert_eq!(field.tree().arrow_head(".o").unwrap(), node_id);

        let proxy = field.arrow(".o").unwrap().proxy();
        assert_eq!(proxy, sample());
    }

    // ── 2. add_origin with an existing name errors ──
    #[test]
    fn add_origin_duplicate_name_errors() {
        let dir = tempfile::tempdir().unwrap();
        let field = Field::touch(dir.path()).unwrap();
        field.add_origin(&sample(), "o").unwrap();
        let result = field.add_origin(&sample(), "o");
        assert!(matches!(result, Err(CoreError::NameExists { kind: "origin", .. })));
    }

    // ── 3. add_origin with identical content under a new name errors ──
    #[test]
    fn add_origin_duplicate_content_errors() {
        let dir = tempfile::tempdir().unwrap();
        let field = Field::touch(dir.path()).unwrap();
        field.add_origin(&sample(), "o").unwrap();
        let result = field.add_origin(&sample(), "o2");
        assert!(matches!(result, Err(CoreError::Information { kind: "origin", .. })));
    }

    // ── 4. add_arrow rejects a reserved '.'-prefixed name ──
    #[test]
    fn add_arrow_rejects_reserved_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let field = Field::touch(dir.path()).unwrap();
        let node_id = field.add_origin(&sample(), "o").unwrap();
        let result = field.add_arrow(&node_id, ".custom");
        assert!(matches!(result, Err(CoreError::ReservedName(_))));
    }

    // ── 5. add_arrow points a new name at an existing node ──
    #[test]
    fn add_arrow_points_at_existing_node() {
        let dir = tempfile::tempdir().unwrap();
        let field = Field::touch(dir.path()).unwrap();
        let node_id = field.add_origin(&sample(), "o").unwrap();
        field.add_arrow(&node_id, "custom").unwrap();
        assert_eq!(field.tree().arrow_head("custom").unwrap(), node_id);
    }

    // ── 6. opening a non-field directory errors ──
    #[test]
    fn new_on_non_field_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = Field::new(dir.path());
        assert!(matches!(result, Err(CoreError::FieldPath(_))));
    }
}

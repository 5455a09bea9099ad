// SPDX-License-Identifier: Apache-2.0
//! On-disk layout for a field directory.
//!
//! ```text
//! <field>/
//!   .deltaflow/
//!     origins                # JSON { origin_name: node_id }
//!     arrows/<name>           # text file, single line = node_id
//!     nodes/<node_id>         # UTF-8 JSON header (ordered keys)
//!     deltas/<node_id>.delta  # binary container
//!   <origin_name>.origin      # columnar table file (origin data)
//! ```
//!
//! Every function here does exactly one filesystem operation and maps its
//! failure to the narrowest [`CoreError`] that fits; higher layers
//! ([`crate::tree`], [`crate::arrow`], [`crate::field`]) compose these into
//! the public surface.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::CoreError;

const META_DIR: &str = ".deltaflow";

fn meta_dir(field: &Path) -> PathBuf {
    field.join(META_DIR)
}

fn arrows_dir(field: &Path) -> PathBuf {
    meta_dir(field).join("arrows")
}

fn nodes_dir(field: &Path) -> PathBuf {
    meta_dir(field).join("nodes")
}

fn deltas_dir(field: &Path) -> PathBuf {
    meta_dir(field).join("deltas")
}

fn origins_path(field: &Path) -> PathBuf {
    meta_dir(field).join("origins")
}

/// Whether `field` already looks like an initialized field directory.
#[must_use]
pub fn is_field(field: &Path) -> bool {
    origins_path(field).is_file() && arrows_dir(field).is_dir()
}

/// Initialize a field directory, creating every structural path this store
/// expects. Idempotent — calling it on an already-initialized field leaves
/// existing content untouched.
///
/// # Errors
///
/// Returns [`CoreError::Io`] on a filesystem failure.
pub fn touch(field: &Path) -> Result<(), CoreError> {
    fs::create_dir_all(arrows_dir(field))?;
    fs::create_dir_all(nodes_dir(field))?;
    fs::create_dir_all(deltas_dir(field))?;
    let origins = origins_path(field);
    if !origins.exists() {
        fs::write(&origins, "{}")?;
    }
    Ok(())
}

/// Read the `name -> node_id` origins index.
///
/// # Errors
///
/// Returns [`CoreError::Io`] if the file can't be read, or
/// [`CoreError::Json`] if it isn't valid JSON.
pub fn read_origins(field: &Path) -> Result<Map<String, Value>, CoreError> {
    let bytes = fs::read(origins_path(field))?;
    let value: Value = serde_json::from_slice(&bytes)?;
    Ok(match value {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

/// Overwrite the origins index.
///
/// # Errors
///
/// Returns [`CoreError::Io`] on a filesystem failure, or
/// [`CoreError::Json`] if serialization fails.
pub fn write_origins(field: &Path, origins: &Map<String, Value>) -> Result<(), CoreError> {
    let bytes = serde_json::to_vec_pretty(origins)?;
    fs::write(origins_path(field), bytes)?;
    Ok(())
}

/// Read an arrow's head node id.
///
/// # Errors
///
/// Returns [`CoreError::NameLookup`] if the arrow file does not exist or
/// cannot be read.
pub fn read_arrow(field: &Path, name: &str) -> Result<String, CoreError> {
    fs::read_to_string(arrows_dir(field).join(name))
        .map(|s| s.trim().to_string())
        .map_err(|_| CoreError::NameLookup { kind: "arrow", name: name.to_string() })
}

/// Whether an arrow file already exists.
#[must_use]
pub fn arrow_exists(field: &Path, name: &str) -> bool {
    arrows_dir(field).join(name).exists()
}

/// Overwrite (or create) an arrow's head pointer.
///
/// # Errors
///
/// Returns [`CoreError::Io`] on a filesystem failure.
pub fn write_arrow(field: &Path, name: &str, node_id: &str) -> Result<(), CoreError> {
    fs::write(arrows_dir(field).join(name), node_id)?;
    Ok(())
}

/// Every arrow name currently registered, in directory-listing order.
///
/// # Errors
///
/// Returns [`CoreError::Io`] on a read failure.
pub fn list_arrow_names(field: &Path) -> Result<Vec<String>, CoreError> {
    let mut out = Vec::new();
    for entry in fs::read_dir(arrows_dir(field))? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            out.push(name.to_string());
        }
    }
    Ok(out)
}

/// Read a node header's raw JSON bytes, exactly as persisted.
///
/// # Errors
///
/// Returns [`CoreError::IdLookup`] if no node with this id exists on disk.
pub fn read_node_bytes(field: &Path, node_id: &str) -> Result<Vec<u8>, CoreError> {
    fs::read(nodes_dir(field).join(node_id)).map_err(|_| CoreError::IdLookup(node_id.to_string()))
}

/// Write a node header's raw JSON bytes. Node files are write-once, named
/// by content hash; writing an already-existing id is a harmless
/// no-op overwrite.
///
/// # Errors
///
/// Returns [`CoreError::Io`] on a filesystem failure.
pub fn write_node_bytes(field: &Path, node_id: &str, bytes: &[u8]) -> Result<(), CoreError> {
    fs::write(nodes_dir(field).join(node_id), bytes)?;
    Ok(())
}

/// Every node id currently on disk, in directory-listing order.
///
/// # Errors
///
/// Returns [`CoreError::Io`] on a read failure.
pub fn list_node_ids(field: &Path) -> Result<Vec<String>, CoreError> {
    let mut out = Vec::new();
    for entry in fs::read_dir(nodes_dir(field))? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            out.push(name.to_string());
        }
    }
    Ok(out)
}

/// Read a delta node's raw container bytes.
///
/// # Errors
///
/// Returns [`CoreError::IdLookup`] if no delta file with this id exists.
pub fn read_delta_bytes(field: &Path, node_id: &str) -> Result<Vec<u8>, CoreError> {
    fs::read(deltas_dir(field).join(format!("{node_id}.delta")))
        .map_err(|_| CoreError::IdLookup(node_id.to_string()))
}

/// Write a delta node's raw container bytes.
///
/// # Errors
///
/// Returns [`CoreError::Io`] on a filesystem failure.
pub fn write_delta_bytes(field: &Path, node_id: &str, bytes: &[u8]) -> Result<(), CoreError> {
    fs::write(deltas_dir(field).join(format!("{node_id}.delta")), bytes)?;
    Ok(())
}

/// The path an origin table file is stored at.
#[must_use]
pub fn origin_table_path(field: &Path, name: &str) -> PathBuf {
    field.join(format!("{name}.origin"))
}

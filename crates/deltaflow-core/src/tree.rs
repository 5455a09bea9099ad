// SPDX-License-Identifier: Apache-2.0
//! The `Tree`: read-only queries over a field's origins, nodes, and arrows,
//! plus lineage/outline computation and full-chain reconstruction.
//!
//! `Tree` holds no cache and no mutable state of its own — every query
//! re-reads the relevant file(s) under the field path. This mirrors
//! `original_source/deltaflow/tree.py`'s `Tree`, whose `origins`/`arrows`/
//! `nodes` are properties that re-read from disk on every access rather
//! than memoized fields, so a `Tree` handle never goes stale across a
//! concurrent writer in the same process.

use std::path::{Path, PathBuf};

use deltaflow_format::Table;
use deltaflow_hash::{HeaderHash, NodeId};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::fs;
use crate::hashing::hash_table;
use crate::node::NodeHeader;
use crate::origin;

/// Read-only handle over a field's origins, nodes, and arrows.
#[derive(Clone, Debug)]
pub struct Tree {
    path: PathBuf,
}

impl Tree {
    /// Open a tree rooted at `path`. Does not validate that `path` is an
    /// initialized field; callers that need that guarantee use
    /// [`crate::field::Field::new`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The field root this tree is rooted at.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The `name -> node_id` origins index.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`]/[`CoreError::Json`] if the index file
    /// can't be read or parsed.
    pub fn origins(&self) -> Result<Map<String, Value>, CoreError> {
        fs::read_origins(&self.path)
    }

    /// Every arrow name currently registered.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] on a read failure.
    pub fn arrows(&self) -> Result<Vec<String>, CoreError> {
        fs::list_arrow_names(&self.path)
    }

    /// Every node id currently on disk.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] on a read failure.
    pub fn nodes(&self) -> Result<Vec<String>, CoreError> {
        fs::list_node_ids(&self.path)
    }

    /// Load and parse a node header by id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IdLookup`] if no node with this id exists, or
    /// [`CoreError::Json`] if the header fails to parse.
    pub fn node(&self, node_id: &str) -> Result<NodeHeader, CoreError> {
        let bytes = fs::read_node_bytes(&self.path, node_id)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// An arrow's current head node id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NameLookup`] if no arrow with this name exists.
    pub fn arrow_head(&self, name: &str) -> Result<String, CoreError> {
        fs::read_arrow(&self.path, name)
    }

    /// The origin name whose origin node id is `origin_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IdLookup`] if no origin with this id is
    /// registered.
    pub fn name_origin(&self, origin_id: &str) -> Result<String, CoreError> {
        let origins = self.origins()?;
        origins
            .iter()
            .find(|(_, v)| v.as_str() == Some(origin_id))
            .map(|(k, _)| k.clone())
            .ok_or_else(|| CoreError::IdLookup(origin_id.to_string()))
    }

    /// The ordered `node_id -> header_hash` mapping from origin to `head`,
    /// origin first.
    ///
    /// Header hashes are always recomputed by re-reading each header file
    /// from disk — a delta node's own `lineage` field is never trusted as
    /// the source of those hashes, since it names parent ids, not their
    /// hashes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IdLookup`] if any node in the chain is
    /// missing, or [`CoreError::Json`] if a header fails to parse.
    pub fn outline(&self, head_id: &str) -> Result<Vec<(String, HeaderHash)>, CoreError> {
        let head = self.node(head_id)?;
        let chain: Vec<String> = match &head.lineage {
            None => vec![head_id.to_string()],
            Some(lineage) => {
                let mut ids = vec![head_id.to_string()];
                ids.extend(lineage.iter().cloned());
                ids.into_iter().rev().collect()
            }
        };

        let mut out = Vec::with_capacity(chain.len());
        for id in chain {
            let header = self.node(&id)?;
            let hash = header.header_hash()?;
            out.push((id, hash));
        }
        Ok(out)
    }

    /// Reconstruct the table materialized at `node_id`: load the origin,
    /// fold every delta in the outline in order, and verify every
    /// intermediate node's hash binding as it goes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Integrity`] if the origin's content hash or any
    /// delta node's `hash_pair(header_hash, data_hash)` disagrees with its
    /// stored id.
    pub fn resolve(&self, node_id: &str) -> Result<Table, CoreError> {
        let outline = self.outline(node_id)?;
        let (origin_node_id, _) = &outline[0];
        let origin_header = self.node(origin_node_id)?;
        let origin_name = self.name_origin(origin_node_id)?;

        let mut table = origin::read_origin(&self.path, &origin_name)?;
        if hash_table(&table).to_string() != origin_header.origin {
            return Err(CoreError::Integrity { node: origin_node_id.clone(), kind: "origin" });
        }

        for (id, header_hash) in &outline[1..] {
            let bytes = fs::read_delta_bytes(&self.path, id)?;
            let payload = deltaflow_format::read_delta(&bytes)?;
            table = payload.apply(table)?;

            let data_hash = hash_table(&table);
            let expected: NodeId = id.parse().map_err(|_| CoreError::Integrity { node: id.clone(), kind: "data" })?;
            if deltaflow_hash::hash_pair(*header_hash, data_hash) != expected {
                return Err(CoreError::Integrity { node: id.clone(), kind: "data" });
            }
        }

        Ok(table)
    }
}

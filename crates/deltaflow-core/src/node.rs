// SPDX-License-Identifier: Apache-2.0
//! Node headers: the two kinds of content-addressed identity this store
//! persists, and the canonical JSON bytes a node's hash is computed over.
//!
//! The field order declared on [`NodeHeader`] — `type`, `origin`, `lineage`
//! — is load-bearing: it is exactly the byte sequence [`hash_header`]
//! consumes, and `serde_json`'s struct serialization always emits fields in
//! declaration order regardless of the `preserve_order` feature (which only
//! affects untyped `Value`/`Map` serialization).

use deltaflow_hash::{hash_header, hash_pair, HeaderHash, NodeId, TableHash};
use serde::{Deserialize, Serialize};

/// Which kind of node a header describes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// An immutable baseline snapshot.
    Origin,
    /// A committed edit against a parent node.
    Delta,
}

/// A node header: either an origin's single-entry root, or a delta's
/// `{type, origin, lineage}` triple binding it to its origin table hash and
/// its full parent chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeHeader {
    /// Which kind of node this is.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Hex digest of the origin table's content hash — the same value for
    /// every node descended from one origin.
    pub origin: String,
    /// `[parent_id, ..., origin_id]`, oldest last. `None` for origin nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<Vec<String>>,
}

impl NodeHeader {
    /// Build an origin header for a table whose content hash is
    /// `origin_hash`.
    #[must_use]
    pub fn origin(origin_hash: TableHash) -> Self {
        Self { kind: NodeKind::Origin, origin: origin_hash.to_string(), lineage: None }
    }

    /// Build a delta header whose origin-table hash is `origin_hash` and
    /// whose lineage (newest parent first, origin last) is `lineage`.
    #[must_use]
    pub fn delta(origin_hash: String, lineage: Vec<String>) -> Self {
        Self { kind: NodeKind::Delta, origin: origin_hash, lineage: Some(lineage) }
    }

    /// The exact UTF-8 bytes this header hashes to and is persisted as.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialization fails (this should
    /// not happen for a well-formed header).
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// This header's content hash, computed over [`Self::canonical_bytes`].
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn header_hash(&self) -> Result<HeaderHash, serde_json::Error> {
        Ok(hash_header(&self.canonical_bytes()?))
    }
}

/// An origin node's id is its header hash directly reinterpreted as a node
/// id — origins have no table-content side to pair against, since the
/// header's `origin` field already *is* the table hash.
#[must_use]
pub fn origin_node_id(header_hash: HeaderHash) -> NodeId {
    NodeId(header_hash.0)
}

/// A delta node's id binds its header hash to the content hash of the
/// table it produces.
#[must_use]
pub fn delta_node_id(header_hash: HeaderHash, data_hash: TableHash) -> NodeId {
    hash_pair(header_hash, data_hash)
}

// SPDX-License-Identifier: Apache-2.0
//! Content hashing primitives for deltaflow node identity.
//!
//! Three pure functions sit behind the newtypes in this crate:
//! [`hash_table_from_parts`], [`hash_header`], and [`hash_pair`]. All four
//! call sites in the rest of the workspace (table hashing, header hashing,
//! pair binding, and node id derivation) go through this crate so the
//! digest algorithm only needs to change in one place.
//!
//! # Digest choice
//!
//! The reference implementation this crate reimplements used SHA-1 for all
//! four sites. This crate uses BLAKE3 instead — a 256-bit digest, faster,
//! and already the hashing primitive of choice elsewhere in this workspace's
//! dependency stack. Swapping the algorithm is safe because every producer
//! and consumer of a digest lives behind the types here; nothing outside
//! this crate ever constructs a hash from raw bytes.
//!
//! # Determinism
//!
//! Every function here is a pure mapping from bytes to bytes. None of the
//! types in this crate carry ordering or iteration behavior of their own —
//! callers are responsible for feeding bytes in a canonical order.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

use std::fmt;
use std::str::FromStr;

/// Raw 256-bit digest shared by every hash newtype in this crate.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Borrow the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// A digest failed to parse from its hex form.
#[derive(Debug, thiserror::Error)]
pub enum DigestParseError {
    /// The string was not valid hex.
    #[error("invalid hex digest: {0}")]
    Hex(#[from] hex::FromHexError),
    /// The string decoded to a byte string of the wrong length.
    #[error("digest must be 32 bytes, got {0}")]
    WrongLength(usize),
}

impl FromStr for Digest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let Ok(out): Result<[u8; 32], _> = bytes.try_into() else {
            // `bytes` was consumed by the failed conversion; recompute the
            // length from the source string's hex digit count instead.
            return Err(DigestParseError::WrongLength(s.len() / 2));
        };
        Ok(Self(out))
    }
}

macro_rules! digest_newtype {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[repr(transparent)]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub Digest);

        impl $name {
            /// Borrow the underlying digest bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 32] {
                self.0.as_bytes()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = DigestParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Digest::from_str(s)?))
            }
        }
    };
}

digest_newtype!(TableHash, "Content hash of a materialized table's columns and rows.");
digest_newtype!(HeaderHash, "Content hash of a node header's canonical JSON bytes.");
digest_newtype!(NodeId, "Content id of a node; binds a header hash to a table hash.");

/// Hash a table's content: column-label bytes followed by a per-row content
/// digest.
///
/// `column_label_bytes` must already encode the column labels in table
/// order (callers typically join labels with a separator and take the
/// UTF-8 bytes). `row_content_bytes` must encode, for every row in
/// row-index order, a deterministic digest of that row's index value and
/// cell values. The label prefix is what prevents two tables with
/// identical values but different schemas from hashing the same.
pub fn hash_table_from_parts(column_label_bytes: &[u8], row_content_bytes: &[u8]) -> TableHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(column_label_bytes);
    hasher.update(row_content_bytes);
    TableHash(Digest(*hasher.finalize().as_bytes()))
}

/// Hash a node header's canonical JSON bytes.
///
/// Callers must pass the exact bytes that are (or will be) persisted to
/// disk for this header — never a re-serialization, so that a later
/// integrity check reproduces the same hash from the same file.
pub fn hash_header(header_json_bytes: &[u8]) -> HeaderHash {
    HeaderHash(Digest::of(header_json_bytes))
}

/// Hash the concatenation of two hex digests, binding a header to a table.
///
/// This is the dual-hash that gives a delta node its id: it ties the node
/// to both its structural lineage (`a`, a header hash) and its exact
/// materialized content (`b`, a table hash).
#[must_use]
pub fn hash_pair(a: HeaderHash, b: TableHash) -> NodeId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(a.to_string().as_bytes());
    hasher.update(b.to_string().as_bytes());
    NodeId(Digest(*hasher.finalize().as_bytes()))
}

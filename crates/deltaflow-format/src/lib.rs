// SPDX-License-Identifier: Apache-2.0
//! The columnar table model, block codec, and delta file container.
//!
//! This crate owns the on-disk bytes: how a table is represented in
//! memory, how a commit's edits are reduced to typed blocks, and how those
//! blocks pack into a single self-describing delta file. It knows nothing
//! about node identity, hashing, or lineage — that glue lives in
//! `deltaflow-core`, which depends on this crate and on `deltaflow-hash`.
//!
//! # Columnar payload encoding
//!
//! Every block and the origin file serialize a [`table::Table`] through
//! `ciborium`, a self-contained binary codec that reads and writes any
//! seekable byte sink. Any library with that contract — read/write a
//! table payload to an arbitrary byte sink — fits this container's
//! partition-masking scheme; `ciborium` was chosen because it is already
//! this workspace's structured-data codec of choice.

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
    clippy::missing_errors_doc,
    clippy::similar_names
)]

pub mod block;
pub mod container;
pub mod error;
pub mod partition;
pub mod table;

pub use block::{AxisBlock, ExtensionBlock, PutBlock};
pub use container::{read_delta, write_delta, DeltaPayload};
pub use error::FormatError;
pub use table::{shrink, Axis, Cell, Column, Dtype, Table};

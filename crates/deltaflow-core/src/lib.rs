// SPDX-License-Identifier: Apache-2.0
//! Staging machine, delta engine, node store, and field API for deltaflow.
//!
//! This crate owns everything above the columnar table model and block
//! codec (`deltaflow-format`) and the content-hashing primitives
//! (`deltaflow-hash`): the operation log a user's edits accumulate into
//! (`stage`, `mutate`, `operation`), the engine that reduces that log to a
//! minimal delta (`engine`), the on-disk node/arrow/origin layout (`fs`,
//! `node`, `origin`), and the two handles a caller actually touches
//! (`tree::Tree` for read-only lineage queries, `arrow::Arrow` for staged
//! mutation, `field::Field` as the top-level entry point).
//!
//! # Layering
//!
//! ```text
//! field   — touch / add_origin / add_arrow / arrow(name)
//!   |
//! arrow   — proxy / put / drop / extend / relabel / undo / commit
//!   |
//! stage   — (base, live, log) triple; mutate.rs's public mutators push Layers
//!   |
//! engine  — compiles a Stage's log into a DeltaPayload (deltaflow-format)
//!   |
//! tree    — origins / arrows / nodes / outline / resolve (read-only)
//!   |
//! fs, node, origin — on-disk layout: where bytes live and how they're named
//! ```

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

pub mod arrow;
pub mod engine;
pub mod error;
pub mod field;
pub mod fs;
pub mod hashing;
pub mod mutate;
pub mod node;
pub mod operation;
pub mod origin;
pub mod stage;
pub mod tree;

pub use arrow::Arrow;
pub use error::CoreError;
pub use field::{touch, Field};
pub use mutate::DropMethod;
pub use node::{NodeHeader, NodeKind};
pub use operation::{AxisLabels, Operation};
pub use stage::{Layer, Stage};
pub use tree::Tree;

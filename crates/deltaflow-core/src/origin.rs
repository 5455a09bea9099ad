// SPDX-License-Identifier: Apache-2.0
//! Origin file I/O: the one place a materialized [`Table`] is persisted as
//! the immutable baseline behind an origin node.
//!
//! Origins are serialized with the same CBOR codec as every other table
//! payload in this workspace ([`Table::to_cbor`]/[`Table::from_cbor`]) —
//! the spec treats the columnar file format as a pluggable collaborator,
//! and this crate only ever needs one that reads/writes a self-contained
//! table to a seekable byte sink.

use std::fs;
use std::path::Path;

use deltaflow_format::Table;

use crate::error::CoreError;
use crate::fs::origin_table_path;

/// Write `table` as the origin file for `name` under `field`.
///
/// # Errors
///
/// Returns [`CoreError::Io`] on a filesystem failure or
/// [`CoreError::Format`] if the table fails to encode.
pub fn write_origin(field: &Path, name: &str, table: &Table) -> Result<(), CoreError> {
    let mut buf = Vec::new();
    table.to_cbor(&mut buf)?;
    fs::write(origin_table_path(field, name), buf)?;
    Ok(())
}

/// Read the origin file for `name` under `field`.
///
/// # Errors
///
/// Returns [`CoreError::NameLookup`] if no origin file exists under this
/// name, or [`CoreError::Format`] if the bytes fail to decode.
pub fn read_origin(field: &Path, name: &str) -> Result<Table, CoreError> {
    let bytes = fs::read(origin_table_path(field, name))
        .map_err(|_| CoreError::NameLookup { kind: "origin", name: name.to_string() })?;
    Ok(Table::from_cbor(bytes.as_slice())?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use deltaflow_format::Column;

    fn sample() -> Table {
        Table::new(vec![0, 1], vec![("a".to_string(), Column::Int64(vec![Some(1), Some(2)]))]).unwrap()
    }

    // ── 1. an origin table round trips through write/read ──
    #[test]
    fn origin_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        crate::fs::touch(dir.path()).unwrap();
        write_origin(dir.path(), "o", &sample()).unwrap();
        let back = read_origin(dir.path(), "o").unwrap();
        assert_eq!(back, sample());
    }

    // ── 2. an unknown origin name errors with NameLookup ──
    #[test]
    fn unknown_origin_errors() {
        let dir = tempfile::tempdir().unwrap();
        crate::fs::touch(dir.path()).unwrap();
        let result = read_origin(dir.path(), "missing");
        assert!(matches!(result, Err(CoreError::NameLookup { kind: "origin", .. })));
    }
}

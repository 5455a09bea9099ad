// SPDX-License-Identifier: Apache-2.0
//! Bridges a materialized [`Table`]'s content into the digest primitives
//! exposed by `deltaflow_hash`.

use deltaflow_format::{Cell, Table};
use deltaflow_hash::{hash_table_from_parts, TableHash};

const FIELD_SEP: u8 = 0x1f;
const ROW_SEP: u8 = 0x1e;

fn push_cell_bytes(buf: &mut Vec<u8>, cell: &Cell) {
    match cell {
        Cell::Null => buf.push(0),
        Cell::Int64(v) => {
            buf.push(1);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        Cell::Float64(v) => {
            buf.push(2);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        Cell::Bool(v) => {
            buf.push(3);
            buf.push(u8::from(*v));
        }
        Cell::Utf8(v) => {
            buf.push(4);
            buf.extend_from_slice(&(v.len() as u64).to_le_bytes());
            buf.extend_from_slice(v.as_bytes());
        }
    }
}

/// Compute the content hash of a materialized table: column-label bytes,
/// then a deterministic per-row digest of the row-index key and every cell
/// value in column order. The label prefix is what keeps two tables with
/// identical values but different schemas from colliding.
#[must_use]
pub fn hash_table(table: &Table) -> TableHash {
    let labels = table.column_labels();

    let mut label_bytes = Vec::new();
    for (i, label) in labels.iter().enumerate() {
        if i > 0 {
            label_bytes.push(FIELD_SEP);
        }
        label_bytes.extend_from_slice(label.as_bytes());
    }

    let mut row_bytes = Vec::new();
    for (i, &row) in table.index().iter().enumerate() {
        if i > 0 {
            row_bytes.push(ROW_SEP);
        }
        row_bytes.extend_from_slice(&row.to_le_bytes());
        for label in &labels {
            row_bytes.push(FIELD_SEP);
            let cell = table.get(row, label).unwrap_or(Cell::Null);
            push_cell_bytes(&mut row_bytes, &cell);
        }
    }

    hash_table_from_parts(&label_bytes, &row_bytes)
}

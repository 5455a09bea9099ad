// SPDX-License-Identifier: Apache-2.0
//! CSV table I/O: the thin bridge between [`Table`] and the command line.
//!
//! The column-type inference here (try `i64`, then `f64`, then `bool`, else
//! fall back to `Utf8`) is a CLI-ergonomics convenience, not a spec'd
//! format — CSV carries no dtype information of its own.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use deltaflow_format::{Cell, Column, Table};

/// Read a CSV file into a [`Table`]. The first column is the row index
/// (must parse as `i64`); every other column's dtype is inferred from its
/// non-empty values.
pub fn read_table(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let col_names: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    let mut raw_cols: Vec<Vec<Option<String>>> = vec![Vec::new(); col_names.len()];
    let mut index = Vec::new();

    for result in reader.records() {
        let record = result?;
        let mut fields = record.iter();
        let idx_field = fields.next().context("row has no index column")?;
        index.push(idx_field.parse::<i64>().with_context(|| format!("index value '{idx_field}' is not an integer"))?);
        for (col, field) in raw_cols.iter_mut().zip(fields) {
            col.push(if field.is_empty() { None } else { Some(field.to_string()) });
        }
    }

    let columns = col_names.into_iter().zip(raw_cols).map(|(name, values)| (name, infer_column(values))).collect();
    Table::new(index, columns).context("building table from CSV")
}

/// Write a [`Table`] to `writer` as CSV: `index` column first, then every
/// data column in table order, null cells rendered as empty fields.
pub fn write_table<W: Write>(writer: W, table: &Table) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let labels = table.column_labels();

    let mut header = vec!["index".to_string()];
    header.extend(labels.iter().map(|l| (*l).to_string()));
    csv_writer.write_record(&header)?;

    for &row in table.index() {
        let mut record = vec![row.to_string()];
        for label in &labels {
            let cell = table.get(row, label).unwrap_or(Cell::Null);
            record.push(cell_to_string(&cell));
        }
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn cell_to_string(cell: &Cell) -> String {
    match cell {
        Cell::Int64(v) => v.to_string(),
        Cell::Float64(v) => v.to_string(),
        Cell::Bool(v) => v.to_string(),
        Cell::Utf8(v) => v.clone(),
        Cell::Null => String::new(),
    }
}

fn infer_column(values: Vec<Option<String>>) -> Column {
    let present: Vec<&str> = values.iter().filter_map(|v| v.as_deref()).collect();

    if present.iter().all(|v| v.parse::<i64>().is_ok()) {
        return Column::Int64(values.iter().map(|v| v.as_deref().and_then(|s| s.parse().ok())).collect());
    }
    if present.iter().all(|v| v.parse::<f64>().is_ok()) {
        return Column::Float64(values.iter().map(|v| v.as_deref().and_then(|s| s.parse().ok())).collect());
    }
    if present.iter().all(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false")) {
        return Column::Bool(values.iter().map(|v| v.as_deref().map(|s| s.eq_ignore_ascii_case("true"))).collect());
    }
    Column::Utf8(values)
}

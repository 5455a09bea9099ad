// SPDX-License-Identifier: Apache-2.0
//! `deltaflow`: a thin command-line front end over `deltaflow-core`.
//!
//! This binary exists so the workspace is runnable end-to-end. It is
//! deliberately undocumented beyond `--help` text — CLI ergonomics are not
//! part of the system this crate implements, only a way to exercise it.

mod csv_io;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use deltaflow_core::{AxisLabels, DropMethod, Field};
use deltaflow_format::Axis;

/// `deltaflow`: content-addressed version control for tabular datasets.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// An axis selector shared by every subcommand that targets rows or
/// columns.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum AxisArg {
    /// The row axis.
    Row,
    /// The column axis.
    Col,
}

impl From<AxisArg> for Axis {
    fn from(value: AxisArg) -> Self {
        match value {
            AxisArg::Row => Self::Row,
            AxisArg::Col => Self::Column,
        }
    }
}

/// A `drop` selection method.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum MethodArg {
    /// Drop the labels the caller's selection shares with `live`.
    Intersection,
    /// Drop the `live` labels not in the caller's selection.
    Difference,
}

impl From<MethodArg> for DropMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::Intersection => Self::Intersection,
            MethodArg::Difference => Self::Difference,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a field directory.
    Touch {
        /// Path to the field directory.
        path: PathBuf,
    },
    /// Register a CSV file as a new origin, creating its `.{name}` arrow.
    AddOrigin {
        /// Path to the field directory.
        path: PathBuf,
        /// The origin's name.
        name: String,
        /// Path to a CSV file.
        csv: PathBuf,
    },
    /// Point a new named arrow at an existing node.
    AddArrow {
        /// Path to the field directory.
        path: PathBuf,
        /// The node id to point at.
        node: String,
        /// The new arrow's name.
        name: String,
    },
    /// Stage an overwrite of cells from a CSV file's non-null values.
    Put {
        /// Path to the field directory.
        path: PathBuf,
        /// The arrow to mutate.
        arrow: String,
        /// Path to a CSV file.
        csv: PathBuf,
    },
    /// Stage a drop of rows or columns.
    Drop {
        /// Path to the field directory.
        path: PathBuf,
        /// The arrow to mutate.
        arrow: String,
        /// Which axis to drop along.
        #[arg(value_enum)]
        axis: AxisArg,
        /// Which labels in `labels` count toward the drop.
        #[arg(value_enum, default_value = "intersection")]
        method: MethodArg,
        /// Comma-separated labels (row ids for `row`, column names for `col`).
        labels: String,
    },
    /// Stage an append of rows or columns from a CSV file.
    Extend {
        /// Path to the field directory.
        path: PathBuf,
        /// The arrow to mutate.
        arrow: String,
        /// Which axis to extend along.
        #[arg(value_enum)]
        axis: AxisArg,
        /// Path to a CSV file.
        csv: PathBuf,
    },
    /// Stage a relabel of an axis's labels.
    Relabel {
        /// Path to the field directory.
        path: PathBuf,
        /// The arrow to mutate.
        arrow: String,
        /// Which axis to relabel.
        #[arg(value_enum)]
        axis: AxisArg,
        /// Comma-separated new labels, positional, same length as the axis.
        labels: String,
    },
    /// Undo the most recently staged mutation.
    Undo {
        /// Path to the field directory.
        path: PathBuf,
        /// The arrow to undo on.
        arrow: String,
    },
    /// Compile the staged log into a delta and advance the arrow's head.
    Commit {
        /// Path to the field directory.
        path: PathBuf,
        /// The arrow to commit.
        arrow: String,
    },
    /// Print an arrow's current staged table as CSV.
    Show {
        /// Path to the field directory.
        path: PathBuf,
        /// The arrow to show.
        arrow: String,
    },
    /// Print an arrow's lineage, origin first, one node id per line.
    Log {
        /// Path to the field directory.
        path: PathBuf,
        /// The arrow to walk.
        arrow: String,
    },
}

fn parse_row_labels(labels: &str) -> Result<AxisLabels> {
    let rows = labels
        .split(',')
        .map(|s| s.trim().parse::<i64>().with_context(|| format!("'{s}' is not an integer row label")))
        .collect::<Result<Vec<_>>>()?;
    Ok(AxisLabels::Rows(rows))
}

fn parse_col_labels(labels: &str) -> AxisLabels {
    AxisLabels::Cols(labels.split(',').map(|s| s.trim().to_string()).collect())
}

fn parse_axis_labels(labels: &str, axis: AxisArg) -> Result<AxisLabels> {
    match axis {
        AxisArg::Row => parse_row_labels(labels),
        AxisArg::Col => Ok(parse_col_labels(labels)),
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Touch { path } => {
            Field::touch(&path)?;
            println!("initialized field at {}", path.display());
        }
        Command::AddOrigin { path, name, csv } => {
            let field = Field::new(&path)?;
            let table = csv_io::read_table(&csv)?;
            let node_id = field.add_origin(&table, &name)?;
            println!("{node_id}");
        }
        Command::AddArrow { path, node, name } => {
            let field = Field::new(&path)?;
            field.add_arrow(&node, &name)?;
            println!("{name} -> {node}");
        }
        Command::Put { path, arrow, csv } => {
            let field = Field::new(&path)?;
            let table = csv_io::read_table(&csv)?;
            let mut handle = field.arrow(&arrow)?;
            handle.put(&table)?;
        }
        Command::Drop { path, arrow, axis, method, labels } => {
            let field = Field::new(&path)?;
            let axis_labels = parse_axis_labels(&labels, axis)?;
            let mut handle = field.arrow(&arrow)?;
            handle.drop(&axis_labels, axis.into(), method.into())?;
        }
        Command::Extend { path, arrow, axis, csv } => {
            let field = Field::new(&path)?;
            let table = csv_io::read_table(&csv)?;
            let mut handle = field.arrow(&arrow)?;
            handle.extend(&table, axis.into())?;
        }
        Command::Relabel { path, arrow, axis, labels } => {
            let field = Field::new(&path)?;
            let axis_labels = parse_axis_labels(&labels, axis)?;
            let mut handle = field.arrow(&arrow)?;
            handle.relabel(&axis_labels, axis.into())?;
        }
        Command::Undo { path, arrow } => {
            let field = Field::new(&path)?;
            let mut handle = field.arrow(&arrow)?;
            handle.undo()?;
        }
        Command::Commit { path, arrow } => {
            let field = Field::new(&path)?;
            let mut handle = field.arrow(&arrow)?;
            let new_head = handle.commit()?;
            println!("{new_head}");
        }
        Command::Show { path, arrow } => {
            let field = Field::new(&path)?;
            let handle = field.arrow(&arrow)?;
            csv_io::write_table(io::stdout(), &handle.proxy())?;
        }
        Command::Log { path, arrow } => {
            let field = Field::new(&path)?;
            let head = field.tree().arrow_head(&arrow)?;
            for (node_id, _) in field.tree().outline(&head)? {
                println!("{node_id}");
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    run(Cli::parse())
}

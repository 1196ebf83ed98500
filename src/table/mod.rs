// src/table/mod.rs
//! CSV import and export of record sets.

pub mod atomic;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use log::{debug, info};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::consolidation::ConsolidationResult;
use crate::models::record::{FieldValue, Record, RecordId};

pub use atomic::AtomicTableWriter;

pub const HIGHLIGHT_COLUMN: &str = "Highlight";

/// Row marking that stands in for spreadsheet cell colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    /// Kept as-is: nothing was folded into it. Green.
    Unique,
    /// Absorbed at least one duplicate. Yellow.
    Merged,
    Plain,
}

impl Highlight {
    pub fn color(&self) -> &'static str {
        match self {
            Highlight::Unique => "00FF00",
            Highlight::Merged => "FFFF00",
            Highlight::Plain => "",
        }
    }

    /// Colour for a consolidated row, from its provenance cell.
    pub fn for_provenance(record: &Record, provenance_field: &str) -> Self {
        match record.get(provenance_field) {
            Some(value) if !value.is_empty() => Highlight::Merged,
            Some(_) => Highlight::Unique,
            None => Highlight::Plain,
        }
    }
}

/// Reads a CSV table with a header row. Blank cells become nulls and short
/// rows are padded with nulls.
pub fn read_table(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open table {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Failed to read row {} of {}", line + 2, path.display()))?;
        records.push(Record::from_pairs(headers.iter().enumerate().map(|(i, name)| {
            (
                name.clone(),
                row.get(i).map(FieldValue::from_cell).unwrap_or(FieldValue::Null),
            )
        })));
    }
    debug!("Read {} rows from {}", records.len(), path.display());
    Ok(records)
}

/// Field names across `records`, in first-seen order.
pub fn header_union<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut header = Vec::new();
    for record in records {
        for name in record.field_names() {
            if seen.insert(name.to_string()) {
                header.push(name.to_string());
            }
        }
    }
    header
}

/// Writes `records` atomically. Fields a record lacks are written blank.
pub fn write_table(path: impl AsRef<Path>, records: &[Record]) -> Result<PathBuf> {
    let path = path.as_ref();
    let header = header_union(records);
    let mut writer = AtomicTableWriter::new(path)?;
    writer.write_row(&header)?;
    for record in records {
        writer.write_row(header.iter().map(|name| {
            record.get(name).map(|v| v.to_string()).unwrap_or_default()
        }))?;
    }
    let written = writer.finish()?;
    debug!("Wrote {} rows to {}", records.len(), written.display());
    Ok(written)
}

/// Writes the survivors with their discarded ids in `provenance_field`.
pub fn write_consolidation(
    path: impl AsRef<Path>,
    results: &[ConsolidationResult],
    provenance_field: &str,
) -> Result<PathBuf> {
    let rows: Vec<Record> = results
        .iter()
        .map(|r| r.to_output_record(provenance_field))
        .collect();
    write_table(path, &rows)
}

/// Rewrites the table at `path` with a [`HIGHLIGHT_COLUMN`] chosen by
/// `predicate`. Returns how many rows got a colour.
pub fn highlight<F>(path: impl AsRef<Path>, predicate: F) -> Result<usize>
where
    F: Fn(&Record) -> Highlight,
{
    let path = path.as_ref();
    let mut records = read_table(path)?;
    let mut coloured = 0;
    for record in records.iter_mut() {
        let mark = predicate(record);
        if mark != Highlight::Plain {
            coloured += 1;
        }
        record.set(HIGHLIGHT_COLUMN, mark.color());
    }
    write_table(path, &records)?;
    info!("Highlighted {} of {} rows in {}", coloured, records.len(), path.display());
    Ok(coloured)
}

/// Values of `column` in row order, blanks included as `None`.
pub fn read_id_column(path: impl AsRef<Path>, column: &str) -> Result<Vec<Option<RecordId>>> {
    let path = path.as_ref();
    let records = read_table(path)?;
    if let Some(first) = records.first() {
        if !first.contains_field(column) {
            anyhow::bail!("Column '{}' not found in {}", column, path.display());
        }
    }
    Ok(records
        .iter()
        .map(|r| r.get(column).and_then(FieldValue::as_key_part).map(RecordId))
        .collect())
}

/// Loads a list of ids from `column`, dropping blanks and repeats and
/// keeping first-seen order.
pub fn load_duplicate_ids(path: impl AsRef<Path>, column: &str) -> Result<Vec<RecordId>> {
    let path = path.as_ref();
    let mut seen = HashSet::new();
    let ids: Vec<RecordId> = read_id_column(path, column)?
        .into_iter()
        .flatten()
        .filter(|id| seen.insert(id.clone()))
        .collect();
    info!("Loaded {} distinct ids from {}", ids.len(), path.display());
    Ok(ids)
}

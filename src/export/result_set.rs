//! In-memory result set and its tabular form

use super::RecordSink;
use crate::error::ExportResult;
use crate::fs::{EntryKind, PathRecord};
use std::fmt;

/// Unordered collection of path records
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    records: Vec<PathRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: PathRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[PathRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<PathRecord> {
        self.records
    }

    /// Look up a record by exact path
    pub fn find(&self, path: &str) -> Option<&PathRecord> {
        self.records.iter().find(|r| r.path == path)
    }

    /// Records of one kind
    pub fn of_kind(&self, kind: EntryKind) -> impl Iterator<Item = &PathRecord> {
        self.records.iter().filter(move |r| r.kind == kind)
    }

    /// Records that carry an error
    pub fn partial(&self) -> impl Iterator<Item = &PathRecord> {
        self.records.iter().filter(|r| r.is_partial())
    }

    /// Sort by path, for stable display
    pub fn sort_by_path(&mut self) {
        self.records.sort_by(|a, b| a.path.cmp(&b.path));
    }

    /// Materialize as a flat table
    pub fn to_table(&self) -> Table {
        Table::from_records(&self.records)
    }
}

impl RecordSink for ResultSet {
    fn write_batch(&mut self, batch: &[PathRecord]) -> ExportResult<usize> {
        self.records.extend_from_slice(batch);
        Ok(batch.len())
    }
}

impl IntoIterator for ResultSet {
    type Item = PathRecord;
    type IntoIter = std::vec::IntoIter<PathRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a PathRecord;
    type IntoIter = std::slice::Iter<'a, PathRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl FromIterator<PathRecord> for ResultSet {
    fn from_iter<I: IntoIterator<Item = PathRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Rows = records, columns = record attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn from_records(records: &[PathRecord]) -> Self {
        Self {
            columns: PathRecord::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: records.iter().map(PathRecord::to_row).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Keep only the named columns, in the given order
    pub fn select(&self, names: &[&str]) -> Option<Table> {
        let indices = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Option<Vec<_>>>()?;

        Some(Table {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Render as aligned text, showing at most `max_rows` rows
    pub fn render(&self, max_rows: Option<usize>) -> String {
        let shown = max_rows.unwrap_or(self.rows.len()).min(self.rows.len());

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows[..shown] {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let format_line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = String::new();
        out.push_str(&format_line(&self.columns));
        out.push('\n');
        out.push_str(
            &widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("  "),
        );
        out.push('\n');
        for row in &self.rows[..shown] {
            out.push_str(&format_line(row));
            out.push('\n');
        }
        if shown < self.rows.len() {
            out.push_str(&format!("... {} more rows\n", self.rows.len() - shown));
        }
        out
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}

//! In-memory cohort table backed by the csv crate.

use super::{CohortError, CohortResult};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Cells treated as missing regardless of column type.
const MISSING_MARKERS: [&str; 5] = ["", "NA", "NAN", "N/A", "NULL"];

/// A flat participant table: trimmed headers and string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CohortTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Parse a cell as a number. Missing markers and unparsable text yield `None`.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if is_missing(cell) {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whether a cell counts as missing.
pub fn is_missing(cell: &str) -> bool {
    let upper = cell.trim().to_uppercase();
    MISSING_MARKERS.contains(&upper.as_str())
}

impl CohortTable {
    /// Build a table from headers and rows. Short rows are padded.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Read a CSV file.
    pub fn from_path(path: &Path) -> CohortResult<Self> {
        let file = std::fs::File::open(path).map_err(|source| CohortError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(file)?;
        debug!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }

    /// Read CSV from any reader. Headers and cells are trimmed and ragged
    /// rows are tolerated.
    pub fn from_reader<R: Read>(reader: R) -> CohortResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            if record.iter().all(|c| c.is_empty()) {
                continue;
            }
            rows.push(record.iter().map(String::from).collect());
        }

        Ok(Self::new(headers, rows))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of an exactly named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Resolve a column key to an actual header.
    ///
    /// Tries an exact match, then a case-insensitive match, then the first
    /// header containing the key.
    pub fn resolve_column(&self, key: &str) -> Option<&str> {
        let key = key.trim();
        if let Some(i) = self.column_index(key) {
            return Some(&self.headers[i]);
        }
        let upper = key.to_uppercase();
        if let Some(h) = self.headers.iter().find(|h| h.to_uppercase() == upper) {
            return Some(h);
        }
        self.headers
            .iter()
            .find(|h| h.contains(key))
            .map(String::as_str)
    }

    /// Resolve a column key or fail with `MissingColumn`.
    pub fn require_column(&self, key: &str) -> CohortResult<usize> {
        let name = self
            .resolve_column(key)
            .ok_or_else(|| CohortError::MissingColumn(key.to_string()))?;
        self.column_index(name)
            .ok_or_else(|| CohortError::MissingColumn(key.to_string()))
    }

    /// Cell at `row`, `col`.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Numeric values of a column, `None` where missing or unparsable.
    pub fn numeric(&self, key: &str) -> CohortResult<Vec<Option<f64>>> {
        let col = self.require_column(key)?;
        Ok(self.rows.iter().map(|r| parse_number(&r[col])).collect())
    }

    /// Text values of a column, trimmed.
    pub fn text(&self, key: &str) -> CohortResult<Vec<String>> {
        let col = self.require_column(key)?;
        Ok(self.rows.iter().map(|r| r[col].trim().to_string()).collect())
    }

    /// Whether every non-missing cell of column `col` parses as a number,
    /// with at least one such cell.
    pub fn is_numeric_column(&self, col: usize) -> bool {
        let mut seen = false;
        for row in &self.rows {
            let cell = &row[col];
            if is_missing(cell) {
                continue;
            }
            if parse_number(cell).is_none() {
                return false;
            }
            seen = true;
        }
        seen
    }

    /// Keep the rows where `keep` is true.
    pub fn filter_rows(&self, keep: &[bool]) -> Self {
        let rows = self
            .rows
            .iter()
            .zip(keep)
            .filter(|(_, k)| **k)
            .map(|(r, _)| r.clone())
            .collect();
        Self {
            headers: self.headers.clone(),
            rows,
        }
    }

    /// Overwrite a cell.
    pub fn set_cell(&mut self, row: usize, col: usize, value: String) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }

    /// Add a column, or replace it when the name already exists.
    pub fn with_column(&mut self, name: &str, values: Vec<String>) {
        let mut values = values;
        values.resize(self.rows.len(), String::new());
        match self.column_index(name) {
            Some(col) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[col] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }

    /// Write the table as CSV, creating parent directories.
    pub fn write_csv(&self, path: &Path) -> CohortResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| CohortError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(|source| CohortError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

//! Data models shared by the analyses and the report writers.
//!
//! Every analysis produces a [`ResultTable`]; the literature search
//! produces [`Paper`] records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata attached to a generated table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Version of the tool that produced the table.
    pub tool_version: String,
    /// Date and time of generation.
    pub generated_at: DateTime<Utc>,
    /// Cohort name or input file stem.
    pub cohort: String,
    /// Number of rows in the analysed cohort.
    pub n: usize,
}

impl ReportMetadata {
    pub fn new(cohort: &str, n: usize) -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now(),
            cohort: cohort.to_string(),
            n,
        }
    }
}

/// A rendered result: title, header row, string cells and footnotes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultTable {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ReportMetadata>,
}

impl ResultTable {
    /// Creates an empty table with the given header.
    pub fn new<S: AsRef<str>>(title: impl Into<String>, columns: &[S]) -> Self {
        Self {
            title: title.into(),
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: Vec::new(),
            notes: Vec::new(),
            metadata: None,
        }
    }

    /// Appends a row, padded or truncated to the header width.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    /// Appends a section row: the label in the first cell, the rest empty.
    pub fn push_section(&mut self, label: &str) {
        self.push_row(vec![format!("--- {} ---", label)]);
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn with_metadata(mut self, metadata: ReportMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell lookup by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }
}

/// One paper returned by the literature search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Paper {
    pub title: String,
    pub year: Option<i32>,
    pub authors: String,
    pub citations: u64,
    #[serde(rename = "Abstract")]
    pub abstract_text: String,
    #[serde(rename = "URL")]
    pub url: String,
    /// Provenance tag: anchor or search result.
    pub note: String,
    #[serde(default)]
    pub score: i64,
}

impl Paper {
    /// First listed author.
    pub fn first_author(&self) -> &str {
        self.authors.split(',').next().unwrap_or("").trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_row_pads_to_header() {
        let mut table = ResultTable::new("T", &["A", "B", "C"]);
        table.push_row(vec!["1".to_string()]);
        table.push_row(vec!["1".into(), "2".into(), "3".into(), "4".into()]);
        assert_eq!(table.rows[0], vec!["1", "", ""]);
        assert_eq!(table.rows[1].len(), 3);
        assert_eq!(table.get(1, "C"), Some("3"));
        assert_eq!(table.get(0, "D"), None);
    }

    #[test]
    fn test_section_row() {
        let mut table = ResultTable::new("T", &["Parameter", "Co"]);
        table.push_section("Distal Radius");
        assert_eq!(table.rows[0], vec!["--- Distal Radius ---", ""]);
    }

    #[test]
    fn test_metadata() {
        let table = ResultTable::new("T", &["A"]).with_metadata(ReportMetadata::new("total", 215));
        let metadata = table.metadata.unwrap();
        assert_eq!(metadata.cohort, "total");
        assert_eq!(metadata.n, 215);
        assert_eq!(metadata.tool_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_first_author() {
        let paper = Paper {
            title: "t".to_string(),
            year: Some(2017),
            authors: "E. Sornay-Rendu, S. Boutroy".to_string(),
            citations: 0,
            abstract_text: String::new(),
            url: String::new(),
            note: String::new(),
            score: 0,
        };
        assert_eq!(paper.first_author(), "E. Sornay-Rendu");
    }
}

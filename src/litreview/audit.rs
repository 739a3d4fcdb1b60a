//! Bibliography audit against the required references.

use super::bibtex::BibEntry;
use crate::config::RequiredReference;
use crate::models::ResultTable;
use serde::Serialize;

/// Outcome of checking a bibliography.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BibAudit {
    pub total_entries: usize,
    pub confirmed: Vec<RequiredReference>,
    pub missing: Vec<RequiredReference>,
}

impl BibAudit {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Status table, confirmed references first.
    pub fn to_table(&self) -> ResultTable {
        let mut table = ResultTable::new(
            format!("Bibliography Audit ({} entries)", self.total_entries),
            &["Reference", "Year", "Role", "Status"],
        );
        let rows = self
            .confirmed
            .iter()
            .map(|r| (r, "FOUND"))
            .chain(self.missing.iter().map(|r| (r, "MISSING")));
        for (reference, status) in rows {
            table.push_row(vec![
                reference.key.clone(),
                reference.year.clone(),
                reference.role.clone(),
                status.to_string(),
            ]);
        }
        table
    }
}

/// Whether an entry satisfies a required reference: its key names the
/// author and year, or its title contains the fragment.
fn matches(entry: &BibEntry, reference: &RequiredReference) -> bool {
    let key = entry.key.to_lowercase();
    if key.contains(&reference.key.to_lowercase()) && key.contains(&reference.year) {
        return true;
    }
    entry
        .field("title")
        .map(|title| {
            title
                .to_lowercase()
                .contains(&reference.title_fragment.to_lowercase())
        })
        .unwrap_or(false)
}

/// Check every required reference against the entries.
pub fn audit_bibliography(entries: &[BibEntry], required: &[RequiredReference]) -> BibAudit {
    let (confirmed, missing) = required
        .iter()
        .cloned()
        .partition(|reference| entries.iter().any(|e| matches(e, reference)));
    BibAudit {
        total_entries: entries.len(),
        confirmed,
        missing,
    }
}

//! Table rendering and output.
//!
//! Every analysis result is a [`ResultTable`]. This module turns one into
//! Markdown, CSV or JSON and writes it next to its siblings under the
//! tables directory.

use crate::cli::OutputFormat;
use crate::models::{ReportMetadata, ResultTable};
use crate::stats::{mean, std_dev, OddsRatio};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Format a p-value the way the manuscript tables print it:
/// bold when significant, `<0.001` below the display floor.
pub fn format_p(p: f64) -> String {
    if p.is_nan() {
        "-".to_string()
    } else if p < 0.001 {
        "**<0.001**".to_string()
    } else if p < 0.05 {
        format!("**{:.3}**", p)
    } else {
        format!("{:.3}", p)
    }
}

/// `mean ± sd` of the values, or `-` when there are none.
pub fn format_mean_sd(values: &[f64]) -> String {
    if values.is_empty() {
        return "-".to_string();
    }
    let sd = if values.len() > 1 { std_dev(values, 1) } else { 0.0 };
    format!("{:.2} ± {:.2}", mean(values), sd)
}

/// `OR (lower-upper)` with two decimals.
pub fn format_or(or: &OddsRatio) -> String {
    or.to_string()
}

/// Render a table as a GitHub Markdown block.
pub fn render_markdown(table: &ResultTable) -> String {
    let mut output = String::new();

    output.push_str(&format!("**{}**\n\n", table.title));
    if let Some(ref metadata) = table.metadata {
        output.push_str(&generate_metadata_line(metadata));
    }

    output.push_str(&format!("| {} |\n", table.columns.join(" | ")));
    let align: Vec<&str> = (0..table.columns.len())
        .map(|i| if i == 0 { ":---" } else { ":---:" })
        .collect();
    output.push_str(&format!("|{}|\n", align.join("|")));

    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(|c| c.replace('|', "\\|")).collect();
        output.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    if !table.notes.is_empty() {
        output.push('\n');
        for note in &table.notes {
            output.push_str(&format!("*{}*\n", note));
        }
    }

    output
}

fn generate_metadata_line(metadata: &ReportMetadata) -> String {
    format!(
        "*Cohort: {} (N={}) | bonestat v{} | {}*\n\n",
        metadata.cohort,
        metadata.n,
        metadata.tool_version,
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Render a table as CSV: header row then data rows. Markdown emphasis is
/// stripped from cells.
pub fn render_csv(table: &ResultTable) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|c| c.replace("**", "")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Render a table as pretty JSON.
pub fn render_json(table: &ResultTable) -> Result<String> {
    serde_json::to_string_pretty(table).map_err(Into::into)
}

/// Write text to `path` through a temporary file in the same directory,
/// so readers never see a partial file.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(content.as_bytes())?;
    file.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    debug!("Wrote {}", path.display());
    Ok(())
}

/// Save a table under `dir` as `stem.md`, `stem.csv` and/or `stem.json`.
///
/// An empty format list writes Markdown and CSV. Returns the written paths.
pub fn save_table(
    table: &ResultTable,
    dir: &Path,
    stem: &str,
    formats: &[OutputFormat],
) -> Result<Vec<PathBuf>> {
    let formats: Vec<OutputFormat> = if formats.is_empty() {
        vec![OutputFormat::Markdown, OutputFormat::Csv]
    } else {
        formats.to_vec()
    };

    let mut written = Vec::with_capacity(formats.len());
    for format in formats {
        let (extension, content) = match format {
            OutputFormat::Markdown => ("md", render_markdown(table)),
            OutputFormat::Csv => ("csv", render_csv(table)?),
            OutputFormat::Json => ("json", render_json(table)?),
        };
        let path = dir.join(format!("{}.{}", stem, extension));
        write_text(&path, &content)?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_table() -> ResultTable {
        let mut table = ResultTable::new(
            "Table 1: Clinical Characteristics",
            &["Parameter", "Fracture (n=3)", "Control (n=3)", "P-value"],
        );
        table.push_row(vec![
            "Age (years)".to_string(),
            "65.00 ± 2.00".to_string(),
            "60.00 ± 1.00".to_string(),
            format_p(0.012),
        ]);
        table.push_note("Welch t-test");
        table
    }

    #[test]
    fn test_format_p() {
        assert_eq!(format_p(0.0004), "**<0.001**");
        assert_eq!(format_p(0.0312), "**0.031**");
        assert_eq!(format_p(0.2), "0.200");
        assert_eq!(format_p(f64::NAN), "-");
    }

    #[test]
    fn test_format_mean_sd() {
        assert_eq!(format_mean_sd(&[1.0, 2.0, 3.0]), "2.00 ± 1.00");
        assert_eq!(format_mean_sd(&[4.0]), "4.00 ± 0.00");
        assert_eq!(format_mean_sd(&[]), "-");
    }

    #[test]
    fn test_format_or() {
        let or = OddsRatio {
            estimate: 2.346,
            lower: 1.1,
            upper: 4.999,
            p_value: 0.01,
        };
        assert_eq!(format_or(&or), "2.35 (1.10-5.00)");
    }

    #[test]
    fn test_render_markdown() {
        let markdown = render_markdown(&create_test_table());
        assert!(markdown.starts_with("**Table 1: Clinical Characteristics**\n\n"));
        assert!(markdown.contains("| Parameter | Fracture (n=3) | Control (n=3) | P-value |\n"));
        assert!(markdown.contains("|:---|:---:|:---:|:---:|\n"));
        assert!(markdown.contains("| Age (years) | 65.00 ± 2.00 | 60.00 ± 1.00 | **0.012** |"));
        assert!(markdown.contains("*Welch t-test*"));
    }

    #[test]
    fn test_render_markdown_with_metadata() {
        let table = create_test_table().with_metadata(ReportMetadata::new("osteopenia_n91", 91));
        let markdown = render_markdown(&table);
        assert!(markdown.contains("*Cohort: osteopenia_n91 (N=91) | bonestat v"));
    }

    #[test]
    fn test_render_csv_strips_emphasis() {
        let csv = render_csv(&create_test_table()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Parameter,Fracture (n=3),Control (n=3),P-value")
        );
        assert_eq!(lines.next(), Some("Age (years),65.00 ± 2.00,60.00 ± 1.00,0.012"));
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&create_test_table()).unwrap();
        assert!(json.contains("\"title\""));
        assert!(json.contains("\"rows\""));
        assert!(!json.contains("\"metadata\""));
    }

    #[test]
    fn test_save_table_default_formats() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("tables");
        let written = save_table(&create_test_table(), &dir, "Table1_Clinical", &[]).unwrap();

        assert_eq!(written.len(), 2);
        assert!(dir.join("Table1_Clinical.md").exists());
        assert!(dir.join("Table1_Clinical.csv").exists());
        assert!(!dir.join("Table1_Clinical.json").exists());
    }

    #[test]
    fn test_save_table_json_only() {
        let temp_dir = TempDir::new().unwrap();
        let written = save_table(
            &create_test_table(),
            temp_dir.path(),
            "out",
            &[OutputFormat::Json],
        )
        .unwrap();
        assert_eq!(written, vec![temp_dir.path().join("out.json")]);

        let content = std::fs::read_to_string(&written[0]).unwrap();
        let parsed: ResultTable = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.rows.len(), 1);
    }
}

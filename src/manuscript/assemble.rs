//! Manuscript assembly from section files.

use crate::config::ManuscriptConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// YAML front matter with the configured title and bibliography, or an
/// empty string when neither is set.
pub fn front_matter(config: &ManuscriptConfig) -> String {
    if config.title.is_none() && config.bibliography.is_none() {
        return String::new();
    }
    let mut out = String::from("---\n");
    if let Some(ref title) = config.title {
        out.push_str(&format!("title: \"{}\"\n", title.replace('"', "\\\"")));
    }
    if let Some(ref bibliography) = config.bibliography {
        out.push_str(&format!("bibliography: {}\n", bibliography));
    }
    out.push_str("---\n");
    out
}

/// Markdown files under `dir`, sorted by path. Hidden entries are skipped.
pub fn discover_sections(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Sections directory not found: {}", dir.display());
    }

    let mut sections = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        let is_markdown = entry.path().extension().and_then(|e| e.to_str()) == Some("md");
        if entry.file_type().is_file() && is_markdown {
            sections.push(entry.into_path());
        }
    }
    debug!("Found {} sections in {}", sections.len(), dir.display());
    Ok(sections)
}

/// Concatenate the sections in order, after the front matter, separated by
/// one blank line. Fails on the first missing section.
pub fn assemble(sections: &[PathBuf], config: &ManuscriptConfig) -> Result<String> {
    let mut parts = Vec::with_capacity(sections.len() + 1);
    let header = front_matter(config);
    if !header.is_empty() {
        parts.push(header.trim_end().to_string());
    }

    for section in sections {
        let content = std::fs::read_to_string(section)
            .with_context(|| format!("Missing section: {}", section.display()))?;
        parts.push(content.trim_end().to_string());
    }

    let mut manuscript = parts.join("\n\n");
    manuscript.push('\n');
    Ok(manuscript)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_front_matter() {
        assert_eq!(front_matter(&ManuscriptConfig::default()), "");

        let config = ManuscriptConfig {
            title: Some("HR-pQCT in \"grey zone\" osteopenia".to_string()),
            bibliography: Some("references.bib".to_string()),
            ..ManuscriptConfig::default()
        };
        assert_eq!(
            front_matter(&config),
            "---\ntitle: \"HR-pQCT in \\\"grey zone\\\" osteopenia\"\nbibliography: references.bib\n---\n"
        );
    }

    #[test]
    fn test_assemble_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let intro = write(temp_dir.path(), "intro.md", "# Introduction\n\nText.\n\n");
        let methods = write(temp_dir.path(), "methods.md", "# Methods\n");

        let config = ManuscriptConfig {
            bibliography: Some("refs.bib".to_string()),
            ..ManuscriptConfig::default()
        };
        let manuscript = assemble(&[methods, intro], &config).unwrap();
        assert_eq!(
            manuscript,
            "---\nbibliography: refs.bib\n---\n\n# Methods\n\n# Introduction\n\nText.\n"
        );
    }

    #[test]
    fn test_missing_section_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("results.md");
        let err = assemble(&[missing], &ManuscriptConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Missing section"));
    }

    #[test]
    fn test_discover_sections() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "02_methods.md", "m");
        write(temp_dir.path(), "01_intro.md", "i");
        write(temp_dir.path(), "notes.txt", "x");
        write(temp_dir.path(), ".draft/00_old.md", "o");
        write(temp_dir.path(), "03_results/table.md", "t");

        let sections = discover_sections(temp_dir.path()).unwrap();
        let names: Vec<String> = sections
            .iter()
            .map(|p| {
                p.strip_prefix(temp_dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(names, vec!["01_intro.md", "02_methods.md", "03_results/table.md"]);
    }

    #[test]
    fn test_discover_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(discover_sections(&temp_dir.path().join("nope")).is_err());
    }
}

//! BibTeX export and parsing.

use crate::models::Paper;
use std::collections::{BTreeMap, HashMap};

/// One parsed bibliography entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BibEntry {
    pub entry_type: String,
    pub key: String,
    /// Field names lowercased.
    pub fields: BTreeMap<String, String>,
}

impl BibEntry {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Base citation key: surname of the first author plus year.
pub fn citation_key(paper: &Paper) -> String {
    let surname = paper
        .first_author()
        .split_whitespace()
        .last()
        .unwrap_or("unknown")
        .to_lowercase();
    let year = paper
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "0000".to_string());
    format!("{}{}", surname, year)
}

/// Citation keys for all papers. Repeated keys get the suffixes a, b, ...
/// from their second occurrence on.
pub fn citation_keys(papers: &[Paper]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    papers
        .iter()
        .map(|paper| {
            let base = citation_key(paper);
            let count = seen.entry(base.clone()).or_insert(0);
            let key = match *count {
                0 => base,
                n => format!("{}{}", base, suffix(n - 1)),
            };
            *count += 1;
            key
        })
        .collect()
}

/// a, b, ..., z, aa, ab, ...
fn suffix(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'a' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Escape braces so values cannot unbalance an entry.
pub fn escape(value: &str) -> String {
    value.replace('{', "\\{").replace('}', "\\}")
}

/// Render papers as `@article` entries.
pub fn to_bibtex(papers: &[Paper]) -> String {
    let mut output = String::new();
    for (paper, key) in papers.iter().zip(citation_keys(papers)) {
        let year = paper
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "0000".to_string());
        output.push_str(&format!("@article{{{},\n", key));
        output.push_str(&format!(" abstract = {{{}}},\n", escape(&paper.abstract_text)));
        output.push_str(&format!(" author = {{{}}},\n", escape(&paper.authors)));
        output.push_str(&format!(" title = {{{}}},\n", escape(&paper.title)));
        output.push_str(&format!(" url = {{{}}},\n", escape(&paper.url)));
        output.push_str(&format!(" year = {{{}}}\n", year));
        output.push_str("}\n\n");
    }
    output
}

/// Parse `@type{key, field = {value}, field = "value", field = 123}` entries.
///
/// Comments, preambles and string definitions are skipped. Malformed
/// entries are dropped.
pub fn parse_bibtex(text: &str) -> Vec<BibEntry> {
    let chars: Vec<char> = text.chars().collect();
    let mut entries = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '@' {
            i += 1;
            continue;
        }
        i += 1;
        let start = i;
        while i < chars.len() && chars[i].is_alphanumeric() {
            i += 1;
        }
        let entry_type: String = chars[start..i].iter().collect::<String>().to_lowercase();
        skip_whitespace(&chars, &mut i);
        if i >= chars.len() || (chars[i] != '{' && chars[i] != '(') {
            continue;
        }
        let body_start = i + 1;
        let Some(body_end) = matching_close(&chars, i) else {
            break;
        };
        i = body_end + 1;

        if matches!(entry_type.as_str(), "comment" | "preamble" | "string") {
            continue;
        }
        if let Some(entry) = parse_body(&entry_type, &chars[body_start..body_end]) {
            entries.push(entry);
        }
    }

    entries
}

fn skip_whitespace(chars: &[char], i: &mut usize) {
    while *i < chars.len() && chars[*i].is_whitespace() {
        *i += 1;
    }
}

/// Index of the delimiter closing the one at `open`, honouring nesting and
/// backslash escapes.
fn matching_close(chars: &[char], open: usize) -> Option<usize> {
    let (open_c, close_c) = if chars[open] == '(' { ('(', ')') } else { ('{', '}') };
    let mut depth = 0usize;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            c if c == open_c => depth += 1,
            c if c == close_c => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn parse_body(entry_type: &str, body: &[char]) -> Option<BibEntry> {
    let comma = body.iter().position(|c| *c == ',')?;
    let key: String = body[..comma].iter().collect::<String>().trim().to_string();
    if key.is_empty() {
        return None;
    }

    let mut fields = BTreeMap::new();
    let mut i = comma + 1;
    loop {
        skip_whitespace(body, &mut i);
        let name_start = i;
        while i < body.len() && body[i] != '=' && body[i] != ',' {
            i += 1;
        }
        if i >= body.len() {
            break;
        }
        if body[i] == ',' {
            i += 1;
            continue;
        }
        let name: String = body[name_start..i]
            .iter()
            .collect::<String>()
            .trim()
            .to_lowercase();
        i += 1;
        skip_whitespace(body, &mut i);
        if i >= body.len() {
            break;
        }

        let value = match body[i] {
            '{' => {
                let end = matching_close(body, i)?;
                let value: String = body[i + 1..end].iter().collect();
                i = end + 1;
                value
            }
            '"' => {
                let mut end = i + 1;
                while end < body.len() && !(body[end] == '"' && body[end - 1] != '\\') {
                    end += 1;
                }
                let value: String = body[i + 1..end.min(body.len())].iter().collect();
                i = end + 1;
                value
            }
            _ => {
                let start = i;
                while i < body.len() && body[i] != ',' {
                    i += 1;
                }
                body[start..i].iter().collect::<String>().trim().to_string()
            }
        };

        if !name.is_empty() {
            fields.insert(name, unescape(&value));
        }
        while i < body.len() && body[i] != ',' {
            i += 1;
        }
        i += 1;
        if i >= body.len() {
            break;
        }
    }

    Some(BibEntry {
        entry_type: entry_type.to_string(),
        key,
        fields,
    })
}

fn unescape(value: &str) -> String {
    value.replace("\\{", "{").replace("\\}", "}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(authors: &str, year: Option<i32>, title: &str) -> Paper {
        Paper {
            title: title.to_string(),
            year,
            authors: authors.to_string(),
            citations: 0,
            abstract_text: String::new(),
            url: "https://example.org/p".to_string(),
            note: String::new(),
            score: 0,
        }
    }

    #[test]
    fn test_citation_key() {
        assert_eq!(
            citation_key(&paper("Elisabeth Sornay-Rendu, S. Boutroy", Some(2017), "t")),
            "sornay-rendu2017"
        );
        assert_eq!(citation_key(&paper("Unknown", None, "t")), "unknown0000");
    }

    #[test]
    fn test_colliding_keys() {
        let papers = vec![
            paper("J. Patsch", Some(2013), "a"),
            paper("J. Patsch", Some(2013), "b"),
            paper("K. Other", Some(2013), "c"),
            paper("J. Patsch", Some(2013), "d"),
        ];
        assert_eq!(
            citation_keys(&papers),
            vec!["patsch2013", "patsch2013a", "other2013", "patsch2013b"]
        );
    }

    #[test]
    fn test_suffix() {
        assert_eq!(suffix(0), "a");
        assert_eq!(suffix(25), "z");
        assert_eq!(suffix(26), "aa");
    }

    #[test]
    fn test_to_bibtex_escapes_braces() {
        let bib = to_bibtex(&[paper("J. Patsch", Some(2013), "Porosity {HR-pQCT}")]);
        assert!(bib.starts_with("@article{patsch2013,\n"));
        assert!(bib.contains(" title = {Porosity \\{HR-pQCT\\}},\n"));
        assert!(bib.contains(" year = {2013}\n}"));
    }

    #[test]
    fn test_parse_exported_bibtex() {
        let papers = vec![
            paper("J. Patsch", Some(2013), "Porosity {HR-pQCT}"),
            paper("E. Sornay-Rendu", Some(2017), "The OFELY Study"),
        ];
        let entries = parse_bibtex(&to_bibtex(&papers));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "patsch2013");
        assert_eq!(entries[0].field("title"), Some("Porosity {HR-pQCT}"));
        assert_eq!(entries[1].field("year"), Some("2017"));
    }

    #[test]
    fn test_parse_handwritten_bibtex() {
        let text = r#"
% exported from a reference manager
@comment{ignored, x = {1}}
@Article{ Boutroy2005 ,
  Title = {In vivo assessment of {trabecular} bone},
  journal = "J Clin Endocrinol Metab",
  year = 2005,
}
@book{nokey}
"#;
        let entries = parse_bibtex(text);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.entry_type, "article");
        assert_eq!(entry.key, "Boutroy2005");
        assert_eq!(entry.field("title"), Some("In vivo assessment of {trabecular} bone"));
        assert_eq!(entry.field("journal"), Some("J Clin Endocrinol Metab"));
        assert_eq!(entry.field("year"), Some("2005"));
    }
}

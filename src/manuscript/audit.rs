//! Manuscript text audit.
//!
//! Five checks run over the plain text: filler vocabulary, readability,
//! passive voice, grounding of numeric claims and overstated phrasing.

use crate::config::ManuscriptConfig;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Sentences shorter than this are never checked for grounding.
const MIN_CLAIM_LENGTH: usize = 30;

const BE_FORMS: &[&str] = &["am", "is", "are", "was", "were", "be", "been", "being"];

const IRREGULAR_PARTICIPLES: &[&str] = &[
    "known", "shown", "found", "seen", "made", "given", "taken", "done", "held", "kept", "left",
    "led", "met", "paid", "sent", "set", "put", "built", "told", "thought", "brought", "caught",
    "taught", "written", "drawn", "chosen", "grown", "born", "lost", "read", "run", "won",
];

/// Words ending in -ed/-en that are not participles.
const NOT_PARTICIPLES: &[&str] = &[
    "when", "then", "even", "often", "open", "seven", "between", "need", "indeed", "hundred",
    "women", "children", "listen",
];

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+%|\d+\.\d+").expect("valid number pattern"))
}

fn proof_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i:\(p\s*[<=]\s*\d)|\[@|Table|Figure|(?i:\bn\s*=\s*\d+)")
            .expect("valid proof pattern")
    })
}

fn year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\(\d{4}\)").expect("valid year pattern"))
}

/// Findings of one audit run.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub word_count: usize,
    pub sentence_count: usize,
    /// Filler words present, sorted.
    pub filler_words: Vec<String>,
    pub flesch_reading_ease: f64,
    pub flesch_kincaid_grade: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readability_warning: Option<String>,
    pub passive_sentences: usize,
    pub passive_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passive_warning: Option<String>,
    /// Numeric sentences backed by a p-value, citation, table, figure or n.
    pub data_driven_sentences: usize,
    /// Numeric sentences without any backing.
    pub unsupported_claims: Vec<String>,
    pub risky_phrases: Vec<String>,
}

impl AuditReport {
    /// Total number of issues raised.
    pub fn issue_count(&self) -> usize {
        self.filler_words.len()
            + usize::from(self.readability_warning.is_some())
            + usize::from(self.passive_warning.is_some())
            + self.unsupported_claims.len()
            + self.risky_phrases.len()
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Manuscript Audit\n\n");
        out.push_str(&format!(
            "**Words:** {} | **Sentences:** {} | **Issues:** {}\n\n",
            self.word_count,
            self.sentence_count,
            self.issue_count()
        ));

        out.push_str("## Filler Words\n\n");
        if self.filler_words.is_empty() {
            out.push_str("✅ None found\n\n");
        } else {
            out.push_str(&format!("⚠️ {}\n\n", self.filler_words.join(", ")));
        }

        out.push_str("## Readability\n\n");
        out.push_str(&format!(
            "- Flesch Reading Ease: {:.1}\n- Flesch-Kincaid Grade: {:.1}\n",
            self.flesch_reading_ease, self.flesch_kincaid_grade
        ));
        if let Some(ref warning) = self.readability_warning {
            out.push_str(&format!("\n⚠️ {}\n", warning));
        }
        out.push('\n');

        out.push_str("## Passive Voice\n\n");
        out.push_str(&format!(
            "{} of {} sentences ({:.1}%)\n",
            self.passive_sentences, self.sentence_count, self.passive_percent
        ));
        if let Some(ref warning) = self.passive_warning {
            out.push_str(&format!("\n⚠️ {}\n", warning));
        }
        out.push('\n');

        out.push_str("## Fact Grounding\n\n");
        out.push_str(&format!(
            "Data-driven sentences: {}\n\n",
            self.data_driven_sentences
        ));
        for claim in &self.unsupported_claims {
            out.push_str(&format!("- ❌ {}\n", claim));
        }
        if !self.unsupported_claims.is_empty() {
            out.push('\n');
        }

        out.push_str("## Risky Phrases\n\n");
        if self.risky_phrases.is_empty() {
            out.push_str("✅ None found\n");
        } else {
            for phrase in &self.risky_phrases {
                out.push_str(&format!("- \"{}\"\n", phrase));
            }
        }

        out
    }
}

/// Split on `.`, `!` or `?` followed by whitespace or the end of text, so
/// decimals stay inside their sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let boundary = matches!(c, '.' | '!' | '?')
            && chars.peek().map(|n| n.is_whitespace()).unwrap_or(true);
        if boundary {
            let sentence = current.split_whitespace().collect::<Vec<_>>().join(" ");
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }
    let rest = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}

/// Lowercased words with surrounding punctuation removed.
fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| w.chars().any(char::is_alphabetic))
        .collect()
}

/// Vowel-group syllable estimate, at least one per word.
pub fn count_syllables(word: &str) -> usize {
    let letters: Vec<char> = word
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return 0;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut count = 0;
    let mut previous_vowel = false;
    for &c in &letters {
        let vowel = is_vowel(c);
        if vowel && !previous_vowel {
            count += 1;
        }
        previous_vowel = vowel;
    }

    // silent final e, but not "-le"
    let n = letters.len();
    if n > 2 && letters[n - 1] == 'e' && letters[n - 2] != 'l' && !is_vowel(letters[n - 2]) {
        count -= 1;
    }
    count.max(1)
}

/// Flesch reading ease and Flesch-Kincaid grade.
pub fn readability(word_count: usize, sentence_count: usize, syllables: usize) -> (f64, f64) {
    if word_count == 0 || sentence_count == 0 {
        return (0.0, 0.0);
    }
    let words_per_sentence = word_count as f64 / sentence_count as f64;
    let syllables_per_word = syllables as f64 / word_count as f64;
    (
        206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word,
        0.39 * words_per_sentence + 11.8 * syllables_per_word - 15.59,
    )
}

fn is_participle(word: &str) -> bool {
    if IRREGULAR_PARTICIPLES.contains(&word) {
        return true;
    }
    if NOT_PARTICIPLES.contains(&word) || BE_FORMS.contains(&word) {
        return false;
    }
    word.len() > 3 && (word.ends_with("ed") || word.ends_with("en"))
}

/// A form of "be" followed within two words by a past participle.
pub fn is_passive(sentence: &str) -> bool {
    let words = words(sentence);
    words.iter().enumerate().any(|(i, word)| {
        BE_FORMS.contains(&word.as_str())
            && words
                .iter()
                .skip(i + 1)
                .take(2)
                .any(|next| is_participle(next))
    })
}

fn has_number(sentence: &str) -> bool {
    number_pattern().is_match(sentence)
}

/// Sentences citing a year such as `(2017)` are never listed as unsupported.
fn cites_year(sentence: &str) -> bool {
    year_pattern().is_match(sentence)
}

fn has_proof(sentence: &str) -> bool {
    proof_pattern().is_match(sentence)
}

/// Run every check over `text`.
pub fn audit_text(text: &str, config: &ManuscriptConfig) -> AuditReport {
    let lowered = text.to_lowercase();
    let sentences = split_sentences(text);
    let all_words = words(text);
    let syllables: usize = all_words.iter().map(|w| count_syllables(w)).sum();

    let word_set: BTreeSet<&str> = all_words.iter().map(String::as_str).collect();
    let filler_words: Vec<String> = config
        .filler_words
        .iter()
        .map(|w| w.to_lowercase())
        .filter(|w| word_set.contains(w.as_str()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let (flesch, grade) = readability(all_words.len(), sentences.len(), syllables);
    let readability_warning = if sentences.is_empty() {
        None
    } else if flesch > config.readability_max {
        Some(format!(
            "Reading ease {:.1} is above {:.0}: text may be too simple",
            flesch, config.readability_max
        ))
    } else if flesch < config.readability_min {
        Some(format!(
            "Reading ease {:.1} is below {:.0}: text may be too dense",
            flesch, config.readability_min
        ))
    } else {
        None
    };

    let passive_sentences = sentences.iter().filter(|s| is_passive(s)).count();
    let passive_percent = if sentences.is_empty() {
        0.0
    } else {
        100.0 * passive_sentences as f64 / sentences.len() as f64
    };
    let passive_warning = (passive_percent > config.passive_threshold).then(|| {
        format!(
            "Passive voice in {:.1}% of sentences exceeds {:.0}%",
            passive_percent, config.passive_threshold
        )
    });

    let mut data_driven_sentences = 0;
    let mut unsupported_claims = Vec::new();
    for sentence in &sentences {
        if sentence.len() < MIN_CLAIM_LENGTH {
            continue;
        }
        if has_proof(sentence) {
            data_driven_sentences += 1;
        } else if has_number(sentence) && !cites_year(sentence) {
            unsupported_claims.push(sentence.clone());
        }
    }

    let risky_phrases = config
        .risky_phrases
        .iter()
        .filter(|phrase| contains_phrase(&lowered, &phrase.to_lowercase()))
        .cloned()
        .collect();

    AuditReport {
        word_count: all_words.len(),
        sentence_count: sentences.len(),
        filler_words,
        flesch_reading_ease: flesch,
        flesch_kincaid_grade: grade,
        readability_warning,
        passive_sentences,
        passive_percent,
        passive_warning,
        data_driven_sentences,
        unsupported_claims,
        risky_phrases,
    }
}

/// Phrase match on word boundaries, so "prove" does not fire on "improve".
fn contains_phrase(text: &str, phrase: &str) -> bool {
    text.match_indices(phrase).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + phrase.len()..].chars().next();
        !before.map(char::is_alphanumeric).unwrap_or(false)
            && !after.map(char::is_alphanumeric).unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences_keeps_decimals() {
        let sentences = split_sentences("AUC was 0.72 overall. Was it? Yes!\nDone");
        assert_eq!(
            sentences,
            vec!["AUC was 0.72 overall.", "Was it?", "Yes!", "Done"]
        );
    }

    #[test]
    fn test_count_syllables() {
        assert_eq!(count_syllables("bone"), 1);
        assert_eq!(count_syllables("table"), 2);
        assert_eq!(count_syllables("porosity"), 4);
        assert_eq!(count_syllables("the"), 1);
        assert_eq!(count_syllables("123"), 0);
    }

    #[test]
    fn test_readability() {
        // 10 words, 1 sentence, 15 syllables
        let (flesch, grade) = readability(10, 1, 15);
        assert!((flesch - 69.785).abs() < 1e-9);
        assert!((grade - 6.01).abs() < 1e-9);
        assert_eq!(readability(0, 0, 0), (0.0, 0.0));
    }

    #[test]
    fn test_passive_detection() {
        assert!(is_passive("The samples were analysed by HR-pQCT."));
        assert!(is_passive("Fractures were not found in controls."));
        assert!(is_passive("Patients are often excluded."));
        assert!(!is_passive("We analysed the samples."));
        assert!(!is_passive("The cohort is between ages 50 and 80."));
    }

    #[test]
    fn test_fact_grounding() {
        let config = ManuscriptConfig::default();
        let text = "Trabecular number was lower in fracture cases (p=0.01). \
                    Cortical porosity rose by 12% in women with diabetes. \
                    The AUC reached 0.74 in the structural model (Table 3). \
                    This was first reported by Boutroy et al. (2005) in Lyon.";
        let report = audit_text(text, &config);
        assert_eq!(report.data_driven_sentences, 2);
        assert_eq!(
            report.unsupported_claims,
            vec!["Cortical porosity rose by 12% in women with diabetes."]
        );
    }

    #[test]
    fn test_cited_year_exempts_claim() {
        let config = ManuscriptConfig::default();
        let report = audit_text(
            "Smith (2017) reported a 45% rise in fracture risk among patients.",
            &config,
        );
        assert!(report.unsupported_claims.is_empty());
        assert_eq!(report.data_driven_sentences, 0);
    }

    #[test]
    fn test_reference_without_number_is_data_driven() {
        let config = ManuscriptConfig::default();
        let text = "Baseline characteristics are listed in Table 1 for both arms. \
                    The table below lists every cortical parameter we measured.";
        let report = audit_text(text, &config);
        // Only the capitalised reference counts
        assert_eq!(report.data_driven_sentences, 1);
        assert!(report.unsupported_claims.is_empty());
    }

    #[test]
    fn test_filler_and_risky_phrases() {
        let config = ManuscriptConfig::default();
        let text = "We delve into a pivotal question. Results improve. \
                    This clearly demonstrates a crucial and pivotal effect.";
        let report = audit_text(text, &config);
        assert_eq!(report.filler_words, vec!["crucial", "delve", "pivotal"]);
        assert_eq!(report.risky_phrases, vec!["clearly demonstrates"]);
    }

    #[test]
    fn test_passive_warning() {
        let config = ManuscriptConfig::default();
        let report = audit_text("Data were collected. We ran models.", &config);
        assert_eq!(report.passive_sentences, 1);
        assert!((report.passive_percent - 50.0).abs() < 1e-9);
        assert!(report.passive_warning.is_some());
    }

    #[test]
    fn test_empty_text() {
        let report = audit_text("", &ManuscriptConfig::default());
        assert_eq!(report.sentence_count, 0);
        assert_eq!(report.issue_count(), 0);
    }

    #[test]
    fn test_markdown_and_json() {
        let report = audit_text("We delve deeper.", &ManuscriptConfig::default());
        let markdown = report.to_markdown();
        assert!(markdown.starts_with("# Manuscript Audit\n"));
        assert!(markdown.contains("⚠️ delve"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["filler_words"][0], "delve");
        assert_eq!(json["sentence_count"], 1);
    }
}

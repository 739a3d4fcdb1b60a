//! Relevance scoring of search results.

use super::client::ANCHOR_NOTE;
use crate::config::LitReviewConfig;
use crate::models::Paper;

/// Points for each high-value keyword found.
const HIGH_VALUE_POINTS: i64 = 3;
/// Points for each medium-value keyword found.
const MEDIUM_VALUE_POINTS: i64 = 1;
/// Bonus for well-cited papers.
const CITATION_POINTS: i64 = 1;
/// Anchors always outrank everything else.
const ANCHOR_POINTS: i64 = 50;

/// Score one paper on its title and abstract.
pub fn score_paper(paper: &Paper, config: &LitReviewConfig) -> i64 {
    let text = format!("{} {}", paper.title, paper.abstract_text).to_lowercase();
    let hits = |keywords: &[String]| {
        keywords
            .iter()
            .filter(|k| text.contains(&k.to_lowercase()))
            .count() as i64
    };

    let mut score = hits(&config.high_value_keywords) * HIGH_VALUE_POINTS
        + hits(&config.medium_value_keywords) * MEDIUM_VALUE_POINTS;
    if paper.citations > config.citation_threshold {
        score += CITATION_POINTS;
    }
    if paper.note == ANCHOR_NOTE {
        score += ANCHOR_POINTS;
    }
    score
}

/// Score every paper, keep those reaching the minimum and sort by score,
/// highest first. Equal scores keep their input order.
pub fn score_and_filter(papers: Vec<Paper>, config: &LitReviewConfig) -> Vec<Paper> {
    let mut kept: Vec<Paper> = papers
        .into_iter()
        .map(|mut paper| {
            paper.score = score_paper(&paper, config);
            paper
        })
        .filter(|paper| paper.score >= config.min_score)
        .collect();
    kept.sort_by(|a, b| b.score.cmp(&a.score));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::litreview::client::SEARCH_NOTE;

    fn paper(title: &str, abstract_text: &str, citations: u64, note: &str) -> Paper {
        Paper {
            title: title.to_string(),
            year: Some(2020),
            authors: "A. Author".to_string(),
            citations,
            abstract_text: abstract_text.to_string(),
            url: String::new(),
            note: note.to_string(),
            score: 0,
        }
    }

    #[test]
    fn test_keyword_points() {
        let config = LitReviewConfig::default();
        // osteopenia (3) + diabetes (3) + hr-pqct (1) + trabecular (1)
        let p = paper(
            "Osteopenia and Diabetes",
            "HR-pQCT trabecular findings",
            10,
            SEARCH_NOTE,
        );
        assert_eq!(score_paper(&p, &config), 8);
    }

    #[test]
    fn test_citation_and_anchor_bonus() {
        let config = LitReviewConfig::default();
        assert_eq!(score_paper(&paper("Unrelated", "", 51, SEARCH_NOTE), &config), 1);
        assert_eq!(score_paper(&paper("Unrelated", "", 50, SEARCH_NOTE), &config), 0);
        assert_eq!(score_paper(&paper("Unrelated", "", 0, ANCHOR_NOTE), &config), 50);
    }

    #[test]
    fn test_score_and_filter() {
        let config = LitReviewConfig::default();
        let papers = vec![
            paper("Trabecular AUC", "", 0, SEARCH_NOTE),
            paper("T-score study", "", 0, SEARCH_NOTE),
            paper("Osteopenia cohort", "", 0, SEARCH_NOTE),
            paper("OFELY", "", 0, ANCHOR_NOTE),
        ];
        let kept = score_and_filter(papers, &config);
        let titles: Vec<&str> = kept.iter().map(|p| p.title.as_str()).collect();
        // "Trabecular AUC" scores 2 and is dropped; ties keep input order
        assert_eq!(titles, vec!["OFELY", "T-score study", "Osteopenia cohort"]);
        assert_eq!(kept[0].score, 50);
    }
}

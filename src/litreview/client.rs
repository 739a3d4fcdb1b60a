//! Paper search client.
//!
//! Talks to the Semantic Scholar Graph API: anchor papers are looked up by
//! exact title first, then the main query runs, and the two lists are merged
//! with duplicates removed by title.

use crate::config::LitReviewConfig;
use crate::models::Paper;
use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Provenance tag for anchor papers.
pub const ANCHOR_NOTE: &str = "GOLD STANDARD ANCHOR";

/// Provenance tag for papers found by the query.
pub const SEARCH_NOTE: &str = "Search Result";

const FIELDS: &str = "title,abstract,year,authors,citationCount,url";

/// Search API response.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<ApiPaper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPaper {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    authors: Vec<ApiAuthor>,
    #[serde(default)]
    citation_count: Option<u64>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiAuthor {
    #[serde(default)]
    name: Option<String>,
}

impl ApiPaper {
    fn into_paper(self, note: &str) -> Option<Paper> {
        let title = self.title?.trim().to_string();
        if title.is_empty() {
            return None;
        }
        let names: Vec<String> = self.authors.into_iter().filter_map(|a| a.name).collect();
        Some(Paper {
            title,
            year: self.year,
            authors: if names.is_empty() {
                "Unknown".to_string()
            } else {
                names.join(", ")
            },
            citations: self.citation_count.unwrap_or(0),
            abstract_text: self.abstract_text.unwrap_or_default(),
            url: self.url.unwrap_or_default(),
            note: note.to_string(),
            score: 0,
        })
    }
}

/// Parse a search response body into papers tagged with `note`.
pub fn parse_search_response(body: &str, note: &str) -> Result<Vec<Paper>> {
    let response: SearchResponse =
        serde_json::from_str(body).context("Failed to parse search response")?;
    Ok(response
        .data
        .into_iter()
        .filter_map(|p| p.into_paper(note))
        .collect())
}

/// Keep the first paper of each title (case-insensitive).
pub fn dedupe_by_title(papers: Vec<Paper>) -> Vec<Paper> {
    let mut seen = HashSet::new();
    papers
        .into_iter()
        .filter(|p| seen.insert(p.title.to_lowercase()))
        .collect()
}

/// HTTP client for the paper search API.
pub struct SearchClient {
    http_client: reqwest::Client,
    api_url: String,
    timeout_seconds: u64,
}

impl SearchClient {
    pub fn new(config: &LitReviewConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            timeout_seconds: config.timeout_seconds,
        })
    }

    /// Run one search request.
    pub async fn search(&self, query: &str, limit: usize, note: &str) -> Result<Vec<Paper>> {
        let url = format!("{}/paper/search", self.api_url);
        debug!("GET {} query='{}' limit={}", url, query, limit);

        let limit = limit.to_string();
        let response = self
            .http_client
            .get(&url)
            .query(&[("query", query), ("limit", limit.as_str()), ("fields", FIELDS)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Request timed out after {}s", self.timeout_seconds)
                } else if e.is_connect() {
                    anyhow::anyhow!("Cannot connect to search API at {}", self.api_url)
                } else {
                    anyhow::anyhow!("Failed to send request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Search API error {}: {}", status, body));
        }

        let body = response
            .text()
            .await
            .context("Failed to read search response")?;
        parse_search_response(&body, note)
    }

    /// Look up each anchor title concurrently. Failures are logged and skipped.
    pub async fn fetch_anchors(&self, titles: &[String]) -> Vec<Paper> {
        let lookups = titles.iter().map(|title| self.search(title, 1, ANCHOR_NOTE));
        let results = join_all(lookups).await;

        let mut anchors = Vec::new();
        for (title, result) in titles.iter().zip(results) {
            match result {
                Ok(mut papers) if !papers.is_empty() => {
                    let paper = papers.remove(0);
                    info!("Found anchor: {}", paper.title);
                    anchors.push(paper);
                }
                Ok(_) => warn!("Could not find anchor paper: {}", title),
                Err(e) => warn!("Error fetching anchor '{}': {}", title, e),
            }
        }
        anchors
    }

    /// Anchors followed by the query results, deduplicated by title.
    pub async fn collect(
        &self,
        config: &LitReviewConfig,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Paper>> {
        let anchors = self.fetch_anchors(&config.anchors).await;
        info!("Searching for '{}' (limit {})", query, limit);
        let results = self
            .search(query, limit, SEARCH_NOTE)
            .await
            .context("Literature search failed")?;
        info!(
            "Found {} search results and {} anchors",
            results.len(),
            anchors.len()
        );

        let mut papers = anchors;
        papers.extend(results);
        Ok(dedupe_by_title(papers))
    }
}

/// Write papers as CSV with a header row.
pub fn write_papers_csv(papers: &[Paper], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for paper in papers {
        writer.serialize(paper)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e))?;
    let content = String::from_utf8(bytes).context("CSV output is not UTF-8")?;
    crate::report::write_text(path, &content)
}

/// Read papers written by [`write_papers_csv`].
pub fn read_papers_csv(path: &Path) -> Result<Vec<Paper>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<Paper>, _>>()
        .with_context(|| format!("Failed to parse {}", path.display()))
}

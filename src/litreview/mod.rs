//! Literature review: search, relevance scoring, BibTeX export and the
//! bibliography audit.

pub mod audit;
pub mod bibtex;
pub mod client;
pub mod scoring;

pub use audit::{audit_bibliography, BibAudit};
pub use bibtex::{parse_bibtex, to_bibtex};
pub use client::{read_papers_csv, write_papers_csv, SearchClient};
pub use scoring::score_and_filter;

//! Cohort data model.
//!
//! A cohort is one flat CSV table with one row per participant. This module
//! loads it, resolves columns, classifies rows into study arms and subgroups,
//! and derives the final cohort files from a raw export.

pub mod classify;
pub mod groups;
pub mod setup;
pub mod table;

use std::path::PathBuf;
use thiserror::Error;

pub use classify::{is_positive, FractureSite};
pub use groups::{Arm, GroupSpec, Subgroup};
pub use table::CohortTable;

/// Errors raised while reading or shaping cohort data.
#[derive(Debug, Error)]
pub enum CohortError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("column not found: {0}")]
    MissingColumn(String),
}

pub type CohortResult<T> = std::result::Result<T, CohortError>;

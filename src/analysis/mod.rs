//! Cohort analyses.
//!
//! Each analysis takes a loaded [`CohortTable`](crate::cohort::CohortTable)
//! and the configuration and returns a [`ResultTable`](crate::models::ResultTable)
//! (or plot data). Nothing in here writes files; the commands in `main`
//! decide where results go.

pub mod aggregator;
pub mod baseline;
pub mod compare;
pub mod explore;
pub mod fractures;
pub mod odds;
pub mod risk_factors;
pub mod roc;
pub mod subgroups;

use crate::cohort::CohortError;
use crate::stats::StatsError;
use thiserror::Error;

pub use compare::compare_table;
pub use odds::{forest_rows, odds_table};
pub use roc::roc_models;

/// Errors raised by a single analysis step.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Cohort(#[from] CohortError),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error("{0}")]
    Skipped(String),
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
pub(crate) fn sample_cohort() -> crate::cohort::CohortTable {
    crate::cohort::CohortTable::from_reader(
        include_str!("../../fixtures/cohort_sample.csv").as_bytes(),
    )
    .expect("sample cohort parses")
}

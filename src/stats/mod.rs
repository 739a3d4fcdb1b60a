//! Shared statistical routines.
//!
//! Every analysis in the crate goes through these functions: descriptive
//! summaries, hypothesis tests, effect sizes and the regression models.

pub mod correlation;
pub mod descriptive;
pub mod distributions;
pub mod effect;
pub mod hypothesis;
pub mod linalg;
pub mod linear;
pub mod logistic;
pub mod roc;

use thiserror::Error;

pub use correlation::pearson;
pub use descriptive::{mean, quartile_bins, std_dev, zscore, Summary};
pub use effect::{auc_from_u, cohens_d, percent_difference, risk_factor_d};
pub use hypothesis::{categorical_test, continuous_test, t_test, TTestKind};
pub use linear::ols;
pub use logistic::{LogisticRegression, OddsRatio};
pub use roc::{auc_trapezoid, roc_curve};

/// Errors raised by the statistical routines.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatsError {
    #[error("insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("degenerate input: {0}")]
    Degenerate(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("matrix is singular")]
    Singular,

    #[error("model did not converge after {0} iterations")]
    NoConvergence(usize),

    #[error("perfect separation detected")]
    PerfectSeparation,
}

pub type StatsResult<T> = std::result::Result<T, StatsError>;

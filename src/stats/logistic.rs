//! Binary logistic regression fitted by Newton-Raphson.
//!
//! The model always includes an intercept. Coefficients are reported in
//! design order with the intercept first, and standard errors come from the
//! inverse observed information matrix at convergence.

use super::distributions::normal_sf;
use super::linalg::{invert, with_intercept};
use super::{StatsError, StatsResult};
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// 97.5th percentile of the standard normal distribution.
pub const Z_975: f64 = 1.959_963_984_540_054;

const SEPARATION_EPS: f64 = 1e-10;
const DIVERGENCE_LIMIT: f64 = 25.0;

/// Odds ratio with its 95% Wald confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OddsRatio {
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
    pub p_value: f64,
}

impl fmt::Display for OddsRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} ({:.2}-{:.2})", self.estimate, self.lower, self.upper)
    }
}

/// Fitting options.
#[derive(Debug, Clone, Copy)]
pub struct LogisticRegression {
    max_iter: usize,
    tol: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            max_iter: 35,
            tol: 1e-8,
        }
    }
}

/// A fitted logistic model.
#[derive(Debug, Clone, Serialize)]
pub struct LogitFit {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub z_values: Vec<f64>,
    pub p_values: Vec<f64>,
    pub log_likelihood: f64,
    pub iterations: usize,
    pub n: usize,
}

fn sigmoid(eta: f64) -> f64 {
    1.0 / (1.0 + (-eta).exp())
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum Newton iterations.
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Convergence tolerance on the largest coefficient step.
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Fit `y ~ 1 + x`. `y` must contain only 0.0 and 1.0.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> StatsResult<LogitFit> {
        let n = x.nrows();
        if y.len() != n {
            return Err(StatsError::InvalidInput(format!(
                "design has {} rows but outcome has {}",
                n,
                y.len()
            )));
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(StatsError::InvalidInput(
                "outcome must be coded 0/1".to_string(),
            ));
        }

        let design = with_intercept(x);
        let k = design.ncols();
        if n <= k {
            return Err(StatsError::InsufficientData {
                needed: k + 1,
                got: n,
            });
        }

        let events = y.sum();
        if events == 0.0 || events == n as f64 {
            return Err(StatsError::Degenerate(
                "outcome has a single class".to_string(),
            ));
        }

        let mut beta = Array1::<f64>::zeros(k);
        let mut converged = false;
        let mut iterations = 0;

        for iter in 1..=self.max_iter {
            iterations = iter;
            let p = design.dot(&beta).mapv(sigmoid);

            if perfectly_predicts(&p, y) {
                return Err(StatsError::PerfectSeparation);
            }

            let information = weighted_gram(&design, &p);
            let gradient = design.t().dot(&(y - &p));
            let step = match invert(&information) {
                Ok(inverse) => inverse.dot(&gradient),
                // Information collapses once fitted probabilities saturate.
                Err(StatsError::Singular) if beta.iter().any(|b| b.abs() > DIVERGENCE_LIMIT) => {
                    return Err(StatsError::PerfectSeparation)
                }
                Err(e) => return Err(e),
            };
            beta += &step;

            let max_step = step.iter().fold(0.0f64, |m, v| m.max(v.abs()));
            if !max_step.is_finite() {
                return Err(StatsError::PerfectSeparation);
            }
            if max_step < self.tol {
                converged = true;
                break;
            }
        }

        let p = design.dot(&beta).mapv(sigmoid);
        if perfectly_predicts(&p, y) {
            return Err(StatsError::PerfectSeparation);
        }
        if !converged {
            if beta.iter().any(|b| b.abs() > DIVERGENCE_LIMIT) {
                return Err(StatsError::PerfectSeparation);
            }
            return Err(StatsError::NoConvergence(iterations));
        }
        debug!("Logit converged after {} iterations", iterations);

        let covariance = invert(&weighted_gram(&design, &p))?;
        let std_errors: Vec<f64> = covariance.diag().iter().map(|v| v.sqrt()).collect();
        let coefficients = beta.to_vec();
        let z_values: Vec<f64> = coefficients
            .iter()
            .zip(&std_errors)
            .map(|(b, se)| b / se)
            .collect();
        let p_values = z_values.iter().map(|z| 2.0 * normal_sf(z.abs())).collect();

        let log_likelihood = p
            .iter()
            .zip(y.iter())
            .map(|(&pi, &yi)| {
                let pi = pi.clamp(1e-15, 1.0 - 1e-15);
                yi * pi.ln() + (1.0 - yi) * (1.0 - pi).ln()
            })
            .sum();

        Ok(LogitFit {
            coefficients,
            std_errors,
            z_values,
            p_values,
            log_likelihood,
            iterations,
            n,
        })
    }
}

/// X' W X with W = diag(p (1 - p)).
fn weighted_gram(design: &Array2<f64>, p: &Array1<f64>) -> Array2<f64> {
    let w = p.mapv(|pi| pi * (1.0 - pi));
    let weighted = design * &w.insert_axis(ndarray::Axis(1));
    design.t().dot(&weighted)
}

fn perfectly_predicts(p: &Array1<f64>, y: &Array1<f64>) -> bool {
    p.iter()
        .zip(y.iter())
        .all(|(&pi, &yi)| (pi - yi).abs() < SEPARATION_EPS)
}

impl LogitFit {
    /// Odds ratio for predictor `index` (0-based, intercept excluded).
    pub fn odds_ratio(&self, index: usize) -> Option<OddsRatio> {
        let beta = *self.coefficients.get(index + 1)?;
        let se = *self.std_errors.get(index + 1)?;
        Some(OddsRatio {
            estimate: beta.exp(),
            lower: (beta - Z_975 * se).exp(),
            upper: (beta + Z_975 * se).exp(),
            p_value: self.p_values[index + 1],
        })
    }

    /// Predicted event probabilities for new rows (without intercept column).
    pub fn predict_proba(&self, x: &Array2<f64>) -> Vec<f64> {
        let beta = Array1::from(self.coefficients.clone());
        with_intercept(x).dot(&beta).mapv(sigmoid).to_vec()
    }
}

//! Effect sizes for two-group comparisons.

use super::descriptive::{mean, std_dev, variance};
use super::hypothesis::mann_whitney_u;

/// Cohen's d using the pooled sample standard deviation.
///
/// Returns 0.0 when either group has fewer than two values or the pooled
/// SD is zero.
pub fn cohens_d(a: &[f64], b: &[f64]) -> f64 {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return 0.0;
    }
    let pooled_var = ((n1 - 1) as f64 * variance(a, 1) + (n2 - 1) as f64 * variance(b, 1))
        / (n1 + n2 - 2) as f64;
    let pooled_sd = pooled_var.sqrt();
    if pooled_sd == 0.0 || !pooled_sd.is_finite() {
        return 0.0;
    }
    (mean(a) - mean(b)) / pooled_sd
}

/// Discrimination AUC derived from the Mann-Whitney U of `case` vs `control`.
///
/// Folded so that the result is always >= 0.5: a marker that is lower in
/// cases discriminates just as well as one that is higher.
pub fn auc_from_u(case: &[f64], control: &[f64]) -> f64 {
    if case.is_empty() || control.is_empty() {
        return 0.5;
    }
    let u1 = match mann_whitney_u(case, control) {
        Ok(result) => result.statistic,
        Err(_) => return 0.5,
    };
    let auc = u1 / (case.len() * control.len()) as f64;
    auc.max(1.0 - auc)
}

/// Percent difference of the case mean relative to the control mean.
pub fn percent_difference(case_mean: f64, control_mean: f64) -> f64 {
    if control_mean == 0.0 {
        return 0.0;
    }
    (case_mean - control_mean) / control_mean * 100.0
}

/// Standardized difference over the root mean square of the two SDs.
///
/// Used for the risk-factor screen where groups are very unbalanced.
pub fn risk_factor_d(a: &[f64], b: &[f64]) -> f64 {
    let denom = ((std_dev(a, 1).powi(2) + std_dev(b, 1).powi(2)) / 2.0).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (mean(a) - mean(b)) / denom
}

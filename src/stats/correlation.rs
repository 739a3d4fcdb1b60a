//! Pearson correlation.

use super::descriptive::mean;
use super::distributions::t_two_sided_p;
use super::{StatsError, StatsResult};
use serde::Serialize;

/// Pearson correlation coefficient and its two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correlation {
    pub r: f64,
    pub p_value: f64,
    pub n: usize,
}

/// Pearson correlation of two equally long samples.
pub fn pearson(x: &[f64], y: &[f64]) -> StatsResult<Correlation> {
    if x.len() != y.len() {
        return Err(StatsError::InvalidInput(format!(
            "samples differ in length ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < 3 {
        return Err(StatsError::InsufficientData { needed: 3, got: n });
    }

    let (mx, my) = (mean(x), mean(y));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return Err(StatsError::Degenerate("constant input".to_string()));
    }

    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let p_value = if (1.0 - r.abs()) < 1e-15 {
        0.0
    } else {
        let t = r * ((n - 2) as f64 / (1.0 - r * r)).sqrt();
        t_two_sided_p(t, (n - 2) as f64)
    };

    Ok(Correlation { r, p_value, n })
}

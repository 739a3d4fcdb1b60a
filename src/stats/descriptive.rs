//! Descriptive statistics.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Arithmetic mean. NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Variance with `ddof` delta degrees of freedom.
pub fn variance(values: &[f64], ddof: usize) -> f64 {
    let n = values.len();
    if n <= ddof {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - ddof) as f64
}

/// Standard deviation with `ddof` delta degrees of freedom.
pub fn std_dev(values: &[f64], ddof: usize) -> f64 {
    variance(values, ddof).sqrt()
}

/// Quantile by linear interpolation between order statistics.
pub fn quantile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile_sorted(&sorted, p)
}

pub(crate) fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let p = p.clamp(0.0, 1.0);
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Five-number summary plus mean and sample SD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl Summary {
    /// Summarize a slice. Returns `None` when it is empty.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Some(Self {
            count: sorted.len(),
            mean: mean(&sorted),
            std: std_dev(&sorted, 1),
            min: sorted[0],
            q1: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            q3: quantile_sorted(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
        })
    }

    /// Interquartile range.
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Most frequent value. Ties go to the smallest value.
pub fn mode<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|(a_val, a_count), (b_val, b_count)| {
            a_count.cmp(b_count).then_with(|| b_val.cmp(a_val))
        })
        .map(|(v, _)| v.to_string())
}

/// Standardize values, multiplying by `direction` (+1 or -1).
///
/// Returns all zeros when the sample SD is zero or undefined.
pub fn zscore(values: &[f64], direction: f64) -> Vec<f64> {
    let m = mean(values);
    let sd = std_dev(values, 1);
    if !sd.is_finite() || sd == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - m) / sd * direction).collect()
}

/// Assign quartile labels 1..=4 using right-inclusive quantile edges.
///
/// The lowest value lands in quartile 1. Returns `None` if the edges are
/// not distinct, mirroring how equal-frequency binning refuses duplicate
/// edges.
pub fn quartile_bins(values: &[f64]) -> Option<Vec<u8>> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let edges: Vec<f64> = (0..=4)
        .map(|i| quantile_sorted(&sorted, i as f64 / 4.0))
        .collect();

    if edges.windows(2).any(|w| w[0] >= w[1]) {
        return None;
    }

    let bins = values
        .iter()
        .map(|v| {
            let mut bin = 1u8;
            for (i, edge) in edges.iter().enumerate().skip(1).take(3) {
                if *v > *edge {
                    bin = (i + 1) as u8;
                }
            }
            bin
        })
        .collect();

    Some(bins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_sd() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values) - 5.0).abs() < 1e-12);
        assert!((std_dev(&values, 0) - 2.0).abs() < 1e-12);
        assert!((std_dev(&values, 1) - 2.138_089_935_299_395).abs() < 1e-12);
        assert!(mean(&[]).is_nan());
        assert!(std_dev(&[1.0], 1).is_nan());
    }

    #[test]
    fn test_quantile_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile(&values, 0.25) - 1.75).abs() < 1e-12);
        assert!((quantile(&values, 0.5) - 2.5).abs() < 1e-12);
        assert!((quantile(&values, 1.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_summary() {
        let summary = Summary::from_values(&[5.0, 1.0, 3.0]).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 5.0);
        assert_eq!(summary.median, 3.0);
        assert!((summary.iqr() - 2.0).abs() < 1e-12);
        assert!(Summary::from_values(&[]).is_none());
    }

    #[test]
    fn test_mode_tie_breaks_to_smallest() {
        assert_eq!(mode(["N", "Y", "Y", "N"]), Some("N".to_string()));
        assert_eq!(mode(["Y", "Y", "N"]), Some("Y".to_string()));
        assert_eq!(mode(Vec::<&str>::new()), None);
    }

    #[test]
    fn test_zscore_direction() {
        let z = zscore(&[1.0, 2.0, 3.0], -1.0);
        assert!((z[0] - 1.0).abs() < 1e-12);
        assert!((z[2] + 1.0).abs() < 1e-12);
        assert_eq!(zscore(&[2.0, 2.0], 1.0), vec![0.0, 0.0]);
    }

    #[test]
    fn test_quartile_bins() {
        let values: Vec<f64> = (1..=8).map(f64::from).collect();
        let bins = quartile_bins(&values).unwrap();
        assert_eq!(bins, vec![1, 1, 2, 2, 3, 3, 4, 4]);
        assert!(quartile_bins(&[1.0, 1.0, 1.0, 1.0]).is_none());
    }
}

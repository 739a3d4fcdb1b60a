//! Hypothesis tests used by the group comparisons.

use super::descriptive::{mean, variance};
use super::distributions::{chi_square_sf, ln_gamma, normal_quantile, normal_sf, t_two_sided_p};
use super::{StatsError, StatsResult};
use serde::Serialize;

/// Outcome of a hypothesis test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
    pub df: Option<f64>,
    pub method: &'static str,
}

/// Variance assumption for the two-sample t-test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TTestKind {
    /// Pooled variance (equal variances assumed)
    Student,
    /// Welch–Satterthwaite (unequal variances)
    Welch,
}

/// Two-sample t-test of `a` against `b`.
pub fn t_test(a: &[f64], b: &[f64], kind: TTestKind) -> StatsResult<TestResult> {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return Err(StatsError::InsufficientData {
            needed: 2,
            got: n1.min(n2),
        });
    }

    let (m1, m2) = (mean(a), mean(b));
    let (v1, v2) = (variance(a, 1), variance(b, 1));
    let (n1f, n2f) = (n1 as f64, n2 as f64);

    let (se, df, method) = match kind {
        TTestKind::Student => {
            let pooled = ((n1f - 1.0) * v1 + (n2f - 1.0) * v2) / (n1f + n2f - 2.0);
            let se = (pooled * (1.0 / n1f + 1.0 / n2f)).sqrt();
            (se, n1f + n2f - 2.0, "Student t-test")
        }
        TTestKind::Welch => {
            let s1 = v1 / n1f;
            let s2 = v2 / n2f;
            let se = (s1 + s2).sqrt();
            let df = (s1 + s2).powi(2)
                / (s1.powi(2) / (n1f - 1.0) + s2.powi(2) / (n2f - 1.0));
            (se, df, "Welch t-test")
        }
    };

    if se == 0.0 {
        return Err(StatsError::Degenerate(
            "both samples have zero variance".to_string(),
        ));
    }

    let t = (m1 - m2) / se;
    Ok(TestResult {
        statistic: t,
        p_value: t_two_sided_p(t, df),
        df: Some(df),
        method,
    })
}

/// Average ranks (1-based) of the pooled values, plus the tie term sum(t^3 - t).
fn rank_with_ties(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            ranks[order[k]] = avg;
        }
        let t = (j - i + 1) as f64;
        tie_term += t.powi(3) - t;
        i = j + 1;
    }

    (ranks, tie_term)
}

/// Mann-Whitney U test, two-sided, normal approximation.
///
/// The statistic is U for the first sample. The p-value applies the tie
/// correction and a 0.5 continuity correction.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> StatsResult<TestResult> {
    let (n1, n2) = (a.len(), b.len());
    if n1 == 0 || n2 == 0 {
        return Err(StatsError::InsufficientData { needed: 1, got: 0 });
    }

    let pooled: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    let (ranks, tie_term) = rank_with_ties(&pooled);

    let (n1f, n2f) = (n1 as f64, n2 as f64);
    let n = n1f + n2f;
    let r1: f64 = ranks[..n1].iter().sum();
    let u1 = r1 - n1f * (n1f + 1.0) / 2.0;
    let u2 = n1f * n2f - u1;

    let mu = n1f * n2f / 2.0;
    let sigma = (n1f * n2f / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)))).sqrt();

    let p_value = if sigma > 0.0 {
        let z = (u1.max(u2) - mu - 0.5) / sigma;
        (2.0 * normal_sf(z)).min(1.0)
    } else {
        1.0
    };

    Ok(TestResult {
        statistic: u1,
        p_value,
        df: None,
        method: "Mann-Whitney",
    })
}

fn poly(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Shapiro-Wilk normality test (Royston's AS R94 approximation).
pub fn shapiro_wilk(values: &[f64]) -> StatsResult<TestResult> {
    let n = values.len();
    if n < 3 {
        return Err(StatsError::InsufficientData { needed: 3, got: n });
    }
    if n > 5000 {
        return Err(StatsError::InvalidInput(format!(
            "Shapiro-Wilk supports at most 5000 values, got {}",
            n
        )));
    }

    let mut x = values.to_vec();
    x.sort_by(|a, b| a.total_cmp(b));
    let range = x[n - 1] - x[0];
    if range < 1e-19 {
        return Err(StatsError::Degenerate("all values are identical".to_string()));
    }

    let an = n as f64;
    let half = n / 2;
    let mut a = vec![0.0; half];

    if n == 3 {
        a[0] = std::f64::consts::FRAC_1_SQRT_2;
    } else {
        const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
        const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];

        let m: Vec<f64> = (1..=half)
            .map(|i| normal_quantile((i as f64 - 0.375) / (an + 0.25)))
            .collect();
        let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
        let ssumm2 = summ2.sqrt();
        let rsn = 1.0 / an.sqrt();
        let a1 = poly(&C1, rsn) - m[0] / ssumm2;

        let (start, fac) = if n > 5 {
            let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
            let fac = ((summ2 - 2.0 * m[0].powi(2) - 2.0 * m[1].powi(2))
                / (1.0 - 2.0 * a1.powi(2) - 2.0 * a2.powi(2)))
            .sqrt();
            a[1] = a2;
            (2, fac)
        } else {
            let fac = ((summ2 - 2.0 * m[0].powi(2)) / (1.0 - 2.0 * a1.powi(2))).sqrt();
            (1, fac)
        };
        a[0] = a1;
        for i in start..half {
            a[i] = -m[i] / fac;
        }
    }

    // Antisymmetric coefficient vector over the order statistics.
    let mut coef = vec![0.0; n];
    for (i, ai) in a.iter().enumerate() {
        coef[i] = -ai;
        coef[n - 1 - i] = *ai;
    }

    let xm = mean(&x);
    let cm = mean(&coef);
    let mut sax = 0.0;
    let mut ssa = 0.0;
    let mut ssx = 0.0;
    for (xi, ci) in x.iter().zip(coef.iter()) {
        let dx = (xi - xm) / range;
        let dc = ci - cm;
        sax += dx * dc;
        ssa += dc * dc;
        ssx += dx * dx;
    }
    let w = (sax * sax / (ssa * ssx)).min(1.0);

    let p_value = if n == 3 {
        const PI6: f64 = 1.909_859_317_102_74;
        const STQR: f64 = 1.047_197_551_196_6;
        (PI6 * (w.sqrt().asin() - STQR)).max(0.0)
    } else {
        let w1 = (1.0 - w).ln();
        if n <= 11 {
            const C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
            const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
            let gamma = poly(&[-2.273, 0.459], an);
            if w1 >= gamma {
                1e-99
            } else {
                let y = -(gamma - w1).ln();
                let m = poly(&C3, an);
                let s = poly(&C4, an).exp();
                normal_sf((y - m) / s)
            }
        } else {
            const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
            const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
            let ln_n = an.ln();
            let m = poly(&C5, ln_n);
            let s = poly(&C6, ln_n).exp();
            normal_sf((w1 - m) / s)
        }
    };

    Ok(TestResult {
        statistic: w,
        p_value: p_value.clamp(0.0, 1.0),
        df: None,
        method: "Shapiro-Wilk",
    })
}

/// Pearson chi-square test of independence on an r x c table of counts.
///
/// Applies Yates' continuity correction when the table has one degree of
/// freedom.
pub fn chi_square_contingency(table: &[Vec<u64>]) -> StatsResult<TestResult> {
    let rows = table.len();
    let cols = table.first().map(|r| r.len()).unwrap_or(0);
    if rows < 2 || cols < 2 || table.iter().any(|r| r.len() != cols) {
        return Err(StatsError::InvalidInput(
            "contingency table must be at least 2x2 and rectangular".to_string(),
        ));
    }

    let row_sums: Vec<f64> = table.iter().map(|r| r.iter().sum::<u64>() as f64).collect();
    let col_sums: Vec<f64> = (0..cols)
        .map(|j| table.iter().map(|r| r[j]).sum::<u64>() as f64)
        .collect();
    let total: f64 = row_sums.iter().sum();

    if row_sums.iter().chain(col_sums.iter()).any(|s| *s == 0.0) {
        return Err(StatsError::Degenerate(
            "contingency table has an empty row or column".to_string(),
        ));
    }

    let dof = (rows - 1) * (cols - 1);
    let mut chi2 = 0.0;
    for (i, row) in table.iter().enumerate() {
        for (j, &obs) in row.iter().enumerate() {
            let expected = row_sums[i] * col_sums[j] / total;
            let mut observed = obs as f64;
            if dof == 1 {
                let diff = expected - observed;
                observed += diff.signum() * diff.abs().min(0.5);
            }
            chi2 += (observed - expected).powi(2) / expected;
        }
    }

    Ok(TestResult {
        statistic: chi2,
        p_value: chi_square_sf(chi2, dof as f64),
        df: Some(dof as f64),
        method: "Chi-Square",
    })
}

fn ln_choose(n: u64, k: u64) -> f64 {
    ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
}

/// Fisher's exact test on a 2x2 table, two-sided.
///
/// The statistic is the sample odds ratio (ad / bc).
pub fn fisher_exact_2x2(table: [[u64; 2]; 2]) -> StatsResult<TestResult> {
    let [[a, b], [c, d]] = table;
    let row1 = a + b;
    let col1 = a + c;
    let n = a + b + c + d;
    if n == 0 {
        return Err(StatsError::InsufficientData { needed: 1, got: 0 });
    }

    let ln_denom = ln_choose(n, row1);
    let pmf = |x: u64| (ln_choose(col1, x) + ln_choose(n - col1, row1 - x) - ln_denom).exp();

    let lo = row1.saturating_sub(n - col1);
    let hi = row1.min(col1);
    let p_obs = pmf(a);
    let p_value: f64 = (lo..=hi)
        .map(pmf)
        .filter(|p| *p <= p_obs * (1.0 + 1e-7))
        .sum();

    let odds_ratio = if a * d == 0 && b * c == 0 {
        f64::NAN
    } else if b * c == 0 {
        f64::INFINITY
    } else {
        (a * d) as f64 / (b * c) as f64
    };

    Ok(TestResult {
        statistic: odds_ratio,
        p_value: p_value.min(1.0),
        df: None,
        method: "Fisher Exact",
    })
}

/// Pick Fisher's exact test for sparse 2x2 tables and chi-square otherwise.
pub fn categorical_test(table: &[Vec<u64>]) -> StatsResult<TestResult> {
    let sparse = table.iter().flatten().any(|&count| count < 5);
    let is_2x2 = table.len() == 2 && table.iter().all(|r| r.len() == 2);

    if sparse && is_2x2 {
        fisher_exact_2x2([[table[0][0], table[0][1]], [table[1][0], table[1][1]]])
    } else if sparse {
        let mut result = chi_square_contingency(table)?;
        result.method = "Chi-Square (sparse)";
        Ok(result)
    } else {
        chi_square_contingency(table)
    }
}

/// Student t-test when `pooled` looks normal, Mann-Whitney otherwise.
///
/// `pooled` is the whole variable, which may include rows outside both arms.
pub fn continuous_test(a: &[f64], b: &[f64], pooled: &[f64]) -> StatsResult<TestResult> {
    let normal = match shapiro_wilk(pooled) {
        Ok(sw) => sw.p_value > 0.05,
        Err(_) => false,
    };

    if normal {
        let mut result = t_test(a, b, TTestKind::Student)?;
        result.method = "T-test";
        Ok(result)
    } else {
        mann_whitney_u(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: [f64; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];
    const B: [f64; 5] = [2.0, 4.0, 6.0, 8.0, 10.0];

    #[test]
    fn test_student_t() {
        let result = t_test(&A, &B, TTestKind::Student).unwrap();
        assert!((result.statistic + 3.0 / 2.5f64.sqrt()).abs() < 1e-10);
        assert_eq!(result.df, Some(8.0));
        assert!((result.p_value - 0.0944).abs() < 1e-3);
    }

    #[test]
    fn test_welch_t() {
        let result = t_test(&A, &B, TTestKind::Welch).unwrap();
        assert!((result.statistic + 1.897_366_596).abs() < 1e-6);
        assert!((result.df.unwrap() - 5.882_352_941).abs() < 1e-6);
        assert!(result.p_value > 0.0944 && result.p_value < 0.12);
    }

    #[test]
    fn test_t_test_requires_two_values() {
        let err = t_test(&[1.0], &B, TTestKind::Welch).unwrap_err();
        assert_eq!(err, StatsError::InsufficientData { needed: 2, got: 1 });
    }

    #[test]
    fn test_mann_whitney_separated_samples() {
        let result = mann_whitney_u(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(result.statistic, 0.0);
        // z = (9 - 4.5 - 0.5) / sqrt(5.25)
        let expected = 2.0 * normal_sf(4.0 / 5.25f64.sqrt());
        assert!((result.p_value - expected).abs() < 1e-12);
    }

    #[test]
    fn test_mann_whitney_ties() {
        let (ranks, tie_term) = rank_with_ties(&[1.0, 2.0, 2.0, 3.0]);
        assert_eq!(ranks, vec![1.0, 2.5, 2.5, 4.0]);
        assert_eq!(tie_term, 6.0);
    }

    #[test]
    fn test_shapiro_three_points() {
        let result = shapiro_wilk(&[1.0, 2.0, 3.0]).unwrap();
        assert!((result.statistic - 1.0).abs() < 1e-9);
        assert!((result.p_value - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_shapiro_detects_skew() {
        let skewed = [
            148.0, 154.0, 158.0, 160.0, 161.0, 162.0, 166.0, 170.0, 182.0, 195.0, 236.0,
        ];
        let result = shapiro_wilk(&skewed).unwrap();
        assert!(result.statistic < 0.85);
        assert!(result.p_value < 0.05);

        let mut outlier = vec![1.0; 19];
        for (i, v) in outlier.iter_mut().enumerate() {
            *v += i as f64 * 0.01;
        }
        outlier.push(50.0);
        assert!(shapiro_wilk(&outlier).unwrap().p_value < 0.001);
    }

    #[test]
    fn test_shapiro_accepts_symmetric_sample() {
        let values: Vec<f64> = (1..=30)
            .map(|i| normal_quantile((i as f64 - 0.5) / 30.0))
            .collect();
        let result = shapiro_wilk(&values).unwrap();
        assert!(result.statistic > 0.95);
        assert!(result.p_value > 0.5);
    }

    #[test]
    fn test_shapiro_degenerate() {
        assert!(matches!(
            shapiro_wilk(&[2.0, 2.0, 2.0, 2.0]),
            Err(StatsError::Degenerate(_))
        ));
        assert!(shapiro_wilk(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_chi_square_with_yates() {
        let table = vec![vec![10, 20], vec![20, 10]];
        let result = chi_square_contingency(&table).unwrap();
        assert!((result.statistic - 5.4).abs() < 1e-10);
        assert_eq!(result.df, Some(1.0));
        assert!((result.p_value - 0.020_136).abs() < 1e-5);
    }

    #[test]
    fn test_chi_square_3x2_no_correction() {
        let table = vec![vec![10, 10], vec![10, 10], vec![10, 10]];
        let result = chi_square_contingency(&table).unwrap();
        assert!(result.statistic.abs() < 1e-12);
        assert!((result.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fisher_exact() {
        let result = fisher_exact_2x2([[8, 2], [1, 5]]).unwrap();
        assert!((result.p_value - 280.0 / 8008.0).abs() < 1e-9);
        assert!((result.statistic - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_categorical_test_selection() {
        let sparse = vec![vec![8, 2], vec![1, 5]];
        assert_eq!(categorical_test(&sparse).unwrap().method, "Fisher Exact");

        let dense = vec![vec![10, 20], vec![20, 10]];
        assert_eq!(categorical_test(&dense).unwrap().method, "Chi-Square");

        let sparse_3x2 = vec![vec![8, 2], vec![1, 5], vec![6, 6]];
        assert_eq!(
            categorical_test(&sparse_3x2).unwrap().method,
            "Chi-Square (sparse)"
        );
    }

    #[test]
    fn test_fisher_odds_ratio_undefined_for_empty_row() {
        let result = fisher_exact_2x2([[0, 0], [3, 4]]).unwrap();
        assert!(result.statistic.is_nan());
        assert!((result.p_value - 1.0).abs() < 1e-9);
        assert!(fisher_exact_2x2([[2, 0], [3, 4]]).unwrap().statistic.is_infinite());
    }

    #[test]
    fn test_continuous_test_checks_normality_on_pooled_values() {
        // Arms look normal but the full column carries outliers from other rows
        let pooled = [1.0, 2.0, 2.0, 3.0, 4.0, 4.0, 5.0, 6.0, 8.0, 10.0, 250.0, 400.0];
        assert_eq!(continuous_test(&A, &B, &pooled).unwrap().method, "Mann-Whitney");
    }

    #[test]
    fn test_continuous_test_uses_t_for_normal_data() {
        let pooled: Vec<f64> = A.iter().chain(B.iter()).copied().collect();
        let result = continuous_test(&A, &B, &pooled).unwrap();
        assert_eq!(result.method, "T-test");

        let skewed_a = [1.0, 1.0, 1.1, 1.0, 1.2, 40.0];
        let skewed_b = [2.0, 2.1, 2.0, 2.2, 2.0, 90.0];
        let pooled: Vec<f64> = skewed_a.iter().chain(skewed_b.iter()).copied().collect();
        assert_eq!(
            continuous_test(&skewed_a, &skewed_b, &pooled).unwrap().method,
            "Mann-Whitney"
        );
    }
}

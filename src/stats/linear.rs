//! Ordinary least squares regression.

use super::distributions::{f_sf, t_two_sided_p};
use super::linalg::{invert, with_intercept};
use super::{StatsError, StatsResult};
use ndarray::{Array1, Array2};
use serde::Serialize;

/// A fitted OLS model. Coefficient vectors start with the intercept.
#[derive(Debug, Clone, Serialize)]
pub struct OlsFit {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub t_values: Vec<f64>,
    pub p_values: Vec<f64>,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    pub df_resid: usize,
    pub n: usize,
    #[serde(skip)]
    pub fitted: Vec<f64>,
    #[serde(skip)]
    pub residuals: Vec<f64>,
}

/// Fit `y ~ 1 + x` by least squares.
pub fn ols(x: &Array2<f64>, y: &Array1<f64>) -> StatsResult<OlsFit> {
    let n = x.nrows();
    if y.len() != n {
        return Err(StatsError::InvalidInput(format!(
            "design has {} rows but outcome has {}",
            n,
            y.len()
        )));
    }

    let design = with_intercept(x);
    let k = design.ncols();
    if n <= k {
        return Err(StatsError::InsufficientData {
            needed: k + 1,
            got: n,
        });
    }

    let xtx_inv = invert(&design.t().dot(&design))?;
    let beta = xtx_inv.dot(&design.t().dot(y));
    let fitted = design.dot(&beta);
    let residuals = y - &fitted;

    let df_resid = n - k;
    let sse: f64 = residuals.iter().map(|r| r * r).sum();
    let y_mean = y.mean().unwrap_or(0.0);
    let sst: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let sigma2 = sse / df_resid as f64;

    let std_errors: Vec<f64> = xtx_inv.diag().iter().map(|v| (v * sigma2).sqrt()).collect();
    let coefficients = beta.to_vec();
    let t_values: Vec<f64> = coefficients
        .iter()
        .zip(&std_errors)
        .map(|(b, se)| if *se > 0.0 { b / se } else { f64::INFINITY })
        .collect();
    let p_values = t_values
        .iter()
        .map(|t| t_two_sided_p(t.abs(), df_resid as f64))
        .collect();

    let r_squared = if sst > 0.0 { 1.0 - sse / sst } else { 0.0 };
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df_resid as f64;

    let df_model = (k - 1) as f64;
    let (f_statistic, f_p_value) = if df_model > 0.0 && sse > 0.0 {
        let f = ((sst - sse) / df_model) / sigma2;
        (f, f_sf(f, df_model, df_resid as f64))
    } else {
        (f64::NAN, f64::NAN)
    };

    Ok(OlsFit {
        coefficients,
        std_errors,
        t_values,
        p_values,
        r_squared,
        adj_r_squared,
        f_statistic,
        f_p_value,
        df_resid,
        n,
        fitted: fitted.to_vec(),
        residuals: residuals.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    #[test]
    fn test_simple_regression() {
        let x = Array::from_shape_vec((5, 1), vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let y = Array1::from(vec![2.1, 3.9, 6.2, 7.8, 10.1]);
        let fit = ols(&x, &y).unwrap();

        assert!((fit.coefficients[0] - 0.05).abs() < 1e-9);
        assert!((fit.coefficients[1] - 1.99).abs() < 1e-9);
        assert!(fit.r_squared > 0.99);
        assert!(fit.p_values[1] < 0.001);
        assert_eq!(fit.df_resid, 3);
        // With one predictor F equals t squared
        assert!((fit.f_statistic - fit.t_values[1].powi(2)).abs() < 1e-6);
        assert!((fit.residuals.iter().sum::<f64>()).abs() < 1e-9);
    }

    #[test]
    fn test_ols_too_few_rows() {
        let x = Array::from_shape_vec((2, 1), vec![1.0, 2.0]).unwrap();
        let y = Array1::from(vec![1.0, 2.0]);
        assert!(matches!(
            ols(&x, &y),
            Err(StatsError::InsufficientData { .. })
        ));
    }
}

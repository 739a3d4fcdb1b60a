//! Clinical versus structural discrimination models.

use super::{AnalysisError, AnalysisResult};
use crate::cohort::{CohortTable, GroupSpec};
use crate::config::Config;
use crate::models::ResultTable;
use crate::stats::linalg::design_matrix;
use crate::stats::{auc_trapezoid, mean, roc_curve, zscore, LogisticRegression};
use ndarray::Array1;
use serde::Serialize;

/// Fewer rows than this and the models are not fitted.
const MIN_ROWS: usize = 10;

/// One fitted discrimination model.
#[derive(Debug, Clone, Serialize)]
pub struct RocModel {
    pub name: String,
    pub predictors: Vec<String>,
    pub points: Vec<(f64, f64)>,
    pub auc: f64,
}

/// Clinical and structural models fitted on the same rows.
#[derive(Debug, Clone, Serialize)]
pub struct RocComparison {
    pub clinical: RocModel,
    pub structural: RocModel,
    pub n: usize,
}

impl RocComparison {
    /// Summary table of both models.
    pub fn to_table(&self, cohort: &str) -> ResultTable {
        let mut table = ResultTable::new(
            format!("Diagnostic Performance ({}, n={})", cohort, self.n),
            &["Model", "Predictors", "AUC"],
        );
        for model in [&self.clinical, &self.structural] {
            table.push_row(vec![
                model.name.clone(),
                model.predictors.join(", "),
                format!("{:.2}", model.auc),
            ]);
        }
        table.push_note("In-sample ROC of logistic models on standardized predictors.");
        table
    }
}

/// Values of `column` on the selected rows, with gaps filled by the mean.
fn mean_filled(table: &CohortTable, column: &str, rows: &[usize]) -> AnalysisResult<Vec<f64>> {
    let values = table.numeric(column)?;
    let selected: Vec<Option<f64>> = rows.iter().map(|&i| values[i]).collect();
    let present: Vec<f64> = selected.iter().flatten().copied().collect();
    if present.is_empty() {
        return Err(AnalysisError::Skipped(format!("{} has no values", column)));
    }
    let fill = mean(&present);
    Ok(selected.into_iter().map(|v| v.unwrap_or(fill)).collect())
}

fn fit_model(
    table: &CohortTable,
    config: &Config,
    name: &str,
    predictors: &[String],
    rows: &[usize],
    y: &[f64],
) -> AnalysisResult<RocModel> {
    let columns = predictors
        .iter()
        .map(|p| Ok(zscore(&mean_filled(table, p, rows)?, 1.0)))
        .collect::<AnalysisResult<Vec<_>>>()?;
    let x = design_matrix(&columns)?;

    let fit = LogisticRegression::new()
        .max_iter(config.analysis.logit_max_iter)
        .tol(config.analysis.logit_tol)
        .fit(&x, &Array1::from(y.to_vec()))?;
    let scores = fit.predict_proba(&x);
    let labels: Vec<bool> = y.iter().map(|v| *v == 1.0).collect();
    let points = roc_curve(&labels, &scores);
    let auc = auc_trapezoid(&points);

    Ok(RocModel {
        name: name.to_string(),
        predictors: predictors.to_vec(),
        points,
        auc,
    })
}

/// Fit the clinical and structural models on every row with a known arm.
pub fn roc_models(table: &CohortTable, config: &Config) -> AnalysisResult<RocComparison> {
    let spec = GroupSpec::from(&config.groups);
    let target = spec.target(table)?;
    let rows: Vec<usize> = target
        .iter()
        .enumerate()
        .filter_map(|(i, t)| t.map(|_| i))
        .collect();
    let y: Vec<f64> = target.into_iter().flatten().collect();

    let cases = y.iter().filter(|v| **v == 1.0).count();
    if y.len() <= MIN_ROWS || cases == 0 || cases == y.len() {
        return Err(AnalysisError::Skipped(format!(
            "insufficient data for ROC ({} rows, {} cases)",
            y.len(),
            cases
        )));
    }

    let clinical = fit_model(
        table,
        config,
        "Clinical Model",
        &config.analysis.clinical_model,
        &rows,
        &y,
    )?;
    let structural = fit_model(
        table,
        config,
        "Structural Model",
        &config.analysis.structural_model,
        &rows,
        &y,
    )?;

    Ok(RocComparison {
        clinical,
        structural,
        n: y.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::sample_cohort;

    #[test]
    fn test_roc_models() {
        let comparison = roc_models(&sample_cohort(), &Config::default()).unwrap();
        assert_eq!(comparison.n, 56);

        for model in [&comparison.clinical, &comparison.structural] {
            assert_eq!(model.points.first(), Some(&(0.0, 0.0)));
            let last = model.points.last().unwrap();
            assert!((last.0 - 1.0).abs() < 1e-12 && (last.1 - 1.0).abs() < 1e-12);
            assert!(model.auc > 0.5 && model.auc <= 1.0);
        }
        assert_eq!(comparison.structural.predictors.len(), 4);
    }

    #[test]
    fn test_roc_requires_rows() {
        let csv = "GROUP,AGE,BMI,NECK_TSCORE\nGroup A,70,25,-2\nGroup B,60,26,-1\n";
        let table = CohortTable::from_reader(csv.as_bytes()).unwrap();
        let err = roc_models(&table, &Config::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Skipped(_)));
    }

    #[test]
    fn test_roc_table() {
        let comparison = roc_models(&sample_cohort(), &Config::default()).unwrap();
        let table = comparison.to_table("sample");
        assert_eq!(table.rows[0][0], "Clinical Model");
        assert_eq!(table.rows[1][1], "AGE, BMI, RADIUS_TB.N, RADIUS_ttvBMD");
        assert_eq!(table.title, "Diagnostic Performance (sample, n=56)");
    }
}

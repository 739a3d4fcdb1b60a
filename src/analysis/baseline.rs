//! Baseline characteristics: categorical tests, normality-aware continuous
//! tests and age/BMI-adjusted odds ratios.

use super::aggregator::{complete_cases, crosstab};
use super::odds::first_odds_ratio;
use super::AnalysisResult;
use crate::cohort::{CohortTable, GroupSpec};
use crate::config::Config;
use crate::models::ResultTable;
use crate::report::format_or;
use crate::stats::{categorical_test, continuous_test, mean, std_dev, zscore};
use tracing::{debug, warn};

/// Chi-square or Fisher test of each categorical variable against the arm.
pub fn categorical_table(
    table: &CohortTable,
    config: &Config,
    cohort: &str,
) -> AnalysisResult<ResultTable> {
    let spec = GroupSpec::from(&config.groups);
    let mut result = ResultTable::new(
        format!("Categorical Baseline Characteristics ({})", cohort),
        &["Variable", "P_Value", "Test"],
    );

    for variable in &config.analysis.categorical {
        if table.column_index(variable).is_none() {
            debug!("Column '{}' not found, skipping", variable);
            continue;
        }
        let tab = crosstab(table, variable, &spec)?;
        if !tab.is_testable() {
            warn!("'{}' has a single category or arm, skipping", variable);
            continue;
        }
        match categorical_test(&tab.counts) {
            Ok(test) => result.push_row(vec![
                variable.clone(),
                format!("{:.4}", test.p_value),
                test.method.to_string(),
            ]),
            Err(e) => warn!("Categorical test failed for '{}': {}", variable, e),
        }
    }

    Ok(result)
}

/// Normality-aware comparison of each continuous variable.
pub fn continuous_table(
    table: &CohortTable,
    config: &Config,
    cohort: &str,
) -> AnalysisResult<ResultTable> {
    let spec = GroupSpec::from(&config.groups);
    let mut result = ResultTable::new(
        format!("Continuous Baseline Characteristics ({})", cohort),
        &[
            "Variable", "P_Value", "Test", "Mean_Fx", "SD_Fx", "Mean_Ctl", "SD_Ctl",
        ],
    );

    for variable in &config.analysis.continuous {
        if table.column_index(variable).is_none() {
            debug!("Column '{}' not found, skipping", variable);
            continue;
        }
        let absolute = config.is_absolute(variable);
        let (cases, controls) = spec.split_numeric(table, variable, absolute)?;
        let pooled: Vec<f64> = table
            .numeric(variable)?
            .into_iter()
            .flatten()
            .map(|v| if absolute { v.abs() } else { v })
            .collect();
        match continuous_test(&cases, &controls, &pooled) {
            Ok(test) => result.push_row(vec![
                variable.clone(),
                format!("{:.4}", test.p_value),
                test.method.to_string(),
                format!("{:.3}", mean(&cases)),
                format!("{:.3}", std_dev(&cases, 1)),
                format!("{:.3}", mean(&controls)),
                format!("{:.3}", std_dev(&controls, 1)),
            ]),
            Err(e) => warn!("Continuous test failed for '{}': {}", variable, e),
        }
    }

    Ok(result)
}

/// Odds ratio per SD decrease of each continuous variable, adjusted for
/// the baseline covariates. The covariates themselves are not modelled.
pub fn logistic_table(
    table: &CohortTable,
    config: &Config,
    cohort: &str,
) -> AnalysisResult<ResultTable> {
    let spec = GroupSpec::from(&config.groups);
    let target = spec.target(table)?;
    let covariates = &config.analysis.baseline_covariates;

    let mut result = ResultTable::new(
        format!("Adjusted Odds Ratios ({})", cohort),
        &["Variable", "aOR (per SD decrease)", "P_Value", "N"],
    );

    for variable in &config.analysis.continuous {
        if covariates.contains(variable) || table.column_index(variable).is_none() {
            continue;
        }

        let mut columns: Vec<&str> = vec![variable.as_str()];
        columns.extend(covariates.iter().map(String::as_str));
        let (mut data, y) = match complete_cases(table, &columns, &target) {
            Ok(cases) => cases,
            Err(e) => {
                warn!("Skipping '{}' in adjusted model: {}", variable, e);
                continue;
            }
        };
        if config.is_absolute(variable) {
            data[0].iter_mut().for_each(|v| *v = v.abs());
        }
        data[0] = zscore(&data[0], -1.0);
        let n = y.len();

        match first_odds_ratio(config, &data, y) {
            Ok(or) => result.push_row(vec![
                variable.clone(),
                format_or(&or),
                format!("{:.4}", or.p_value),
                n.to_string(),
            ]),
            Err(e) => warn!("Logistic model failed for '{}': {}", variable, e),
        }
    }

    result.push_note(format!("Adjusted for {}.", covariates.join(", ")));
    Ok(result)
}

/// All three baseline tables, keyed by output file stem.
pub fn baseline_tables(
    table: &CohortTable,
    config: &Config,
    cohort: &str,
) -> AnalysisResult<Vec<(String, ResultTable)>> {
    Ok(vec![
        (
            format!("categorical_{}", cohort),
            categorical_table(table, config, cohort)?,
        ),
        (
            format!("continuous_{}", cohort),
            continuous_table(table, config, cohort)?,
        ),
        (
            format!("logistic_OR_{}", cohort),
            logistic_table(table, config, cohort)?,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::sample_cohort;

    #[test]
    fn test_categorical_table() {
        let result = categorical_table(&sample_cohort(), &Config::default(), "sample").unwrap();
        let variables: Vec<&str> = result.rows.iter().map(|r| r[0].as_str()).collect();
        // Glucocorticoid therapy occurs in cases only, so both arms are
        // present but a cell is sparse
        assert_eq!(
            variables,
            vec![
                "CURRENT SMOKING",
                "GLUCOTICOID THERAPY",
                "TYPE 2 DM",
                "RA",
                "SECONDARY OSTEOPOROSIS"
            ]
        );
        assert_eq!(result.get(1, "Test"), Some("Fisher Exact"));
        assert_eq!(result.get(0, "Test"), Some("Chi-Square"));
    }

    #[test]
    fn test_continuous_table() {
        let result = continuous_table(&sample_cohort(), &Config::default(), "sample").unwrap();
        assert_eq!(result.rows.len(), 11);
        assert_eq!(result.get(0, "Variable"), Some("AGE"));
        assert_eq!(result.get(0, "Mean_Fx"), Some("70.875"));
        assert_eq!(result.get(0, "Mean_Ctl"), Some("65.531"));
        let test = result.get(0, "Test").unwrap();
        assert!(test == "T-test" || test == "Mann-Whitney");
    }

    #[test]
    fn test_logistic_table_skips_covariates() {
        let result = logistic_table(&sample_cohort(), &Config::default(), "sample").unwrap();
        assert!(result.rows.iter().all(|r| r[0] != "AGE" && r[0] != "BMI"));
        assert_eq!(result.rows.len(), 9);
        assert_eq!(result.notes, vec!["Adjusted for AGE, BMI."]);
    }

    #[test]
    fn test_logistic_table_skips_when_covariate_missing() {
        let mut config = Config::default();
        config
            .analysis
            .baseline_covariates
            .push("WEIGHT_NOT_PRESENT".to_string());
        let result = logistic_table(&sample_cohort(), &config, "sample").unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.notes, vec!["Adjusted for AGE, BMI, WEIGHT_NOT_PRESENT."]);
    }

    #[test]
    fn test_baseline_stems() {
        let tables = baseline_tables(&sample_cohort(), &Config::default(), "total").unwrap();
        let stems: Vec<&str> = tables.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(stems, vec!["categorical_total", "continuous_total", "logistic_OR_total"]);
    }
}

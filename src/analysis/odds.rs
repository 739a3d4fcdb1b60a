//! Adjusted odds ratios for bone parameters.
//!
//! Three flavours share one fitting path:
//! - per SD change, adjusted for the configured covariates;
//! - per SD change, adjusted for the FRAX score alone;
//! - per quartile decrease, adjusted for the configured covariates.

use super::aggregator::complete_cases;
use super::{AnalysisError, AnalysisResult};
use crate::cohort::{CohortTable, GroupSpec};
use crate::config::Config;
use crate::models::ResultTable;
use crate::report::figures::ForestRow;
use crate::report::{format_or, format_p};
use crate::stats::linalg::design_matrix;
use crate::stats::{quartile_bins, zscore, LogisticRegression, OddsRatio, StatsError};
use ndarray::Array1;
use serde::Serialize;
use tracing::{debug, warn};

/// Which odds ratio model to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OddsMode {
    /// Per SD change, adjusted for the configured covariates
    PerSd,
    /// Per SD change, adjusted for the FRAX score only
    Frax,
    /// Per quartile decrease, adjusted for the configured covariates
    Quartile,
}

impl OddsMode {
    /// Output file stem for a cohort.
    pub fn stem(&self, cohort: &str) -> String {
        match self {
            OddsMode::PerSd => format!("multivariable_OR_{}", cohort),
            OddsMode::Frax => format!("frax_adjusted_{}", cohort),
            OddsMode::Quartile => format!("quartile_OR_{}", cohort),
        }
    }

    fn title(&self, cohort: &str) -> String {
        match self {
            OddsMode::PerSd => format!("Adjusted Odds Ratios per SD ({})", cohort),
            OddsMode::Frax => format!("FRAX-Adjusted Odds Ratios per SD ({})", cohort),
            OddsMode::Quartile => format!("Odds Ratios per Quartile Decrease ({})", cohort),
        }
    }

    fn columns(&self) -> [&'static str; 5] {
        match self {
            OddsMode::PerSd => ["Parameter", "aOR", "P", "N", "Direction"],
            OddsMode::Frax => ["Variable", "aOR_FRAX_Adjusted", "P_Value", "N", "Direction"],
            OddsMode::Quartile => ["Parameter", "aOR", "P", "N", "Direction"],
        }
    }

    fn covariates(&self, config: &Config) -> Vec<String> {
        match self {
            OddsMode::Frax => vec![config.analysis.frax_column.clone()],
            _ => config.analysis.covariates.clone(),
        }
    }
}

/// One fitted odds ratio.
#[derive(Debug, Clone, Serialize)]
pub struct OddsEstimate {
    pub parameter: String,
    pub odds_ratio: OddsRatio,
    pub n: usize,
    pub direction: &'static str,
}

/// Fit the odds ratio of `parameter` for the case arm.
pub fn adjusted_or(
    table: &CohortTable,
    config: &Config,
    parameter: &str,
    mode: OddsMode,
) -> AnalysisResult<OddsEstimate> {
    let spec = GroupSpec::from(&config.groups);
    let target = spec.target(table)?;
    fit_parameter(table, config, &target, parameter, mode)
}

fn fit_parameter(
    table: &CohortTable,
    config: &Config,
    target: &[Option<f64>],
    parameter: &str,
    mode: OddsMode,
) -> AnalysisResult<OddsEstimate> {
    let column = table
        .resolve_column(parameter)
        .ok_or_else(|| AnalysisError::Skipped(format!("column not found: {}", parameter)))?
        .to_string();

    let covariates = mode.covariates(config);
    let mut columns: Vec<&str> = vec![column.as_str()];
    columns.extend(covariates.iter().map(String::as_str));

    let (mut data, y) = complete_cases(table, &columns, target)?;
    if data[0].is_empty() {
        return Err(StatsError::InsufficientData { needed: 1, got: 0 }.into());
    }
    if config.is_absolute(&column) {
        data[0].iter_mut().for_each(|v| *v = v.abs());
    }

    let (predictor, direction) = match mode {
        OddsMode::Quartile => {
            let bins = quartile_bins(&data[0]).ok_or_else(|| {
                StatsError::Degenerate(format!("quartile edges of {} are not distinct", column))
            })?;
            let inverted = bins.iter().map(|q| 5.0 - f64::from(*q)).collect();
            (inverted, "per quartile decrease")
        }
        _ => {
            let sign = config.direction(&column);
            let label = if sign > 0.0 {
                "per SD increase"
            } else {
                "per SD decrease"
            };
            (zscore(&data[0], sign), label)
        }
    };
    data[0] = predictor;

    let n = y.len();
    let odds_ratio = first_odds_ratio(config, &data, y)?;
    debug!("{}: OR {} (n={})", column, odds_ratio, n);

    Ok(OddsEstimate {
        parameter: column,
        odds_ratio,
        n,
        direction,
    })
}

/// Fit a logit on the given columns and return the odds ratio of the first.
pub(crate) fn first_odds_ratio(
    config: &Config,
    columns: &[Vec<f64>],
    y: Vec<f64>,
) -> AnalysisResult<OddsRatio> {
    let x = design_matrix(columns)?;
    let fit = LogisticRegression::new()
        .max_iter(config.analysis.logit_max_iter)
        .tol(config.analysis.logit_tol)
        .fit(&x, &Array1::from(y))?;
    fit.odds_ratio(0)
        .ok_or_else(|| AnalysisError::Skipped("model has no predictor".to_string()))
}

/// Odds ratio table over the configured parameters. Parameters that fail
/// to fit are logged and left out.
pub fn odds_table(
    table: &CohortTable,
    config: &Config,
    cohort: &str,
    mode: OddsMode,
) -> AnalysisResult<ResultTable> {
    let spec = GroupSpec::from(&config.groups);
    let target = spec.target(table)?;

    let mut result = ResultTable::new(mode.title(cohort), &mode.columns());
    for parameter in &config.analysis.or_parameters {
        match fit_parameter(table, config, &target, parameter, mode) {
            Ok(estimate) => result.push_row(vec![
                estimate.parameter,
                format_or(&estimate.odds_ratio),
                format_p(estimate.odds_ratio.p_value),
                estimate.n.to_string(),
                estimate.direction.to_string(),
            ]),
            Err(e) => warn!("Skipping {} in {}: {}", parameter, cohort, e),
        }
    }

    let adjusters = mode.covariates(config).join(", ");
    result.push_note(format!("Adjusted for {}.", adjusters));
    Ok(result)
}

/// Per-quartile odds ratios for the paired radius/tibia parameters.
///
/// A parameter is kept only when both sites fit.
pub fn forest_rows(table: &CohortTable, config: &Config) -> AnalysisResult<Vec<ForestRow>> {
    let spec = GroupSpec::from(&config.groups);
    let target = spec.target(table)?;

    let mut rows = Vec::new();
    for pair in &config.analysis.forest_parameters {
        let radius = fit_parameter(table, config, &target, &pair.radius, OddsMode::Quartile);
        let tibia = fit_parameter(table, config, &target, &pair.tibia, OddsMode::Quartile);
        match (radius, tibia) {
            (Ok(radius), Ok(tibia)) => rows.push(ForestRow {
                label: pair.label.clone(),
                radius: radius.odds_ratio,
                tibia: tibia.odds_ratio,
            }),
            (Err(e), _) | (_, Err(e)) => warn!("Skipping {} in forest plot: {}", pair.label, e),
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::sample_cohort;

    #[test]
    fn test_stems() {
        assert_eq!(OddsMode::PerSd.stem("total"), "multivariable_OR_total");
        assert_eq!(OddsMode::Frax.stem("osteo_dm"), "frax_adjusted_osteo_dm");
        assert_eq!(OddsMode::Quartile.stem("total"), "quartile_OR_total");
    }

    #[test]
    fn test_per_sd_decrease_of_trabecular_number() {
        let table = sample_cohort();
        let config = Config::default();
        let estimate = adjusted_or(&table, &config, "RADIUS_TB.N", OddsMode::PerSd).unwrap();

        // Fracture cases have fewer trabeculae, so risk rises per SD decrease
        assert_eq!(estimate.direction, "per SD decrease");
        assert_eq!(estimate.n, 53);
        assert!(estimate.odds_ratio.estimate > 1.0);
        assert!(estimate.odds_ratio.lower < estimate.odds_ratio.estimate);
        assert!(estimate.odds_ratio.upper > estimate.odds_ratio.estimate);
    }

    #[test]
    fn test_porosity_is_per_sd_increase() {
        let table = sample_cohort();
        let estimate =
            adjusted_or(&table, &Config::default(), "RADIUS_CT.PO", OddsMode::PerSd).unwrap();
        assert_eq!(estimate.direction, "per SD increase");
        assert!(estimate.odds_ratio.estimate > 1.0);
    }

    #[test]
    fn test_frax_mode_uses_single_adjuster() {
        let table = sample_cohort();
        let estimate =
            adjusted_or(&table, &Config::default(), "RADIUS_TB.N", OddsMode::Frax).unwrap();
        // One row lacks TB.N and one has FRAX = NA
        assert_eq!(estimate.n, 54);
    }

    #[test]
    fn test_quartile_mode() {
        let table = sample_cohort();
        let estimate =
            adjusted_or(&table, &Config::default(), "RADIUS_TB.N", OddsMode::Quartile).unwrap();
        assert_eq!(estimate.direction, "per quartile decrease");
        assert!(estimate.odds_ratio.estimate > 1.0);
    }

    #[test]
    fn test_missing_parameter_is_skipped() {
        let table = sample_cohort();
        let err = adjusted_or(&table, &Config::default(), "NO_SUCH", OddsMode::PerSd).unwrap_err();
        assert!(matches!(err, AnalysisError::Skipped(_)));
    }

    #[test]
    fn test_odds_table() {
        let table = sample_cohort();
        let result = odds_table(&table, &Config::default(), "sample", OddsMode::PerSd).unwrap();
        assert_eq!(result.columns, vec!["Parameter", "aOR", "P", "N", "Direction"]);
        assert_eq!(result.rows.len(), 8);
        assert_eq!(result.notes, vec!["Adjusted for AGE, BMI, HT_BMD."]);
    }

    #[test]
    fn test_forest_rows() {
        let table = sample_cohort();
        let rows = forest_rows(&table, &Config::default()).unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].label, "Total vBMD");
    }
}

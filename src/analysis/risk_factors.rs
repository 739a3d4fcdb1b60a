//! Effect of categorical clinical risk factors on bone outcomes.

use super::AnalysisResult;
use crate::cohort::CohortTable;
use crate::config::Config;
use crate::models::ResultTable;
use crate::report::format_p;
use crate::stats::{mean, risk_factor_d, t_test, TTestKind};
use serde::Serialize;
use tracing::{debug, warn};

/// One factor/outcome comparison of "Y" against "N" rows.
#[derive(Debug, Clone, Serialize)]
pub struct RiskFinding {
    pub factor: String,
    pub outcome: String,
    pub n_present: usize,
    pub n_absent: usize,
    pub mean_present: f64,
    pub mean_absent: f64,
    pub p_value: f64,
    pub d: f64,
}

impl RiskFinding {
    pub fn is_significant(&self) -> bool {
        self.p_value < 0.05
    }
}

fn flag(value: &str) -> Option<bool> {
    match value.trim().to_uppercase().as_str() {
        "Y" => Some(true),
        "N" => Some(false),
        _ => None,
    }
}

/// Screen every configured factor with enough "Y" rows against every outcome.
pub fn screen_risk_factors(
    table: &CohortTable,
    config: &Config,
) -> AnalysisResult<Vec<RiskFinding>> {
    let analysis = &config.analysis;
    let mut findings = Vec::new();

    for factor in &analysis.risk_factors {
        if table.column_index(factor).is_none() {
            debug!("Risk factor '{}' not found, skipping", factor);
            continue;
        }
        let flags: Vec<Option<bool>> = table.text(factor)?.iter().map(|v| flag(v)).collect();
        let present = flags.iter().filter(|f| **f == Some(true)).count();
        if present < analysis.risk_min_group {
            debug!("Only {} '{}' rows with Y, skipping", present, factor);
            continue;
        }

        for outcome in &analysis.risk_outcomes {
            if table.column_index(outcome).is_none() {
                continue;
            }
            let values = table.numeric(outcome)?;
            let mut yes = Vec::new();
            let mut no = Vec::new();
            for (f, v) in flags.iter().zip(values) {
                match (f, v) {
                    (Some(true), Some(v)) => yes.push(v),
                    (Some(false), Some(v)) => no.push(v),
                    _ => {}
                }
            }

            match t_test(&yes, &no, TTestKind::Student) {
                Ok(test) => findings.push(RiskFinding {
                    factor: factor.clone(),
                    outcome: outcome.clone(),
                    n_present: yes.len(),
                    n_absent: no.len(),
                    mean_present: mean(&yes),
                    mean_absent: mean(&no),
                    p_value: test.p_value,
                    d: risk_factor_d(&yes, &no),
                }),
                Err(e) => warn!("t-test failed for {} on {}: {}", factor, outcome, e),
            }
        }
    }

    Ok(findings)
}

/// Tabulate the findings.
pub fn risk_table(findings: &[RiskFinding]) -> ResultTable {
    let mut result = ResultTable::new(
        "Clinical Risk Factors and Bone Microarchitecture",
        &[
            "Factor", "Outcome", "N (Y)", "N (N)", "Mean (Y)", "Mean (N)", "P-value", "d",
        ],
    );
    for f in findings {
        result.push_row(vec![
            f.factor.clone(),
            f.outcome.clone(),
            f.n_present.to_string(),
            f.n_absent.to_string(),
            format!("{:.3}", f.mean_present),
            format!("{:.3}", f.mean_absent),
            format_p(f.p_value),
            format!("{:.2}", f.d),
        ]);
    }
    result.push_note("Student's t-test of present (Y) against absent (N).");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::sample_cohort;

    #[test]
    fn test_flag() {
        assert_eq!(flag(" y "), Some(true));
        assert_eq!(flag("N"), Some(false));
        assert_eq!(flag("YES"), None);
    }

    #[test]
    fn test_screen_skips_rare_factors() {
        let findings = screen_risk_factors(&sample_cohort(), &Config::default()).unwrap();
        // Glucocorticoid therapy has only two "Y" rows
        assert!(findings.iter().all(|f| f.factor != "GLUCOTICOID THERAPY"));
        // Three factors times six outcomes
        assert_eq!(findings.len(), 18);

        let dm = findings
            .iter()
            .find(|f| f.factor == "TYPE 2 DM" && f.outcome == "RADIUS_CT.PO")
            .unwrap();
        assert_eq!(dm.n_present + dm.n_absent, 60);
        assert_eq!(dm.n_present, 21);
    }

    #[test]
    fn test_risk_table() {
        let finding = RiskFinding {
            factor: "RA".to_string(),
            outcome: "RADIUS_TB.N".to_string(),
            n_present: 7,
            n_absent: 53,
            mean_present: 1.0,
            mean_absent: 1.2,
            p_value: 0.01,
            d: -0.912,
        };
        assert!(finding.is_significant());
        let table = risk_table(&[finding]);
        assert_eq!(
            table.rows[0],
            vec!["RA", "RADIUS_TB.N", "7", "53", "1.000", "1.200", "**0.010**", "-0.91"]
        );
    }
}

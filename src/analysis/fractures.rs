//! Fracture-site distribution and baseline comparison across cohorts.

use super::aggregator::count_by;
use super::AnalysisResult;
use crate::cohort::{Arm, CohortTable, FractureSite, GroupSpec};
use crate::config::Config;
use crate::models::ResultTable;
use crate::stats::{mean, std_dev, t_test, TTestKind};
use tracing::{debug, warn};

/// Output file stem of the unified table.
pub const FRACTURE_STEM: &str = "unified_baseline_and_fracture_stats";

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn mean_sd(values: &[f64]) -> String {
    if values.is_empty() {
        return "-".to_string();
    }
    format!("{:.2} ± {:.2}", mean(values), std_dev(values, 1))
}

/// Header of the unified table for the configured baseline variables.
fn columns(config: &Config) -> Vec<String> {
    let mut columns: Vec<String> = [
        "Cohort",
        "N_Fracture",
        "N_Control",
        "MOP_N",
        "MOP_Percent",
        "Other_N",
        "Other_Percent",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for v in &config.analysis.baseline_variables {
        columns.push(format!("{}_Fx", v));
        columns.push(format!("{}_Ctl", v));
        columns.push(format!("{}_P", v));
    }
    columns
}

/// One row of the unified table.
pub fn fracture_row(
    table: &CohortTable,
    config: &Config,
    cohort: &str,
) -> AnalysisResult<Vec<String>> {
    let spec = GroupSpec::from(&config.groups);
    let arms = spec.arms(table)?;
    let (n_fx, n_ctl) = spec.counts(table)?;

    let (mop, other) = match table.resolve_column(&config.analysis.fracture_site_column) {
        Some(column) => {
            let sites = table.text(column)?;
            let counts = count_by(
                arms.iter()
                    .zip(&sites)
                    .filter(|(arm, _)| **arm == Some(Arm::Case))
                    .filter_map(|(_, site)| FractureSite::classify(site)),
            );
            (
                counts.get(&FractureSite::Mop).copied().unwrap_or(0),
                counts.get(&FractureSite::Other).copied().unwrap_or(0),
            )
        }
        None => {
            warn!("No fracture site column in {}", cohort);
            (0, 0)
        }
    };

    let mut row = vec![
        cohort.to_string(),
        n_fx.to_string(),
        n_ctl.to_string(),
        mop.to_string(),
        format!("{:.1}", percent(mop, n_fx)),
        other.to_string(),
        format!("{:.1}", percent(other, n_fx)),
    ];

    for v in &config.analysis.baseline_variables {
        if table.column_index(v).is_none() {
            debug!("Column '{}' not found in {}", v, cohort);
            row.extend(["-".to_string(), "-".to_string(), "-".to_string()]);
            continue;
        }
        let (fx, ctl) = spec.split_numeric(table, v, false)?;
        let p = match t_test(&fx, &ctl, TTestKind::Student) {
            Ok(test) => format!("{:.4}", test.p_value),
            Err(_) => "-".to_string(),
        };
        row.push(mean_sd(&fx));
        row.push(mean_sd(&ctl));
        row.push(p);
    }

    Ok(row)
}

/// Unified table over several loaded cohorts.
pub fn fracture_table(
    cohorts: &[(String, CohortTable)],
    config: &Config,
) -> AnalysisResult<ResultTable> {
    let mut result = ResultTable::new(
        "Fracture Distribution and Baseline Characteristics",
        &columns(config),
    );
    for (name, table) in cohorts {
        result.push_row(fracture_row(table, config, name)?);
    }
    result.push_note("MOP: spine, hip, wrist/forearm or proximal humerus. Student's t-test.");
    Ok(result)
}

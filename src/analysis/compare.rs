//! Two-arm comparison tables.
//!
//! One row per variable: mean ± SD per arm, percent difference, Welch
//! p-value, |Cohen's d| and the Mann-Whitney AUC.

use crate::cohort::{CohortResult, CohortTable, GroupSpec};
use crate::config::{Config, VariableSpec};
use crate::models::ResultTable;
use crate::report::{format_mean_sd, format_p};
use crate::stats::{auc_from_u, cohens_d, mean, percent_difference, t_test, TTestKind};
use tracing::{debug, warn};

/// Variables named by column only, labelled with the column itself.
pub fn unlabelled(columns: &[String]) -> Vec<VariableSpec> {
    columns
        .iter()
        .map(|c| VariableSpec {
            column: c.clone(),
            label: c.clone(),
        })
        .collect()
}

/// Build the comparison table for `variables`.
///
/// Returns `Ok(None)` when either arm has no rows.
pub fn compare_table(
    table: &CohortTable,
    config: &Config,
    title: &str,
    variables: &[VariableSpec],
) -> CohortResult<Option<ResultTable>> {
    let spec = GroupSpec::from(&config.groups);
    let (n_case, n_control) = spec.counts(table)?;
    if n_case == 0 || n_control == 0 {
        warn!("Groups empty for '{}'. Skipping.", title);
        return Ok(None);
    }

    let mut result = ResultTable::new(
        title,
        &[
            "Parameter".to_string(),
            format!("{} (n={})", spec.case_name, n_case),
            format!("{} (n={})", spec.control_name, n_control),
            "% Diff".to_string(),
            "P-value".to_string(),
            "Cohen's d".to_string(),
            "AUC".to_string(),
        ],
    );

    let min = config.analysis.min_group_size.max(2);
    for variable in variables {
        let Some(column) = table.resolve_column(&variable.column) else {
            debug!("Column '{}' not found, skipping", variable.column);
            continue;
        };
        let (cases, controls) = spec.split_numeric(table, column, config.is_absolute(column))?;
        if cases.len() < min || controls.len() < min {
            debug!(
                "Too few values for '{}' ({} vs {}), skipping",
                column,
                cases.len(),
                controls.len()
            );
            continue;
        }

        let p = match t_test(&cases, &controls, TTestKind::Welch) {
            Ok(test) => test.p_value,
            Err(e) => {
                warn!("Welch t-test failed for '{}': {}", column, e);
                f64::NAN
            }
        };
        let d = cohens_d(&cases, &controls);
        let auc = auc_from_u(&cases, &controls);
        let diff = percent_difference(mean(&cases), mean(&controls));

        result.push_row(vec![
            variable.label.clone(),
            format_mean_sd(&cases),
            format_mean_sd(&controls),
            format!("{:.1}%", diff),
            format_p(p),
            format!("{:.2}", d.abs()),
            format!("{:.2}", auc),
        ]);
    }

    result.push_note("P-values from Welch's t-test; AUC from the Mann-Whitney U statistic.");
    Ok(Some(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CohortTable {
        let csv = "\
GROUP,AGE,F.Load_RADIUS,TBS
Group A,70,-2000,1.20
Group A,72,-2100,1.10
Group A,74,-2200,
Group B,60,-3000,1.30
Group B,62,-3100,1.35
Group B,64,-3200,
Group C,99,-9999,9.0
";
        CohortTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_compare_table_rows() {
        let config = Config::default();
        let variables = vec![
            VariableSpec {
                column: "AGE".to_string(),
                label: "Age (years)".to_string(),
            },
            VariableSpec {
                column: "F.Load".to_string(),
                label: "Failure Load (N)".to_string(),
            },
        ];
        let result = compare_table(&sample(), &config, "Table 1", &variables)
            .unwrap()
            .unwrap();

        assert_eq!(result.columns[1], "Fracture (n=3)");
        assert_eq!(result.columns[2], "Control (n=3)");
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.get(0, "Parameter"), Some("Age (years)"));
        assert_eq!(result.get(0, "Fracture (n=3)"), Some("72.00 ± 2.00"));
        assert_eq!(result.get(0, "Control (n=3)"), Some("62.00 ± 2.00"));
        assert_eq!(result.get(0, "% Diff"), Some("16.1%"));
        assert_eq!(result.get(0, "Cohen's d"), Some("5.00"));
        assert_eq!(result.get(0, "AUC"), Some("1.00"));

        // Failure load is compared on magnitudes
        assert_eq!(result.get(1, "Fracture (n=3)"), Some("2100.00 ± 100.00"));
        assert_eq!(result.get(1, "% Diff"), Some("-32.3%"));
    }

    #[test]
    fn test_compare_skips_small_and_missing() {
        let config = Config::default();
        let variables = unlabelled(&["TBS".to_string(), "NOT_A_COLUMN".to_string()]);
        let result = compare_table(&sample(), &config, "T", &variables)
            .unwrap()
            .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0][0], "TBS");
    }

    #[test]
    fn test_compare_empty_arm() {
        let csv = "GROUP,AGE\nGroup A,70\nGroup A,71\n";
        let table = CohortTable::from_reader(csv.as_bytes()).unwrap();
        let result = compare_table(&table, &Config::default(), "T", &[]).unwrap();
        assert!(result.is_none());
    }
}

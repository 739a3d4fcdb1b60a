//! Diabetes-by-fracture subgroup table (Co / Fx / DM / DMFx).

use super::aggregator::group_by_subgroup;
use super::AnalysisResult;
use crate::cohort::{CohortTable, GroupSpec, Subgroup};
use crate::config::Config;
use crate::models::ResultTable;
use crate::report::format_mean_sd;
use crate::stats::{t_test, TTestKind};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Output file stem of the subgroup table.
pub const SUBGROUP_STEM: &str = "Table2_HRpQCT_Parameters";

/// Welch p-value with three decimals, or `-` unless both groups have n > 1.
fn welch_cell(a: &[f64], b: &[f64]) -> String {
    if a.len() > 1 && b.len() > 1 {
        match t_test(a, b, TTestKind::Welch) {
            Ok(test) => format!("{:.3}", test.p_value),
            Err(_) => "-".to_string(),
        }
    } else {
        "-".to_string()
    }
}

/// Number of rows in each subgroup.
pub fn subgroup_counts(
    table: &CohortTable,
    config: &Config,
) -> AnalysisResult<BTreeMap<Subgroup, usize>> {
    let spec = GroupSpec::from(&config.groups);
    let subgroups = Subgroup::classify(table, &spec, &config.analysis.diabetes_column)?;
    let mut counts: BTreeMap<Subgroup, usize> = Subgroup::ALL.iter().map(|s| (*s, 0)).collect();
    for subgroup in subgroups.into_iter().flatten() {
        *counts.entry(subgroup).or_default() += 1;
    }
    Ok(counts)
}

/// Per-site table of mean ± SD per subgroup with Welch p-values for
/// Co vs Fx and DM vs DMFx.
pub fn subgroup_table(table: &CohortTable, config: &Config) -> AnalysisResult<ResultTable> {
    let spec = GroupSpec::from(&config.groups);
    let dm_column = &config.analysis.diabetes_column;

    let counts = subgroup_counts(table, config)?;
    info!(
        "Patient counts per subgroup: {}",
        counts
            .iter()
            .map(|(s, n)| format!("{}={}", s, n))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut result = ResultTable::new(
        "HR-pQCT Parameters by Diabetes and Fracture Status",
        &[
            "Parameter",
            "Co",
            "Fx",
            "DM",
            "DMFx",
            "p (Co vs Fx)",
            "p (DM vs DMFx)",
        ],
    );

    for site in &config.analysis.sites {
        result.push_section(&site.name);

        for parameter in &config.analysis.subgroup_parameters {
            let column = parameter.column.replace("{}", &site.prefix);
            if table.column_index(&column).is_none() {
                debug!("Column '{}' not found, skipping", column);
                continue;
            }

            let groups =
                group_by_subgroup(table, &column, &spec, dm_column, config.is_absolute(&column))?;
            let values = |s: Subgroup| groups.get(&s).map(Vec::as_slice).unwrap_or(&[]);

            result.push_row(vec![
                parameter.label.clone(),
                format_mean_sd(values(Subgroup::Co)),
                format_mean_sd(values(Subgroup::Fx)),
                format_mean_sd(values(Subgroup::DM)),
                format_mean_sd(values(Subgroup::DMFx)),
                welch_cell(values(Subgroup::Co), values(Subgroup::Fx)),
                welch_cell(values(Subgroup::DM), values(Subgroup::DMFx)),
            ]);
        }
    }

    result.push_note(format!(
        "Co: non-diabetic {}; Fx: non-diabetic {}; DM: diabetic {}; DMFx: diabetic {}. Welch's t-test.",
        spec.control_name.to_lowercase(),
        spec.case_name.to_lowercase(),
        spec.control_name.to_lowercase(),
        spec.case_name.to_lowercase(),
    ));
    Ok(result)
}

/// Values of `column` for the requested subgroups, labelled for a box plot.
pub fn box_groups(
    table: &CohortTable,
    config: &Config,
    column: &str,
    subgroups: &[(Subgroup, &str)],
) -> AnalysisResult<Vec<(String, Vec<f64>)>> {
    let spec = GroupSpec::from(&config.groups);
    let mut groups = group_by_subgroup(
        table,
        column,
        &spec,
        &config.analysis.diabetes_column,
        config.is_absolute(column),
    )?;
    Ok(subgroups
        .iter()
        .map(|(s, label)| (label.to_string(), groups.remove(s).unwrap_or_default()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::sample_cohort;

    #[test]
    fn test_welch_cell() {
        assert_eq!(welch_cell(&[1.0], &[2.0, 3.0]), "-");
        assert_eq!(welch_cell(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 6.0, 8.0, 10.0]), "0.108");
    }

    #[test]
    fn test_subgroup_counts() {
        let counts = subgroup_counts(&sample_cohort(), &Config::default()).unwrap();
        assert_eq!(counts[&Subgroup::Co], 21);
        assert_eq!(counts[&Subgroup::Fx], 16);
        assert_eq!(counts[&Subgroup::DM], 11);
        assert_eq!(counts[&Subgroup::DMFx], 8);
    }

    #[test]
    fn test_subgroup_table_layout() {
        let result = subgroup_table(&sample_cohort(), &Config::default()).unwrap();
        // Two section rows plus ten parameters per site
        assert_eq!(result.rows.len(), 22);
        assert_eq!(result.rows[0][0], "--- Distal Radius ---");
        assert_eq!(result.rows[11][0], "--- Distal Tibia ---");
        assert_eq!(result.rows[1][0], "Total vBMD (mg HA/cm³)");

        // Failure load is reported as a magnitude
        let load = result.rows.iter().find(|r| r[0].starts_with("Failure Load")).unwrap();
        assert!(!load[1].starts_with('-'));
    }

    #[test]
    fn test_box_groups() {
        let groups = box_groups(
            &sample_cohort(),
            &Config::default(),
            "RADIUS_CT.PO",
            &[(Subgroup::DM, "DM Control"), (Subgroup::DMFx, "DM Fracture")],
        )
        .unwrap();
        assert_eq!(groups[0].0, "DM Control");
        assert_eq!(groups[0].1.len(), 11);
        assert_eq!(groups[1].1.len(), 8);
    }
}

//! Derivation of the final cohort files from a raw clinical export.
//!
//! The raw export is normalized, filtered by the inclusion rule, imputed,
//! and split into the configured sub-cohorts. Nothing here touches the
//! filesystem except [`write_cohorts`].

use super::table::{is_missing, parse_number};
use super::{is_positive, CohortResult, CohortTable};
use crate::config::{Config, SubcohortSpec};
use crate::stats::descriptive::{mean, mode};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A sub-cohort ready to be written.
#[derive(Debug, Clone)]
pub struct DerivedCohort {
    pub spec: SubcohortSpec,
    pub table: CohortTable,
}

/// Counts reported after cohort derivation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupSummary {
    /// Rows in the admitted groups before the inclusion rule.
    pub group_rows: usize,
    /// Rows passing the inclusion rule.
    pub included: usize,
    /// Numeric cells filled with the column mean.
    pub imputed_numeric: usize,
    /// Diabetes cells filled with the mode.
    pub imputed_diabetes: usize,
    /// Mode used for the diabetes column.
    pub diabetes_mode: Option<String>,
}

/// Normalize a group label: `GROUP A`, `GROUP B` and `GROUP C` become
/// `Group A` and so on, anything else is kept trimmed and uppercased.
pub fn normalize_group(label: &str) -> String {
    let upper = label.trim().to_uppercase();
    match upper.strip_prefix("GROUP ").map(str::trim) {
        Some(suffix @ ("A" | "B" | "C")) => format!("Group {}", suffix),
        _ => upper,
    }
}

fn normalize_column(table: &mut CohortTable, column: &str, f: impl Fn(&str) -> String) {
    if let Some(col) = table
        .resolve_column(column)
        .and_then(|name| table.column_index(name))
    {
        for row in 0..table.len() {
            let value = f(table.cell(row, col));
            table.set_cell(row, col, value);
        }
    }
}

fn normalize_diabetes(value: &str) -> String {
    let upper = value.trim().to_uppercase();
    if is_missing(&upper) {
        String::new()
    } else {
        upper
    }
}

/// Derive the final cohorts from the raw export.
pub fn derive_cohorts(
    mut raw: CohortTable,
    config: &Config,
) -> CohortResult<(SetupSummary, Vec<DerivedCohort>)> {
    let group_column = config.groups.column.as_str();
    let dm_column = config.analysis.diabetes_column.as_str();
    let class_column = config.setup.classification_column.as_str();

    raw.require_column(group_column)?;
    normalize_column(&mut raw, group_column, normalize_group);
    normalize_column(&mut raw, class_column, |v| v.trim().to_uppercase());
    normalize_column(&mut raw, dm_column, normalize_diabetes);

    let groups = raw.text(group_column)?;
    let in_group: Vec<bool> = groups
        .iter()
        .map(|g| config.setup.included_groups.iter().any(|i| i == g))
        .collect();

    let mut keep = in_group.clone();
    for column in &config.setup.inclusion_columns {
        let values = raw.numeric(column)?;
        for (k, v) in keep.iter_mut().zip(values) {
            *k &= v.is_some();
        }
    }

    let mut summary = SetupSummary {
        group_rows: in_group.iter().filter(|k| **k).count(),
        ..SetupSummary::default()
    };

    let mut included = raw.filter_rows(&keep);
    summary.included = included.len();
    info!(
        "Inclusion: {} of {} rows in admitted groups",
        summary.included, summary.group_rows
    );

    summary.imputed_numeric = impute_means(&mut included, &[group_column, class_column, dm_column]);
    if let Some(col) = included
        .resolve_column(dm_column)
        .and_then(|name| included.column_index(name))
    {
        let (count, fill) = impute_mode(&mut included, col);
        summary.imputed_diabetes = count;
        summary.diabetes_mode = fill;
    }
    info!(
        "Imputed {} numeric cells (mean) and {} diabetes cells (mode {:?})",
        summary.imputed_numeric, summary.imputed_diabetes, summary.diabetes_mode
    );

    let diabetic = included
        .text(dm_column)
        .map(|values| values.iter().map(|v| v == "Y").collect::<Vec<bool>>())
        .unwrap_or_else(|_| vec![false; included.len()]);

    let cohorts = split_subcohorts(&included, &config.setup.subcohorts, &diabetic, class_column);
    Ok((summary, cohorts))
}

/// Derive the risk-factor cohorts from the master database.
///
/// Inclusion needs every flag column to read positive. When any flag column
/// is absent the whole table is used.
pub fn derive_risk_cohorts(raw: CohortTable, config: &Config) -> CohortResult<Vec<DerivedCohort>> {
    let flags: Option<Vec<Vec<String>>> = config
        .setup
        .risk_inclusion_flags
        .iter()
        .map(|flag| raw.text(flag).ok())
        .collect();

    let total = match flags {
        Some(flags) => {
            let keep: Vec<bool> = (0..raw.len())
                .map(|row| flags.iter().all(|values| is_positive(&values[row])))
                .collect();
            raw.filter_rows(&keep)
        }
        None => {
            warn!("Inclusion flag columns not found, using the full dataset");
            raw
        }
    };
    info!("Risk cohort: N={}", total.len());

    let dm_columns: Vec<Vec<String>> = config
        .setup
        .risk_diabetes_columns
        .iter()
        .filter_map(|c| total.text(c).ok())
        .collect();
    let diabetic: Vec<bool> = (0..total.len())
        .map(|row| dm_columns.iter().any(|values| reports_diabetes(&values[row])))
        .collect();

    Ok(split_subcohorts(
        &total,
        &config.setup.risk_subcohorts,
        &diabetic,
        &config.setup.classification_column,
    ))
}

/// Whether a diabetes field records the disease.
pub fn reports_diabetes(value: &str) -> bool {
    let s = value.trim().to_uppercase();
    s.contains("YES") || s == "Y" || (s.contains("PRESENT") && !s.contains("ABSENT"))
}

fn split_subcohorts(
    table: &CohortTable,
    specs: &[SubcohortSpec],
    diabetic: &[bool],
    class_column: &str,
) -> Vec<DerivedCohort> {
    let classification = table.text(class_column).ok();

    specs
        .iter()
        .map(|spec| {
            let keep: Vec<bool> = (0..table.len())
                .map(|row| {
                    let dm_ok = !spec.diabetes || diabetic[row];
                    let class_ok = match (&spec.classification_contains, &classification) {
                        (None, _) => true,
                        (Some(needle), Some(values)) => {
                            values[row].to_uppercase().contains(&needle.to_uppercase())
                        }
                        (Some(_), None) => false,
                    };
                    dm_ok && class_ok
                })
                .collect();
            let sub = table.filter_rows(&keep);
            debug!("Sub-cohort {}: N={}", spec.name, sub.len());
            DerivedCohort {
                spec: spec.clone(),
                table: sub,
            }
        })
        .collect()
}

/// Fill missing cells of every numeric column with the column mean.
/// Returns the number of cells filled.
fn impute_means(table: &mut CohortTable, skip: &[&str]) -> usize {
    let mut filled = 0;
    let columns: Vec<String> = table.headers().to_vec();

    for (col, name) in columns.iter().enumerate() {
        if skip.iter().any(|s| s == name) || !table.is_numeric_column(col) {
            continue;
        }
        let values: Vec<Option<f64>> = (0..table.len())
            .map(|row| parse_number(table.cell(row, col)))
            .collect();
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        if present.len() == values.len() {
            continue;
        }
        let fill = mean(&present);
        for (row, value) in values.iter().enumerate() {
            if value.is_none() {
                table.set_cell(row, col, fill.to_string());
                filled += 1;
            }
        }
    }
    filled
}

/// Fill empty cells of column `col` with its mode.
fn impute_mode(table: &mut CohortTable, col: usize) -> (usize, Option<String>) {
    let values: Vec<String> = (0..table.len())
        .map(|row| table.cell(row, col).to_string())
        .collect();
    let Some(fill) = mode(values.iter().filter(|v| !v.is_empty()).map(String::as_str)) else {
        return (0, None);
    };

    let mut filled = 0;
    for (row, value) in values.iter().enumerate() {
        if value.is_empty() {
            table.set_cell(row, col, fill.clone());
            filled += 1;
        }
    }
    (filled, Some(fill))
}

/// Write every derived cohort under `dir`. Returns the written paths.
pub fn write_cohorts(cohorts: &[DerivedCohort], dir: &Path) -> CohortResult<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(cohorts.len());
    for cohort in cohorts {
        let path = dir.join(&cohort.spec.file);
        cohort.table.write_csv(&path)?;
        info!("Saved {} (N={})", path.display(), cohort.table.len());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RAW: &str = "\
GROUP ,AGE,L1-L4 T SCORE,RADIUS_ttvBMD,WHO CLASSIFICATION,TYPE 2 DM,NOTES
group a,60,-1.8,250,osteopenia ,Y,x
Group B,,-1.2,270,Normal,nan,y
GROUP A,70,-2.9,,Osteoporosis,Y,z
group b,50,-1.5,280, Osteopenia,N,w
Group C,55,-1.0,300,Normal,Y,v
GROUP A,80,-2.0,240,OSTEOPENIA,Y,u
";

    fn raw() -> CohortTable {
        CohortTable::from_reader(RAW.as_bytes()).unwrap()
    }

    #[test]
    fn test_normalize_group() {
        assert_eq!(normalize_group(" group a "), "Group A");
        assert_eq!(normalize_group("GROUP C"), "Group C");
        assert_eq!(normalize_group("control"), "CONTROL");
        assert_eq!(normalize_group("group d"), "GROUP D");
        assert_eq!(normalize_group("Group  b"), "Group B");
        assert_eq!(normalize_group(""), "");
    }

    #[test]
    fn test_inclusion_and_imputation() {
        let config = Config::default();
        let (summary, cohorts) = derive_cohorts(raw(), &config).unwrap();

        assert_eq!(summary.group_rows, 5);
        assert_eq!(summary.included, 4);
        assert_eq!(summary.imputed_numeric, 1);
        assert_eq!(summary.imputed_diabetes, 1);
        assert_eq!(summary.diabetes_mode.as_deref(), Some("Y"));

        let total = &cohorts[0].table;
        assert_eq!(total.len(), 4);
        // mean of 60, 50, 80
        assert_eq!(total.numeric("AGE").unwrap()[1], Some(190.0 / 3.0));
        assert_eq!(total.text("TYPE 2 DM").unwrap(), vec!["Y", "Y", "N", "Y"]);
        assert_eq!(total.text("GROUP").unwrap()[0], "Group A");
    }

    #[test]
    fn test_subcohort_filters() {
        let config = Config::default();
        let (_, cohorts) = derive_cohorts(raw(), &config).unwrap();
        let sizes: Vec<(String, usize)> = cohorts
            .iter()
            .map(|c| (c.spec.name.clone(), c.table.len()))
            .collect();
        assert_eq!(
            sizes,
            vec![
                ("total".to_string(), 4),
                ("total_diabetes".to_string(), 3),
                ("osteopenia".to_string(), 3),
                ("osteopenia_diabetes".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_missing_group_column() {
        let table = CohortTable::from_reader("AGE\n1\n".as_bytes()).unwrap();
        assert!(derive_cohorts(table, &Config::default()).is_err());
    }

    #[test]
    fn test_risk_cohorts() {
        let csv = "\
hrpqct done ,BMD DONE OR NOT,WHO CLASSIFICATION,DIABETES PRESENT / ABSENT ,TYPE 2 DM
Done,YES,Osteopenia,Present,
DONE,NOT DONE,Osteopenia,Present,
yes,y,Normal,Absent,Y
Done,Done,OSTEOPENIA,Absent,N
";
        let table = CohortTable::from_reader(csv.as_bytes()).unwrap();
        let cohorts = derive_risk_cohorts(table, &Config::default()).unwrap();
        let sizes: Vec<usize> = cohorts.iter().map(|c| c.table.len()).collect();
        assert_eq!(sizes, vec![3, 2, 2, 1]);
    }

    #[test]
    fn test_risk_cohorts_without_flags() {
        let csv = "WHO CLASSIFICATION,TYPE 2 DM\nOsteopenia,Y\nNormal,N\n";
        let table = CohortTable::from_reader(csv.as_bytes()).unwrap();
        let cohorts = derive_risk_cohorts(table, &Config::default()).unwrap();
        assert_eq!(cohorts[0].table.len(), 2);
        assert_eq!(cohorts[3].table.len(), 1);
    }

    #[test]
    fn test_write_cohorts() {
        let temp_dir = TempDir::new().unwrap();
        let (_, cohorts) = derive_cohorts(raw(), &Config::default()).unwrap();
        let written = write_cohorts(&cohorts, temp_dir.path()).unwrap();
        assert_eq!(written.len(), 4);
        assert!(temp_dir.path().join("cohort_osteopenia_n91.csv").exists());
    }
}

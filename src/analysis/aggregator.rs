//! Row aggregation shared by the analyses.
//!
//! Cross-tabulations, subgroup grouping and complete-case extraction.

use crate::cohort::{Arm, CohortResult, CohortTable, GroupSpec, Subgroup};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Count occurrences of each item.
pub fn count_by<T, I>(items: I) -> HashMap<T, usize>
where
    T: Hash + Eq,
    I: IntoIterator<Item = T>,
{
    let mut counts: HashMap<T, usize> = HashMap::new();
    for item in items {
        *counts.entry(item).or_default() += 1;
    }
    counts
}

/// Value-by-arm contingency table of a categorical column.
#[derive(Debug, Clone, PartialEq)]
pub struct Crosstab {
    /// Distinct non-missing values, sorted.
    pub levels: Vec<String>,
    /// `counts[level] = [cases, controls]`.
    pub counts: Vec<Vec<u64>>,
}

impl Crosstab {
    /// Drop levels that never occur so the expected counts stay positive.
    fn trimmed(mut self) -> Self {
        let keep: Vec<bool> = self.counts.iter().map(|r| r.iter().sum::<u64>() > 0).collect();
        let mut k = keep.iter();
        self.levels.retain(|_| *k.next().unwrap_or(&false));
        let mut k = keep.iter();
        self.counts.retain(|_| *k.next().unwrap_or(&false));
        self
    }

    /// Whether both dimensions have at least two categories.
    pub fn is_testable(&self) -> bool {
        self.levels.len() >= 2
            && (0..2).all(|arm| self.counts.iter().any(|r| r[arm] > 0))
    }
}

/// Cross-tabulate `column` against the study arm. Rows with a missing value
/// or no arm are left out.
pub fn crosstab(table: &CohortTable, column: &str, spec: &GroupSpec) -> CohortResult<Crosstab> {
    let arms = spec.arms(table)?;
    let values = table.text(column)?;

    let mut counts: BTreeMap<String, [u64; 2]> = BTreeMap::new();
    for (arm, value) in arms.into_iter().zip(values) {
        let Some(arm) = arm else { continue };
        if crate::cohort::table::is_missing(&value) {
            continue;
        }
        let cell = counts.entry(value.to_uppercase()).or_default();
        match arm {
            Arm::Case => cell[0] += 1,
            Arm::Control => cell[1] += 1,
        }
    }

    Ok(Crosstab {
        levels: counts.keys().cloned().collect(),
        counts: counts.values().map(|c| c.to_vec()).collect(),
    }
    .trimmed())
}

/// Non-missing values of `column` per subgroup, as absolute values when
/// `absolute` is set.
pub fn group_by_subgroup(
    table: &CohortTable,
    column: &str,
    spec: &GroupSpec,
    diabetes_column: &str,
    absolute: bool,
) -> CohortResult<BTreeMap<Subgroup, Vec<f64>>> {
    let subgroups = Subgroup::classify(table, spec, diabetes_column)?;
    let values = table.numeric(column)?;

    let mut grouped: BTreeMap<Subgroup, Vec<f64>> =
        Subgroup::ALL.iter().map(|s| (*s, Vec::new())).collect();
    for (subgroup, value) in subgroups.into_iter().zip(values) {
        if let (Some(subgroup), Some(v)) = (subgroup, value) {
            grouped
                .entry(subgroup)
                .or_default()
                .push(if absolute { v.abs() } else { v });
        }
    }
    Ok(grouped)
}

/// Rows where every column and the outcome are present.
///
/// Returns one vector per column plus the outcome vector.
pub fn complete_cases(
    table: &CohortTable,
    columns: &[&str],
    outcome: &[Option<f64>],
) -> CohortResult<(Vec<Vec<f64>>, Vec<f64>)> {
    let data: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|c| table.numeric(c))
        .collect::<CohortResult<_>>()?;

    let mut out: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
    let mut y = Vec::new();
    for (row, target) in outcome.iter().enumerate() {
        let Some(target) = target else { continue };
        let values: Option<Vec<f64>> = data.iter().map(|col| col[row]).collect();
        if let Some(values) = values {
            for (col, v) in out.iter_mut().zip(values) {
                col.push(v);
            }
            y.push(*target);
        }
    }
    Ok((out, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GroupsConfig;

    fn sample() -> CohortTable {
        let csv = "\
GROUP,RA,TYPE 2 DM,AGE,RADIUS_TB.N,Stiffness_RADIUS
Group A,Y,Y,60,1.2,-100
Group A,N,N,65,,-120
Group B,N,Y,58,1.8,-140
Group B,n,N,,1.9,-150
Group C,Y,N,70,1.0,-90
Group B,,N,61,2.0,-160
";
        CohortTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_count_by() {
        let counts = count_by(["a", "b", "a"]);
        assert_eq!(counts.get("a"), Some(&2));
        assert_eq!(counts.get("b"), Some(&1));
    }

    #[test]
    fn test_crosstab() {
        let spec = GroupSpec::from(&GroupsConfig::default());
        let tab = crosstab(&sample(), "RA", &spec).unwrap();
        assert_eq!(tab.levels, vec!["N", "Y"]);
        assert_eq!(tab.counts, vec![vec![1, 2], vec![1, 0]]);
        assert!(tab.is_testable());
    }

    #[test]
    fn test_crosstab_single_level_not_testable() {
        let csv = "GROUP,RA\nGroup A,N\nGroup B,N\n";
        let table = CohortTable::from_reader(csv.as_bytes()).unwrap();
        let spec = GroupSpec::from(&GroupsConfig::default());
        assert!(!crosstab(&table, "RA", &spec).unwrap().is_testable());
    }

    #[test]
    fn test_group_by_subgroup() {
        let spec = GroupSpec::from(&GroupsConfig::default());
        let grouped =
            group_by_subgroup(&sample(), "Stiffness_RADIUS", &spec, "TYPE 2 DM", true).unwrap();
        assert_eq!(grouped[&Subgroup::DMFx], vec![100.0]);
        assert_eq!(grouped[&Subgroup::Fx], vec![120.0]);
        assert_eq!(grouped[&Subgroup::DM], vec![140.0]);
        assert_eq!(grouped[&Subgroup::Co], vec![150.0, 160.0]);
    }

    #[test]
    fn test_complete_cases() {
        let spec = GroupSpec::from(&GroupsConfig::default());
        let table = sample();
        let target = spec.target(&table).unwrap();
        let (x, y) = complete_cases(&table, &["AGE", "RADIUS_TB.N"], &target).unwrap();
        assert_eq!(x[0], vec![60.0, 58.0, 61.0]);
        assert_eq!(x[1], vec![1.2, 1.8, 2.0]);
        assert_eq!(y, vec![1.0, 0.0, 0.0]);
    }
}

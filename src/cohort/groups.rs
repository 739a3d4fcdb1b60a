//! Study arms and diabetes subgroups.

use super::{CohortResult, CohortTable};
use crate::config::GroupsConfig;
use serde::Serialize;
use std::fmt;

/// Arm of a two-group comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Arm {
    Case,
    Control,
}

/// Maps group labels onto arms.
#[derive(Debug, Clone)]
pub struct GroupSpec {
    pub column: String,
    case_labels: Vec<String>,
    control_labels: Vec<String>,
    substring: bool,
    pub case_name: String,
    pub control_name: String,
}

fn normalize(label: &str) -> String {
    label.trim().to_uppercase()
}

impl From<&GroupsConfig> for GroupSpec {
    fn from(config: &GroupsConfig) -> Self {
        Self {
            column: config.column.clone(),
            case_labels: config.case_labels.iter().map(|l| normalize(l)).collect(),
            control_labels: config.control_labels.iter().map(|l| normalize(l)).collect(),
            substring: config.substring_match,
            case_name: config.case_name.clone(),
            control_name: config.control_name.clone(),
        }
    }
}

impl GroupSpec {
    /// Classify one label. Case labels are checked first.
    pub fn classify(&self, label: &str) -> Option<Arm> {
        let label = normalize(label);
        if label.is_empty() {
            return None;
        }
        let matches = |candidates: &[String]| {
            candidates.iter().any(|c| {
                if self.substring {
                    label.contains(c.as_str())
                } else {
                    label == *c
                }
            })
        };

        if matches(&self.case_labels) {
            Some(Arm::Case)
        } else if matches(&self.control_labels) {
            Some(Arm::Control)
        } else {
            None
        }
    }

    /// Arm of every row.
    pub fn arms(&self, table: &CohortTable) -> CohortResult<Vec<Option<Arm>>> {
        Ok(table
            .text(&self.column)?
            .iter()
            .map(|label| self.classify(label))
            .collect())
    }

    /// Count rows per arm as (cases, controls).
    pub fn counts(&self, table: &CohortTable) -> CohortResult<(usize, usize)> {
        let arms = self.arms(table)?;
        let cases = arms.iter().filter(|a| **a == Some(Arm::Case)).count();
        let controls = arms.iter().filter(|a| **a == Some(Arm::Control)).count();
        Ok((cases, controls))
    }

    /// Non-missing values of `column` split into (cases, controls).
    ///
    /// With `absolute` set, values are taken as magnitudes.
    pub fn split_numeric(
        &self,
        table: &CohortTable,
        column: &str,
        absolute: bool,
    ) -> CohortResult<(Vec<f64>, Vec<f64>)> {
        let arms = self.arms(table)?;
        let values = table.numeric(column)?;

        let mut cases = Vec::new();
        let mut controls = Vec::new();
        for (arm, value) in arms.into_iter().zip(values) {
            let Some(v) = value else { continue };
            let v = if absolute { v.abs() } else { v };
            match arm {
                Some(Arm::Case) => cases.push(v),
                Some(Arm::Control) => controls.push(v),
                None => {}
            }
        }
        Ok((cases, controls))
    }

    /// Binary outcome per row: 1.0 for cases, 0.0 for controls.
    pub fn target(&self, table: &CohortTable) -> CohortResult<Vec<Option<f64>>> {
        Ok(self
            .arms(table)?
            .into_iter()
            .map(|arm| match arm {
                Some(Arm::Case) => Some(1.0),
                Some(Arm::Control) => Some(0.0),
                None => None,
            })
            .collect())
    }
}

/// Arm crossed with diabetes status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Subgroup {
    /// Non-diabetic control
    Co,
    /// Non-diabetic fracture
    Fx,
    /// Diabetic control
    DM,
    /// Diabetic fracture
    DMFx,
}

impl fmt::Display for Subgroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Diabetes flag as recorded in the cohort files.
pub fn is_diabetic(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("Y")
}

impl Subgroup {
    pub const ALL: [Subgroup; 4] = [Subgroup::Co, Subgroup::Fx, Subgroup::DM, Subgroup::DMFx];

    pub fn label(&self) -> &'static str {
        match self {
            Subgroup::Co => "Co",
            Subgroup::Fx => "Fx",
            Subgroup::DM => "DM",
            Subgroup::DMFx => "DMFx",
        }
    }

    pub fn from_parts(arm: Arm, diabetic: bool) -> Self {
        match (diabetic, arm) {
            (false, Arm::Control) => Subgroup::Co,
            (false, Arm::Case) => Subgroup::Fx,
            (true, Arm::Control) => Subgroup::DM,
            (true, Arm::Case) => Subgroup::DMFx,
        }
    }

    /// Subgroup of every row; `None` where the arm is unknown.
    pub fn classify(
        table: &CohortTable,
        spec: &GroupSpec,
        diabetes_column: &str,
    ) -> CohortResult<Vec<Option<Subgroup>>> {
        let arms = spec.arms(table)?;
        let dm = table.text(diabetes_column)?;
        Ok(arms
            .into_iter()
            .zip(dm)
            .map(|(arm, dm)| arm.map(|a| Subgroup::from_parts(a, is_diabetic(&dm))))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CohortTable {
        let csv = "GROUP,TYPE 2 DM,F.Load_RADIUS\n\
                   Group A,Y,-3000\n\
                   Group B,N,-2500\n\
                   group a ,N,\n\
                   Group C,Y,-100\n\
                   Group B,y,2000\n";
        CohortTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_classify_exact() {
        let spec = GroupSpec::from(&GroupsConfig::default());
        assert_eq!(spec.classify("Group A"), Some(Arm::Case));
        assert_eq!(spec.classify(" group b "), Some(Arm::Control));
        assert_eq!(spec.classify("Group C"), None);
        assert_eq!(spec.classify(""), None);
    }

    #[test]
    fn test_classify_substring() {
        let config = GroupsConfig {
            case_labels: vec!["A".to_string(), "FRACTURE".to_string()],
            control_labels: vec!["B".to_string(), "CONTROL".to_string()],
            substring_match: true,
            ..GroupsConfig::default()
        };
        let spec = GroupSpec::from(&config);
        assert_eq!(spec.classify("Fracture arm"), Some(Arm::Case));
        assert_eq!(spec.classify("Controls"), Some(Arm::Control));
    }

    #[test]
    fn test_split_numeric_absolute() {
        let spec = GroupSpec::from(&GroupsConfig::default());
        let table = sample();
        let (cases, controls) = spec.split_numeric(&table, "F.Load_RADIUS", true).unwrap();
        assert_eq!(cases, vec![3000.0]);
        assert_eq!(controls, vec![2500.0, 2000.0]);

        let (_, raw_controls) = spec.split_numeric(&table, "F.Load_RADIUS", false).unwrap();
        assert_eq!(raw_controls, vec![-2500.0, 2000.0]);
        assert_eq!(spec.counts(&table).unwrap(), (2, 2));
    }

    #[test]
    fn test_target() {
        let spec = GroupSpec::from(&GroupsConfig::default());
        let target = spec.target(&sample()).unwrap();
        assert_eq!(target, vec![Some(1.0), Some(0.0), Some(1.0), None, Some(0.0)]);
    }

    #[test]
    fn test_subgroups() {
        let spec = GroupSpec::from(&GroupsConfig::default());
        let groups = Subgroup::classify(&sample(), &spec, "TYPE 2 DM").unwrap();
        assert_eq!(
            groups,
            vec![
                Some(Subgroup::DMFx),
                Some(Subgroup::Co),
                Some(Subgroup::Fx),
                None,
                Some(Subgroup::DM)
            ]
        );
    }
}

//! Exploratory summaries: descriptive statistics, correlations and OLS.

use super::aggregator::complete_cases;
use super::{AnalysisError, AnalysisResult};
use crate::cohort::CohortTable;
use crate::models::ResultTable;
use crate::report::format_p;
use crate::stats::linalg::design_matrix;
use crate::stats::{ols, pearson, Summary};
use ndarray::Array1;
use tracing::warn;

/// Columns to summarize: the requested ones that resolve, or every column
/// holding at least one number.
fn numeric_columns(table: &CohortTable, requested: &[String]) -> AnalysisResult<Vec<String>> {
    if requested.is_empty() {
        let mut columns = Vec::new();
        for header in table.headers() {
            if table.numeric(header)?.iter().any(Option::is_some) {
                columns.push(header.clone());
            }
        }
        return Ok(columns);
    }

    Ok(requested
        .iter()
        .filter_map(|key| match table.resolve_column(key) {
            Some(column) => Some(column.to_string()),
            None => {
                warn!("Column '{}' not found, skipping", key);
                None
            }
        })
        .collect())
}

/// Count, mean, SD, min, quartiles and max of each numeric column.
pub fn describe(table: &CohortTable, columns: &[String]) -> AnalysisResult<ResultTable> {
    let mut result = ResultTable::new(
        "Descriptive Statistics",
        &["Variable", "Count", "Mean", "SD", "Min", "25%", "50%", "75%", "Max"],
    );

    for column in numeric_columns(table, columns)? {
        let values: Vec<f64> = table.numeric(&column)?.into_iter().flatten().collect();
        let Some(s) = Summary::from_values(&values) else {
            continue;
        };
        let sd = if s.count > 1 {
            format!("{:.3}", s.std)
        } else {
            "-".to_string()
        };
        result.push_row(vec![
            column,
            s.count.to_string(),
            format!("{:.3}", s.mean),
            sd,
            format!("{:.3}", s.min),
            format!("{:.3}", s.q1),
            format!("{:.3}", s.median),
            format!("{:.3}", s.q3),
            format!("{:.3}", s.max),
        ]);
    }

    Ok(result)
}

/// Values of `a` and `b` on rows where both are present.
fn pairwise(a: &[Option<f64>], b: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    a.iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip()
}

/// Pearson correlation matrix and the long table of pairs.
pub fn correlate(
    table: &CohortTable,
    columns: &[String],
) -> AnalysisResult<(ResultTable, ResultTable)> {
    let columns = numeric_columns(table, columns)?;
    if columns.len() < 2 {
        return Err(AnalysisError::Skipped(
            "correlation needs at least two numeric columns".to_string(),
        ));
    }
    let data: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|c| table.numeric(c))
        .collect::<Result<_, _>>()?;

    let mut header = vec![String::new()];
    header.extend(columns.iter().cloned());
    let mut matrix = ResultTable::new("Pearson Correlation Matrix", &header);
    let mut pairs = ResultTable::new(
        "Pearson Correlations",
        &["Variable A", "Variable B", "r", "P-value", "N"],
    );

    for (i, a) in columns.iter().enumerate() {
        let mut row = vec![a.clone()];
        for (j, b) in columns.iter().enumerate() {
            let (x, y) = pairwise(&data[i], &data[j]);
            let cell = match pearson(&x, &y) {
                Ok(c) => {
                    if j > i {
                        pairs.push_row(vec![
                            a.clone(),
                            b.clone(),
                            format!("{:.3}", c.r),
                            format_p(c.p_value),
                            c.n.to_string(),
                        ]);
                    }
                    format!("{:.3}", c.r)
                }
                Err(_) => "-".to_string(),
            };
            row.push(cell);
        }
        matrix.push_row(row);
    }

    pairs.push_note("Pairwise-complete observations.");
    Ok((matrix, pairs))
}

/// OLS of `outcome` on `predictors` over complete rows.
pub fn regress(
    table: &CohortTable,
    outcome: &str,
    predictors: &[String],
) -> AnalysisResult<ResultTable> {
    let outcome_column = table
        .resolve_column(outcome)
        .ok_or_else(|| AnalysisError::Skipped(format!("column not found: {}", outcome)))?
        .to_string();
    let y_values = table.numeric(&outcome_column)?;

    let columns: Vec<&str> = predictors.iter().map(String::as_str).collect();
    let (x_columns, y) = complete_cases(table, &columns, &y_values)?;
    let x = design_matrix(&x_columns)?;
    let fit = ols(&x, &Array1::from(y))?;

    let mut result = ResultTable::new(
        format!("OLS Regression: {}", outcome_column),
        &["Term", "Coefficient", "Std. Error", "t", "P-value"],
    );
    let terms = std::iter::once("(Intercept)").chain(columns.iter().copied());
    for (k, term) in terms.enumerate() {
        result.push_row(vec![
            term.to_string(),
            format!("{:.4}", fit.coefficients[k]),
            format!("{:.4}", fit.std_errors[k]),
            format!("{:.3}", fit.t_values[k]),
            format_p(fit.p_values[k]),
        ]);
    }

    result.push_note(format!(
        "N = {}; R² = {:.3}; adjusted R² = {:.3}; F = {:.2} (p {})",
        fit.n,
        fit.r_squared,
        fit.adj_r_squared,
        fit.f_statistic,
        format_p(fit.f_p_value).replace("**", "")
    ));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::sample_cohort;

    fn small() -> CohortTable {
        let csv = "id,x,y,z\na,1,2,\nb,2,4.1,1\nc,3,5.9,0\nd,4,8.2,1\ne,5,9.8,\n";
        CohortTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_describe_all_numeric_columns() {
        let result = describe(&small(), &[]).unwrap();
        let names: Vec<&str> = result.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
        assert_eq!(result.get(0, "Mean"), Some("3.000"));
        assert_eq!(result.get(0, "25%"), Some("2.000"));
        assert_eq!(result.get(2, "Count"), Some("3"));
    }

    #[test]
    fn test_describe_sample_cohort() {
        let result = describe(&sample_cohort(), &[]).unwrap();
        assert_eq!(result.rows.len(), 29);
        let tbs = result.rows.iter().find(|r| r[0] == "TBS").unwrap();
        assert_eq!(tbs[1], "57");
    }

    #[test]
    fn test_describe_requested_columns() {
        let result = describe(&small(), &["y".to_string(), "missing".to_string()]).unwrap();
        assert_eq!(result.rows.len(), 1);
    }

    #[test]
    fn test_correlate() {
        let (matrix, pairs) = correlate(&small(), &["x".to_string(), "y".to_string()]).unwrap();
        assert_eq!(matrix.columns, vec!["", "x", "y"]);
        assert_eq!(matrix.rows[0][1], "1.000");
        assert_eq!(pairs.rows.len(), 1);
        assert_eq!(pairs.get(0, "N"), Some("5"));
        let r: f64 = pairs.get(0, "r").unwrap().parse().unwrap();
        assert!(r > 0.99);
    }

    #[test]
    fn test_correlate_needs_two_columns() {
        assert!(correlate(&small(), &["x".to_string()]).is_err());
    }

    #[test]
    fn test_regress() {
        let result = regress(&small(), "y", &["x".to_string()]).unwrap();
        assert_eq!(result.rows[0][0], "(Intercept)");
        assert_eq!(result.rows[1][0], "x");
        let slope: f64 = result.get(1, "Coefficient").unwrap().parse().unwrap();
        assert!((slope - 1.97).abs() < 1e-9);
        assert!(result.notes[0].starts_with("N = 5;"));
    }
}

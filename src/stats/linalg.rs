//! Small dense linear algebra helpers on top of ndarray.

use super::{StatsError, StatsResult};
use ndarray::{Array1, Array2, Axis};

const PIVOT_TOLERANCE: f64 = 1e-12;

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting.
pub fn invert(matrix: &Array2<f64>) -> StatsResult<Array2<f64>> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(StatsError::InvalidInput(format!(
            "cannot invert a {}x{} matrix",
            n,
            matrix.ncols()
        )));
    }

    let mut a = matrix.clone();
    let mut inv = Array2::<f64>::eye(n);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);

        if a[[pivot_row, col]].abs() < PIVOT_TOLERANCE {
            return Err(StatsError::Singular);
        }

        if pivot_row != col {
            for k in 0..n {
                a.swap([col, k], [pivot_row, k]);
                inv.swap([col, k], [pivot_row, k]);
            }
        }

        let pivot = a[[col, col]];
        a.row_mut(col).mapv_inplace(|v| v / pivot);
        inv.row_mut(col).mapv_inplace(|v| v / pivot);

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                let da = factor * a[[col, k]];
                let di = factor * inv[[col, k]];
                a[[row, k]] -= da;
                inv[[row, k]] -= di;
            }
        }
    }

    Ok(inv)
}

/// Prepend a column of ones to a design matrix.
pub fn with_intercept(x: &Array2<f64>) -> Array2<f64> {
    let ones = Array2::<f64>::ones((x.nrows(), 1));
    ndarray::concatenate(Axis(1), &[ones.view(), x.view()])
        .unwrap_or_else(|_| Array2::ones((x.nrows(), 1)))
}

/// Build an n x k design matrix from column vectors.
pub fn design_matrix(columns: &[Vec<f64>]) -> StatsResult<Array2<f64>> {
    let k = columns.len();
    let n = columns.first().map(|c| c.len()).unwrap_or(0);
    if columns.iter().any(|c| c.len() != n) {
        return Err(StatsError::InvalidInput(
            "design columns have different lengths".to_string(),
        ));
    }
    Ok(Array2::from_shape_fn((n, k), |(i, j)| columns[j][i]))
}

/// Diagonal of a square matrix as a vector.
pub fn diagonal(matrix: &Array2<f64>) -> Array1<f64> {
    matrix.diag().to_owned()
}

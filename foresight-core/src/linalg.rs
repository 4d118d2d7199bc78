//! Penalised least squares over `ndarray` design matrices, solved with
//! `linfa-linear`.
//!
//! A per-coefficient ridge penalty is folded into an ordinary least-squares
//! problem by appending one Tikhonov row per coefficient: `sqrt(penalty_j)`
//! on the diagonal with a zero target. The normal equations of the stacked
//! problem are `(X'X + diag(penalty)) beta = X'y`.

use linfa::prelude::*;
use linfa::DatasetBase;
use linfa_linear::LinearRegression;
use ndarray::{s, Array1, Array2};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinalgError {
    #[error("dimension mismatch: design {rows}x{cols}, {targets} targets, {penalties} penalties")]
    DimensionMismatch {
        rows: usize,
        cols: usize,
        targets: usize,
        penalties: usize,
    },

    #[error("least-squares solve failed: {0}")]
    Solve(String),

    #[error("non-finite coefficient at index {index}")]
    NonFinite { index: usize },
}

/// Minimise `|y - X beta|^2 + sum_j penalty[j] * beta_j^2`.
///
/// `design` has one column per entry of `penalty`. Penalties below zero are
/// treated as zero.
pub fn ridge_solve(
    design: &Array2<f64>,
    targets: &Array1<f64>,
    penalty: &[f64],
) -> Result<Array1<f64>, LinalgError> {
    let (n, p) = design.dim();
    if targets.len() != n || penalty.len() != p {
        return Err(LinalgError::DimensionMismatch {
            rows: n,
            cols: p,
            targets: targets.len(),
            penalties: penalty.len(),
        });
    }

    let mut records = Array2::<f64>::zeros((n + p, p));
    records.slice_mut(s![..n, ..]).assign(design);
    for (j, &lambda) in penalty.iter().enumerate() {
        records[[n + j, j]] = lambda.max(0.0).sqrt();
    }
    let mut stacked = Array1::<f64>::zeros(n + p);
    stacked.slice_mut(s![..n]).assign(targets);

    let dataset = DatasetBase::new(records, stacked);
    let fitted = LinearRegression::new()
        .with_intercept(false)
        .fit(&dataset)
        .map_err(|e| LinalgError::Solve(e.to_string()))?;

    let beta = fitted.params().to_owned();
    if let Some(index) = beta.iter().position(|b| !b.is_finite()) {
        return Err(LinalgError::NonFinite { index });
    }
    Ok(beta)
}

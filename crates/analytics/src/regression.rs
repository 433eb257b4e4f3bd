use crate::distribution::student_t_two_sided;
use crate::error::AnalyticsError;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// An ordinary-least-squares fit with an intercept.
///
/// Coefficient vectors are ordered `[intercept, regressor_1, ..., regressor_k]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OlsFit {
    pub observations: usize,
    pub regressors: usize,
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub t_statistics: Vec<f64>,
    pub p_values: Vec<f64>,
    pub r_squared: f64,
    pub adjusted_r_squared: f64,
    /// Residual sum of squares.
    pub sse: f64,
    #[serde(skip)]
    pub fitted: Vec<f64>,
    #[serde(skip)]
    pub residuals: Vec<f64>,
}

impl OlsFit {
    /// Slope of the `i`-th regressor (zero-based, intercept excluded).
    pub fn slope(&self, i: usize) -> f64 {
        self.coefficients[i + 1]
    }

    /// Two-sided p-value of the `i`-th regressor's slope.
    pub fn slope_p_value(&self, i: usize) -> f64 {
        self.p_values[i + 1]
    }
}

/// Regresses `y` on an intercept plus the given regressor columns.
///
/// Fails when the columns disagree in length, when there are not more observations than
/// parameters, when the design matrix is singular, or when `y` has no variance.
pub fn ols(y: &[f64], regressors: &[&[f64]]) -> Result<OlsFit, AnalyticsError> {
    let n = y.len();
    let k = regressors.len();
    let params = k + 1;

    if let Some(column) = regressors.iter().find(|c| c.len() != n) {
        return Err(AnalyticsError::LengthMismatch(format!(
            "regressor of length {} against {} observations",
            column.len(),
            n
        )));
    }
    if n <= params {
        return Err(AnalyticsError::NotEnoughData(format!(
            "{} observations for {} parameters",
            n, params
        )));
    }

    let x = DMatrix::from_fn(n, params, |row, col| {
        if col == 0 { 1.0 } else { regressors[col - 1][row] }
    });
    let target = DVector::from_column_slice(y);

    let xtx_inv = (x.transpose() * &x).try_inverse().ok_or_else(|| {
        AnalyticsError::SingularMatrix(format!("{} regressors over {} observations", k, n))
    })?;
    let beta = &xtx_inv * (x.transpose() * &target);

    let fitted = &x * &beta;
    let residuals = &target - &fitted;
    let sse = residuals.norm_squared();

    let y_mean = target.mean();
    let sst: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    if sst <= 0.0 {
        return Err(AnalyticsError::DivisionByZero("r_squared".to_string()));
    }

    let dof = n - params;
    let sigma2 = sse / dof as f64;

    let mut std_errors = Vec::with_capacity(params);
    let mut t_statistics = Vec::with_capacity(params);
    let mut p_values = Vec::with_capacity(params);
    for j in 0..params {
        let se = (sigma2 * xtx_inv[(j, j)]).max(0.0).sqrt();
        let t = if se > 0.0 {
            beta[j] / se
        } else if beta[j] == 0.0 {
            0.0
        } else {
            f64::INFINITY.copysign(beta[j])
        };
        std_errors.push(se);
        t_statistics.push(t);
        p_values.push(student_t_two_sided(t, dof)?);
    }

    let r_squared = 1.0 - sse / sst;
    let adjusted_r_squared = 1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / dof as f64;

    Ok(OlsFit {
        observations: n,
        regressors: k,
        coefficients: beta.iter().copied().collect(),
        std_errors,
        t_statistics,
        p_values,
        r_squared,
        adjusted_r_squared,
        sse,
        fitted: fitted.iter().copied().collect(),
        residuals: residuals.iter().copied().collect(),
    })
}

//! Serial Correlation test.
//!
//! Smoothed returns carry first-order autocorrelation. Two regressions of `r[t]` on
//! `r[t - 1]` are run:
//!
//! - **Unconditional:** `r[t] = b0 + b1 * r[t - 1]`, testing `b1`.
//! - **Conditional:** `r[t] = b0 + b1 * r[t - 1] + b2 * r[t - 1] * d[t - 1]`, where `d` is 1
//!   while the fitted value of the Low Correlation model is at or below its mean and 0 above
//!   it. Testing `b2` picks up smoothing applied only in weak periods.
//!
//! Each sub-check fails when its coefficient is positive and significant at `a`.

use crate::error::BatteryError;
use crate::verdict::{TestVerdict, VerdictData};
use crate::EntityContext;
use analytics::{OlsFit, mean, ols};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LagCheck {
    pub coefficient: f64,
    pub p_value: f64,
    pub model: OlsFit,
    pub failure: bool,
}

impl LagCheck {
    fn new(model: OlsFit, regressor: usize, a: f64) -> Self {
        let coefficient = model.slope(regressor);
        let p_value = model.slope_p_value(regressor);
        Self {
            coefficient,
            p_value,
            failure: coefficient > 0.0 && p_value < a,
            model,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SerialCorrelationData {
    pub unconditional: LagCheck,
    pub conditional: LagCheck,
    /// Mean of the fitted series used to split periods.
    pub fitted_mean: f64,
    /// Number of lagged periods where the interaction term is active.
    pub low_periods: usize,
}

/// Runs the test with the fitted series of the winning Low Correlation model.
pub fn run(ctx: &EntityContext<'_>, fitted: &[f64]) -> Result<TestVerdict, BatteryError> {
    let returns = ctx.returns();
    if fitted.len() != returns.len() {
        return Err(BatteryError::ShapeMismatch(format!(
            "fitted series has {} values for {} returns",
            fitted.len(),
            returns.len()
        )));
    }

    let y = &returns[1..];
    let lagged = &returns[..returns.len() - 1];

    let fitted_mean = mean(fitted)?;
    let indicator: Vec<f64> = fitted[..fitted.len() - 1]
        .iter()
        .map(|&f| if f <= fitted_mean { 1.0 } else { 0.0 })
        .collect();
    let interaction: Vec<f64> = lagged.iter().zip(&indicator).map(|(x, d)| x * d).collect();
    let low_periods = indicator.iter().filter(|&&d| d > 0.0).count();

    let a = ctx.params.a;
    let unconditional = LagCheck::new(ols(y, &[lagged])?, 0, a);
    let conditional = LagCheck::new(ols(y, &[lagged, &interaction])?, 1, a);

    tracing::debug!(
        entity = ctx.name(),
        lag = unconditional.coefficient,
        lag_p = unconditional.p_value,
        interaction = conditional.coefficient,
        interaction_p = conditional.p_value,
        "Serial correlation regressions fitted."
    );

    let checks = [unconditional.failure, conditional.failure];
    Ok(TestVerdict::from_checks(
        ctx,
        &checks,
        VerdictData::SerialCorrelation(SerialCorrelationData {
            unconditional,
            conditional,
            fitted_mean,
            low_periods,
        }),
    ))
}

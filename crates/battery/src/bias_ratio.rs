//! Bias Ratio test.
//!
//! Compares how many returns land just above zero (`[0, σ]`) with how many land just below
//! it (`[-σ, 0)`). A manager who avoids reporting small losses pushes this ratio well above
//! one.

use crate::error::BatteryError;
use crate::verdict::{TestVerdict, VerdictData};
use crate::EntityContext;
use analytics::{clamp_probability, percentile, std_dev};
use serde::Serialize;

/// Ratios at or above this level are candidates for failure.
pub const RATIO_LIMIT: f64 = 2.5;

/// Slack when counting null ratios at least as large as the observed one.
const TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BiasRatioData {
    pub std_dev: f64,
    pub positive: usize,
    pub negative: usize,
    pub ratio: f64,
    pub p_value: f64,
    pub null_median_ratio: f64,
    pub failure: bool,
}

/// Counts returns in `[0, σ]` and `[-σ, 0)`.
fn band_counts(returns: &[f64], sigma: f64) -> (usize, usize) {
    returns.iter().fold((0, 0), |(pos, neg), &r| {
        if (0.0..=sigma).contains(&r) {
            (pos + 1, neg)
        } else if r >= -sigma && r < 0.0 {
            (pos, neg + 1)
        } else {
            (pos, neg)
        }
    })
}

/// Bias ratio of one null column. A column without small losses scores infinity.
fn null_ratio(column: &[f64]) -> Result<f64, BatteryError> {
    let (positive, negative) = band_counts(column, std_dev(column)?);
    Ok(if negative == 0 {
        f64::INFINITY
    } else {
        positive as f64 / negative as f64
    })
}

/// Median of the null ratios. Infinite ratios sort above every finite one, so the median
/// is read off the finite ratios at the matching rank, or is infinite once that rank falls
/// among the infinite ones.
fn null_median(ratios: &[f64]) -> Result<f64, BatteryError> {
    let finite: Vec<f64> = ratios.iter().copied().filter(|r| r.is_finite()).collect();
    let rank = ratios.len() as f64 / 2.0;
    if finite.is_empty() || rank + 0.5 > finite.len() as f64 {
        return Ok(f64::INFINITY);
    }
    Ok(percentile(&finite, 100.0 * rank / finite.len() as f64)?)
}

pub fn run(ctx: &EntityContext<'_>) -> Result<TestVerdict, BatteryError> {
    let returns = ctx.returns();
    let sigma = std_dev(returns)?;
    let (positive, negative) = band_counts(returns, sigma);
    if negative == 0 {
        return Err(BatteryError::DivisionByZero(format!(
            "no returns in [-{:.6}, 0) for the bias ratio of '{}'",
            sigma,
            ctx.name()
        )));
    }
    let ratio = positive as f64 / negative as f64;

    let null_ratios = ctx
        .null
        .columns()
        .map(null_ratio)
        .collect::<Result<Vec<f64>, BatteryError>>()?;
    let at_least = null_ratios
        .iter()
        .filter(|&&r| r >= ratio - TOLERANCE)
        .count();
    let p_value = clamp_probability(at_least as f64 / null_ratios.len() as f64, "bias ratio")?;

    let null_median_ratio = null_median(&null_ratios)?;

    let failure = ratio >= RATIO_LIMIT && p_value < ctx.params.a;
    tracing::debug!(
        entity = ctx.name(),
        ratio,
        p_value,
        failure,
        "Bias ratio computed."
    );

    Ok(TestVerdict::from_checks(
        ctx,
        &[failure],
        VerdictData::BiasRatio(BiasRatioData {
            std_dev: sigma,
            positive,
            negative,
            ratio,
            p_value,
            null_median_ratio,
            failure,
        }),
    ))
}

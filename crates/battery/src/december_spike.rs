//! December Spike test.
//!
//! Year-end is the usual window for flattering a track record. The statistic is the mean
//! December return minus the mean return of all other months, compared with the `(1 - a)`
//! percentile of the same spread over the null columns.

use crate::error::BatteryError;
use crate::verdict::{TestVerdict, VerdictData};
use crate::EntityContext;
use analytics::{clamp_probability, percentile};
use chrono::Datelike;
use serde::Serialize;

const DECEMBER: u32 = 12;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DecemberSpikeData {
    pub december_observations: usize,
    pub december_mean: f64,
    pub other_mean: f64,
    pub spread: f64,
    pub threshold: f64,
    /// Share of null spreads at or above the observed spread.
    pub p_value: f64,
    pub failure: bool,
}

/// December mean minus the mean of every other month, given the December mask.
fn spread(returns: &[f64], december: &[bool]) -> (f64, f64, f64) {
    let (mut dec_sum, mut dec_n, mut other_sum, mut other_n) = (0.0, 0usize, 0.0, 0usize);
    for (&r, &is_december) in returns.iter().zip(december) {
        if is_december {
            dec_sum += r;
            dec_n += 1;
        } else {
            other_sum += r;
            other_n += 1;
        }
    }
    let dec_mean = dec_sum / dec_n as f64;
    let other_mean = other_sum / other_n as f64;
    (dec_mean, other_mean, dec_mean - other_mean)
}

pub fn run(ctx: &EntityContext<'_>) -> Result<TestVerdict, BatteryError> {
    let december: Vec<bool> = ctx
        .dataset
        .dates()
        .iter()
        .map(|d| d.month() == DECEMBER)
        .collect();
    let december_observations = december.iter().filter(|&&d| d).count();
    if december_observations == 0 || december_observations == december.len() {
        return Err(BatteryError::NotEnoughData(format!(
            "{} of {} observations fall in December",
            december_observations,
            december.len()
        )));
    }

    let (december_mean, other_mean, observed) = spread(ctx.returns(), &december);
    let null_spreads = ctx.null.map_columns(|column| spread(column, &december).2);
    let threshold = percentile(&null_spreads, (1.0 - ctx.params.a) * 100.0)?;
    let at_least = null_spreads.iter().filter(|&&s| s >= observed).count();
    let p_value = clamp_probability(at_least as f64 / null_spreads.len() as f64, "december")?;

    let failure = observed > threshold;
    tracing::debug!(
        entity = ctx.name(),
        spread = observed,
        threshold,
        failure,
        "December spike computed."
    );

    Ok(TestVerdict::from_checks(
        ctx,
        &[failure],
        VerdictData::DecemberSpike(DecemberSpikeData {
            december_observations,
            december_mean,
            other_mean,
            spread: observed,
            threshold,
            p_value,
            failure,
        }),
    ))
}

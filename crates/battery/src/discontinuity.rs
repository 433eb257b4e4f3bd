//! Discontinuity-at-Zero (kink) test.
//!
//! Returns are binned into fixed-width bins. In an honest return density the bin just below
//! zero holds roughly the average of its two neighbours; a manager who turns small losses
//! into small gains hollows it out. The test compares the count in `[-w, 0)` with the mean of
//! the counts in `[-2w, -w)` and `[0, w)` using the multinomial variance of that difference.

use crate::error::BatteryError;
use crate::verdict::{TestVerdict, VerdictData};
use crate::EntityContext;
use analytics::{clamp_probability, standard_normal_cdf};
use serde::Serialize;

/// Histogram bin width.
pub const BIN_WIDTH: f64 = 0.005;

/// Below this binomial variance of the middle bin the continuity correction is applied.
const CONTINUITY_LIMIT: f64 = 25.0;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiscontinuityData {
    /// Counts in `[-2w, -w)`, `[-w, 0)` and `[0, w)`.
    pub bin_counts: [usize; 3],
    /// Middle-bin count after any continuity correction.
    pub adjusted_middle: f64,
    pub continuity_corrected: bool,
    pub proportions: [f64; 3],
    pub difference: f64,
    pub variance: f64,
    pub z_score: f64,
    pub p_value: f64,
    pub failure: bool,
}

fn bin_of(r: f64) -> i64 {
    (r / BIN_WIDTH).floor() as i64
}

pub fn run(ctx: &EntityContext<'_>) -> Result<TestVerdict, BatteryError> {
    let returns = ctx.returns();
    let mut bin_counts = [0usize; 3];
    for &r in returns {
        match bin_of(r) {
            -2 => bin_counts[0] += 1,
            -1 => bin_counts[1] += 1,
            0 => bin_counts[2] += 1,
            _ => {}
        }
    }

    let total = returns.len() as f64;
    let [c1, c2, c3] = bin_counts.map(|c| c as f64);

    let raw_p2 = c2 / total;
    let continuity_corrected = total * raw_p2 * (1.0 - raw_p2) < CONTINUITY_LIMIT;
    let middle = if continuity_corrected {
        (c2 - 0.5).max(0.0)
    } else {
        c2
    };

    let (p1, p2, p3) = (c1 / total, middle / total, c3 / total);
    let difference = middle - (c1 + c3) / 2.0;
    let variance = total
        * (p2 * (1.0 - p2)
            + 0.25 * (p1 * (1.0 - p1) + p3 * (1.0 - p3))
            + p1 * p2
            + p2 * p3
            - 0.5 * p1 * p3);
    if variance.is_nan() || variance <= 0.0 {
        return Err(BatteryError::DivisionByZero(format!(
            "kink variance is {} with bin counts {:?}",
            variance, bin_counts
        )));
    }

    let z_score = difference / variance.sqrt();
    let p_value = clamp_probability(2.0 * standard_normal_cdf(z_score)?, "kink")?;
    let failure = difference < 0.0 && p_value < ctx.params.a;

    tracing::debug!(
        entity = ctx.name(),
        ?bin_counts,
        z_score,
        p_value,
        failure,
        "Kink test computed."
    );

    Ok(TestVerdict::from_checks(
        ctx,
        &[failure],
        VerdictData::DiscontinuityAtZero(DiscontinuityData {
            bin_counts,
            adjusted_middle: middle,
            continuity_corrected,
            proportions: [p1, p2, p3],
            difference,
            variance,
            z_score,
            p_value,
            failure,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn run_on(returns: Vec<f64>) -> Result<TestVerdict, BatteryError> {
        let dataset = test_support::single(returns.clone());
        let null = test_support::null_for(&returns, 1000, 3);
        let params = test_support::params(0.05);
        let ctx = EntityContext::new(&dataset, 0, &null, &params).unwrap();
        run(&ctx)
    }

    fn data(verdict: &TestVerdict) -> &DiscontinuityData {
        match &verdict.data {
            VerdictData::DiscontinuityAtZero(data) => data,
            other => panic!("unexpected payload {:?}", other.kind()),
        }
    }

    /// `n1`, `n2` and `n3` returns in the three bins around zero, padded to 200 observations
    /// with returns far from zero.
    fn around_zero(n1: usize, n2: usize, n3: usize) -> Vec<f64> {
        let mut returns = Vec::new();
        returns.extend((0..n1).map(|i| -0.0075 + 0.00001 * i as f64));
        returns.extend((0..n2).map(|i| -0.0025 + 0.00001 * i as f64));
        returns.extend((0..n3).map(|i| 0.0025 + 0.00001 * i as f64));
        let padding = 200 - returns.len();
        returns.extend((0..padding).map(|i| {
            let magnitude = 0.03 + 0.0001 * i as f64;
            if i % 2 == 0 { magnitude } else { -magnitude }
        }));
        returns
    }

    #[test]
    fn bins_follow_floor_of_width() {
        assert_eq!(bin_of(-0.0075), -2);
        assert_eq!(bin_of(-0.005), -1);
        assert_eq!(bin_of(-0.0001), -1);
        assert_eq!(bin_of(0.0), 0);
        assert_eq!(bin_of(0.0049), 0);
    }

    #[test]
    fn hollow_bin_below_zero_fails() {
        let verdict = run_on(around_zero(30, 0, 30)).unwrap();
        let data = data(&verdict);
        assert_eq!(data.bin_counts, [30, 0, 30]);
        assert!(data.continuity_corrected);
        assert_eq!(data.adjusted_middle, 0.0);
        assert_eq!(data.difference, -30.0);
        // 200 * (0.25 * 2 * 0.15 * 0.85 - 0.5 * 0.15^2) = 10.5
        assert!((data.variance - 10.5).abs() < 1e-9);
        assert!(data.p_value < 1e-6);
        assert!(verdict.failure);
    }

    #[test]
    fn level_density_passes() {
        let verdict = run_on(around_zero(20, 20, 20)).unwrap();
        let data = data(&verdict);
        assert_eq!(data.bin_counts, [20, 20, 20]);
        assert!(data.continuity_corrected);
        assert_eq!(data.adjusted_middle, 19.5);
        assert!(data.p_value > 0.5);
        assert!(!verdict.failure);
    }

    #[test]
    fn crowded_bin_below_zero_never_fails() {
        let verdict = run_on(around_zero(10, 60, 10)).unwrap();
        let data = data(&verdict);
        assert!(!data.continuity_corrected);
        assert!(data.difference > 0.0);
        assert!(!verdict.failure);
    }

    #[test]
    fn empty_neighbourhood_is_an_error() {
        assert!(matches!(
            run_on(around_zero(0, 0, 0)),
            Err(BatteryError::DivisionByZero(_))
        ));
    }
}

//! Data Quality test.
//!
//! Five fabrication signatures, each measured on returns rounded to two decimals and compared
//! with the same measure over the entity's null columns:
//!
//! | Signature         | Fails when the observed value is       |
//! |-------------------|----------------------------------------|
//! | negative returns  | below the `a` percentile               |
//! | identical pairs   | above the `(1 - a)` percentile         |
//! | longest string    | above the `(1 - a)` percentile         |
//! | unique values     | below the `a` percentile               |
//! | zero returns      | above the `(1 - a)` percentile         |

use crate::error::BatteryError;
use crate::verdict::{TestVerdict, VerdictData};
use crate::EntityContext;
use analytics::{ecdf, percentile};
use itertools::Itertools;
use serde::Serialize;

const ROUNDING_SCALE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tail {
    Lower,
    Upper,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QualitySignature {
    pub statistic: f64,
    pub threshold: f64,
    /// Share of null values at or below the observed statistic.
    pub ecdf: f64,
    pub failure: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataQualityData {
    pub negative_returns: QualitySignature,
    pub identical_pairs: QualitySignature,
    pub longest_string: QualitySignature,
    pub unique_values: QualitySignature,
    pub zero_returns: QualitySignature,
}

/// The five statistics of one series.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Profile {
    negatives: f64,
    pairs: f64,
    longest: f64,
    unique: f64,
    zeros: f64,
}

impl Profile {
    fn of(returns: &[f64]) -> Self {
        // Integer keys avoid comparing rounded floats.
        let keys: Vec<i64> = returns
            .iter()
            .map(|r| (r * ROUNDING_SCALE).round() as i64)
            .collect();

        let runs: Vec<usize> = keys
            .iter()
            .chunk_by(|&&k| k)
            .into_iter()
            .map(|(_, run)| run.count())
            .collect();

        Self {
            negatives: keys.iter().filter(|&&k| k < 0).count() as f64,
            pairs: runs.iter().map(|len| len - 1).sum::<usize>() as f64,
            longest: runs.iter().max().map_or(0, |len| len - 1) as f64,
            unique: keys.iter().unique().count() as f64,
            zeros: keys.iter().filter(|&&k| k == 0).count() as f64,
        }
    }
}

fn signature(
    observed: f64,
    null: &[f64],
    tail: Tail,
    a: f64,
) -> Result<QualitySignature, BatteryError> {
    let (level, failure_of): (f64, fn(f64, f64) -> bool) = match tail {
        Tail::Lower => (a, |stat, threshold| stat < threshold),
        Tail::Upper => (1.0 - a, |stat, threshold| stat > threshold),
    };
    let threshold = percentile(null, level * 100.0)?;
    Ok(QualitySignature {
        statistic: observed,
        threshold,
        ecdf: ecdf(null, observed)?,
        failure: failure_of(observed, threshold),
    })
}

pub fn run(ctx: &EntityContext<'_>) -> Result<TestVerdict, BatteryError> {
    let a = ctx.params.a;
    let observed = Profile::of(ctx.returns());
    let null = ctx.null.map_columns(Profile::of);

    let pick = |field: fn(&Profile) -> f64| null.iter().map(field).collect::<Vec<f64>>();
    let data = DataQualityData {
        negative_returns: signature(observed.negatives, &pick(|p| p.negatives), Tail::Lower, a)?,
        identical_pairs: signature(observed.pairs, &pick(|p| p.pairs), Tail::Upper, a)?,
        longest_string: signature(observed.longest, &pick(|p| p.longest), Tail::Upper, a)?,
        unique_values: signature(observed.unique, &pick(|p| p.unique), Tail::Lower, a)?,
        zero_returns: signature(observed.zeros, &pick(|p| p.zeros), Tail::Upper, a)?,
    };

    let checks = [
        data.negative_returns.failure,
        data.identical_pairs.failure,
        data.longest_string.failure,
        data.unique_values.failure,
        data.zero_returns.failure,
    ];
    tracing::debug!(
        entity = ctx.name(),
        ?checks,
        "Data quality signatures computed."
    );

    Ok(TestVerdict::from_checks(
        ctx,
        &checks,
        VerdictData::DataQuality(data),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn run_on(returns: Vec<f64>, a: f64) -> TestVerdict {
        let dataset = test_support::single(returns.clone());
        let null = test_support::null_for(&returns, 1000, 10);
        let params = test_support::params(a);
        let ctx = EntityContext::new(&dataset, 0, &null, &params).unwrap();
        run(&ctx).unwrap()
    }

    fn data(verdict: &TestVerdict) -> &DataQualityData {
        match &verdict.data {
            VerdictData::DataQuality(data) => data,
            other => panic!("unexpected payload {:?}", other.kind()),
        }
    }

    /// 24 observations with a run of eight identical returns in the middle.
    fn with_long_string() -> Vec<f64> {
        let varied: Vec<f64> = (0..16).map(|i| -0.15 + 0.021 * i as f64).collect();
        let mut returns = varied[..8].to_vec();
        returns.extend([0.2; 8]);
        returns.extend_from_slice(&varied[8..]);
        returns
    }

    #[test]
    fn profile_counts_on_rounded_values() {
        let profile = Profile::of(&[0.011, 0.012, -0.004, 0.0, 0.001, -0.02, 0.05, 0.05, 0.05]);
        // Keys: 1, 1, 0, 0, 0, -2, 5, 5, 5.
        assert_eq!(profile.negatives, 1.0);
        assert_eq!(profile.pairs, 5.0);
        assert_eq!(profile.longest, 2.0);
        assert_eq!(profile.unique, 4.0);
        assert_eq!(profile.zeros, 3.0);
    }

    #[test]
    fn distinct_series_has_no_strings() {
        let profile = Profile::of(&[0.01, 0.02, 0.01, 0.03]);
        assert_eq!(profile.pairs, 0.0);
        assert_eq!(profile.longest, 0.0);
        assert_eq!(profile.unique, 3.0);
    }

    #[test]
    fn long_string_of_identical_returns_fails() {
        let verdict = run_on(with_long_string(), 0.05);
        let data = data(&verdict);
        assert_eq!(data.longest_string.statistic, 7.0);
        assert!(data.longest_string.threshold < 7.0);
        assert!(data.longest_string.failure);
        assert!(data.identical_pairs.failure);
        assert_eq!(data.longest_string.ecdf, 1.0);
        assert!(verdict.failure);
        assert_eq!(verdict.flags, 5);
    }

    #[test]
    fn thresholds_loosen_as_a_grows() {
        let returns = with_long_string();
        let strict = run_on(returns.clone(), 0.01);
        let lax = run_on(returns, 0.10);
        let (s, l) = (data(&strict), data(&lax));

        assert!(s.longest_string.threshold >= l.longest_string.threshold);
        assert!(s.zero_returns.threshold >= l.zero_returns.threshold);
        assert!(s.negative_returns.threshold <= l.negative_returns.threshold);
        assert!(s.unique_values.threshold <= l.unique_values.threshold);
        assert!(lax.failure_coefficient >= strict.failure_coefficient);
    }
}

//! # Misreporting Test Battery
//!
//! This crate contains the seven statistical tests run against every entity's reported
//! returns. Each test compares an observed statistic with a null distribution (a Monte Carlo
//! `NullMatrix`, a regression significance level or a theoretical law) and produces a
//! structured `TestVerdict`.
//!
//! ## Architectural Principles
//!
//! - **Layer 2 Logic:** This is a pure logic crate. It has no knowledge of files, threads or
//!   rendering. It depends only on `core-types`, `configuration`, `analytics` and `simulator`.
//! - **Explicit Data Flow:** The Low Correlation test returns the fitted series of its winning
//!   model alongside its verdict; the Serial Correlation test takes that series as an argument.
//!   The other five tests only need an `EntityContext`.
//! - **Errors Are Not Verdicts:** A test that cannot be computed returns a `BatteryError`.
//!   `TestVerdict::failure` is reserved for statistical findings.
//!
//! ## Public API
//!
//! - `EntityContext`: everything a test reads for one entity.
//! - `TestVerdict` / `VerdictData`: the common envelope and the per-test detail payloads.
//! - `low_correlation::run`, `serial_correlation::run` and `run_independent` for the rest.

pub mod bias_ratio;
pub mod data_quality;
pub mod december_spike;
pub mod digits;
pub mod discontinuity;
pub mod error;
pub mod low_correlation;
pub mod serial_correlation;
pub mod verdict;

pub use error::BatteryError;
pub use low_correlation::LowCorrelationOutcome;
pub use verdict::{TestVerdict, VerdictData};

use configuration::TestParameters;
use core_types::{Dataset, Entity, TestKind};
use simulator::NullMatrix;

/// Read-only inputs shared by every test for one entity.
#[derive(Debug, Clone, Copy)]
pub struct EntityContext<'a> {
    pub dataset: &'a Dataset,
    pub index: usize,
    pub entity: &'a Entity,
    pub null: &'a NullMatrix,
    pub params: &'a TestParameters,
}

impl<'a> EntityContext<'a> {
    pub fn new(
        dataset: &'a Dataset,
        index: usize,
        null: &'a NullMatrix,
        params: &'a TestParameters,
    ) -> Result<Self, BatteryError> {
        let entity = dataset.entity(index)?;
        if null.observations() != dataset.observations() {
            return Err(BatteryError::ShapeMismatch(format!(
                "null matrix has {} rows for {} observations",
                null.observations(),
                dataset.observations()
            )));
        }
        Ok(Self {
            dataset,
            index,
            entity,
            null,
            params,
        })
    }

    pub fn returns(&self) -> &'a [f64] {
        &self.entity.returns
    }

    pub fn name(&self) -> &'a str {
        &self.entity.name
    }
}

/// Runs one of the five tests that need nothing beyond the entity context.
///
/// Low Correlation and Serial Correlation have their own entry points because of the
/// fitted-series hand-off between them; asking for them here is a shape error.
pub fn run_independent(
    kind: TestKind,
    ctx: &EntityContext<'_>,
) -> Result<TestVerdict, BatteryError> {
    match kind {
        TestKind::BiasRatio => bias_ratio::run(ctx),
        TestKind::DecemberSpike => december_spike::run(ctx),
        TestKind::DiscontinuityAtZero => discontinuity::run(ctx),
        TestKind::DigitsConformity => digits::run(ctx),
        TestKind::DataQuality => data_quality::run(ctx),
        TestKind::LowCorrelation | TestKind::SerialCorrelation => {
            Err(BatteryError::ShapeMismatch(format!(
                "{} is not an independent test",
                kind
            )))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use configuration::TestParameters;
    use core_types::{Dataset, Entity, FactorMatrix};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};
    use simulator::{NullMatrix, NullSimulator};

    pub fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    pub fn normal_series(rng: &mut ChaCha8Rng, n: usize, mean: f64, sd: f64) -> Vec<f64> {
        let dist = Normal::new(mean, sd).unwrap();
        (0..n).map(|_| dist.sample(rng)).collect()
    }

    /// Month-end dates starting January 2000.
    pub fn month_ends(n: usize) -> Vec<NaiveDate> {
        let first = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                first
                    .checked_add_months(chrono::Months::new(i as u32 + 1))
                    .unwrap()
                    .pred_opt()
                    .unwrap()
            })
            .collect()
    }

    pub fn params(a: f64) -> TestParameters {
        TestParameters {
            a,
            simulations: 1000,
            style_factors_max: 1,
            decimals: 4,
            r2_switch: false,
            seed: Some(0),
        }
    }

    /// A dataset whose first entity is `returns`, plus the given peers and factors.
    pub fn dataset(returns: Vec<f64>, peers: Vec<Vec<f64>>, factors: Vec<Vec<f64>>) -> Dataset {
        let n = returns.len();
        let mut entities = vec![Entity {
            name: "Target".to_string(),
            returns,
            group: Some("Peers".to_string()),
        }];
        for (i, peer) in peers.into_iter().enumerate() {
            entities.push(Entity {
                name: format!("Peer {}", i + 1),
                returns: peer,
                group: Some("Peers".to_string()),
            });
        }
        let names = (0..factors.len()).map(|i| format!("F{}", i)).collect();
        Dataset::new(
            month_ends(n),
            entities,
            FactorMatrix {
                names,
                columns: factors,
            },
        )
        .unwrap()
    }

    /// A dataset with a single entity and one noise factor, for tests that ignore factors.
    pub fn single(returns: Vec<f64>) -> Dataset {
        let n = returns.len();
        let factor = (0..n).map(|i| ((i * 31 % 17) as f64 - 8.0) / 100.0).collect();
        dataset(returns, vec![], vec![factor])
    }

    pub fn null_for(returns: &[f64], simulations: usize, seed: u64) -> NullMatrix {
        NullSimulator::new(simulations)
            .unwrap()
            .simulate(returns, &mut simulator::entity_rng(seed, 0))
            .unwrap()
    }
}

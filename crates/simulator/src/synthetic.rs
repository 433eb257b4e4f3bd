use crate::error::SimulationError;
use chrono::{Datelike, Months, NaiveDate};
use core_types::{Dataset, Entity, FactorMatrix};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal, Uniform};

const FACTOR_NAMES: [&str; 6] = ["Market", "Size", "Value", "Momentum", "Carry", "Quality"];

/// Builds clean datasets: entity returns are a positive combination of normal style factors
/// plus small Gaussian noise, observed at month ends.
///
/// Nothing in the output is manipulated, which makes it the reference input for checking
/// that the battery stays quiet on honest data.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub entities: usize,
    pub observations: usize,
    pub factors: usize,
    pub seed: u64,
    /// Monthly mean and volatility of every style factor.
    pub factor_mean: f64,
    pub factor_volatility: f64,
    /// Volatility of the idiosyncratic noise added to each entity.
    pub noise_volatility: f64,
    pub start: NaiveDate,
}

impl Default for SyntheticDataset {
    fn default() -> Self {
        Self {
            entities: 3,
            observations: 252,
            factors: 3,
            seed: 0,
            factor_mean: 0.006,
            factor_volatility: 0.03,
            noise_volatility: 0.005,
            start: NaiveDate::from_ymd_opt(2000, 1, 31).unwrap_or_default(),
        }
    }
}

impl SyntheticDataset {
    pub fn build(&self) -> Result<Dataset, SimulationError> {
        if self.entities == 0 || self.observations < 2 || self.factors == 0 {
            return Err(SimulationError::InvalidRequest(format!(
                "{} entities x {} observations x {} factors",
                self.entities, self.observations, self.factors
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let factor_dist = Normal::new(self.factor_mean, self.factor_volatility).map_err(|_| {
            SimulationError::InvalidDistribution {
                mean: self.factor_mean,
                std_dev: self.factor_volatility,
            }
        })?;
        let noise_dist = Normal::new(0.0, self.noise_volatility).map_err(|_| {
            SimulationError::InvalidDistribution {
                mean: 0.0,
                std_dev: self.noise_volatility,
            }
        })?;
        let loading_dist = Uniform::new(0.3, 1.2);

        let columns: Vec<Vec<f64>> = (0..self.factors)
            .map(|_| {
                (0..self.observations)
                    .map(|_| factor_dist.sample(&mut rng))
                    .collect()
            })
            .collect();
        let names: Vec<String> = (0..self.factors).map(factor_name).collect();

        let entities = (0..self.entities)
            .map(|e| {
                let loadings: Vec<f64> = (0..self.factors)
                    .map(|_| rng.sample(loading_dist))
                    .collect();
                let returns = (0..self.observations)
                    .map(|t| {
                        let systematic: f64 = loadings
                            .iter()
                            .zip(&columns)
                            .map(|(beta, factor)| beta * factor[t])
                            .sum();
                        systematic + noise_dist.sample(&mut rng)
                    })
                    .collect();
                Entity {
                    name: format!("Fund {:02}", e + 1),
                    returns,
                    group: Some("Synthetic".to_string()),
                }
            })
            .collect();

        let dates = month_ends(self.start, self.observations)?;
        Ok(Dataset::new(dates, entities, FactorMatrix { names, columns })?)
    }
}

fn factor_name(index: usize) -> String {
    match FACTOR_NAMES.get(index) {
        Some(name) => name.to_string(),
        None => format!("Factor {}", index + 1),
    }
}

/// `count` consecutive month-end dates, starting from the month containing `start`.
fn month_ends(start: NaiveDate, count: usize) -> Result<Vec<NaiveDate>, SimulationError> {
    let first = NaiveDate::from_ymd_opt(start.year(), start.month(), 1)
        .ok_or_else(|| SimulationError::InvalidRequest(format!("bad start date {}", start)))?;
    (0..count)
        .map(|i| {
            first
                .checked_add_months(Months::new(i as u32 + 1))
                .and_then(|next| next.pred_opt())
                .ok_or_else(|| {
                    SimulationError::InvalidRequest("calendar overflow".to_string())
                })
        })
        .collect()
}

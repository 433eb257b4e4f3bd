use crate::error::SimulationError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Decimal places kept on every simulated return.
pub const NULL_DECIMALS: i32 = 4;

/// T x S matrix of simulated returns for one entity, stored column by column.
///
/// Each column is one synthetic return path of the same length as the observed series.
#[derive(Debug, Clone, PartialEq)]
pub struct NullMatrix {
    observations: usize,
    simulations: usize,
    data: Vec<f64>,
}

impl NullMatrix {
    /// Wraps pre-computed columns. All columns must share one non-zero length.
    pub fn from_columns(columns: Vec<Vec<f64>>) -> Result<Self, SimulationError> {
        let simulations = columns.len();
        if simulations == 0 {
            return Err(SimulationError::NoSimulations);
        }
        let observations = columns[0].len();
        if observations == 0 || columns.iter().any(|c| c.len() != observations) {
            return Err(SimulationError::InvalidRequest(
                "null columns must share one non-zero length".to_string(),
            ));
        }
        Ok(Self {
            observations,
            simulations,
            data: columns.into_iter().flatten().collect(),
        })
    }

    pub fn observations(&self) -> usize {
        self.observations
    }

    pub fn simulations(&self) -> usize {
        self.simulations
    }

    pub fn column(&self, index: usize) -> &[f64] {
        let start = index * self.observations;
        &self.data[start..start + self.observations]
    }

    pub fn columns(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.data.chunks_exact(self.observations)
    }

    /// Evaluates a statistic on every column, in column order.
    pub fn map_columns<T, F>(&self, statistic: F) -> Vec<T>
    where
        F: FnMut(&[f64]) -> T,
    {
        self.columns().map(statistic).collect()
    }
}

/// Draws null matrices matched to an observed return series.
#[derive(Debug, Clone, Copy)]
pub struct NullSimulator {
    simulations: usize,
}

impl NullSimulator {
    pub fn new(simulations: usize) -> Result<Self, SimulationError> {
        if simulations == 0 {
            return Err(SimulationError::NoSimulations);
        }
        Ok(Self { simulations })
    }

    pub fn simulations(&self) -> usize {
        self.simulations
    }

    /// Simulates `simulations` i.i.d. normal paths with the sample mean and standard
    /// deviation of `returns`, each value rounded to four decimals.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        returns: &[f64],
        rng: &mut R,
    ) -> Result<NullMatrix, SimulationError> {
        let mean = analytics::mean(returns)?;
        let std_dev = analytics::std_dev(returns)?;
        if !mean.is_finite() || !std_dev.is_finite() || std_dev <= 0.0 {
            return Err(SimulationError::InvalidDistribution { mean, std_dev });
        }
        let normal = Normal::new(mean, std_dev)
            .map_err(|_| SimulationError::InvalidDistribution { mean, std_dev })?;

        let observations = returns.len();
        let data: Vec<f64> = (0..observations * self.simulations)
            .map(|_| round_to(normal.sample(rng), NULL_DECIMALS))
            .collect();

        tracing::trace!(
            observations,
            simulations = self.simulations,
            mean,
            std_dev,
            "Null matrix simulated."
        );

        Ok(NullMatrix {
            observations,
            simulations: self.simulations,
            data,
        })
    }
}

/// Generator for one entity: the run seed selects the key, the entity index the stream.
///
/// Entities therefore draw from independent streams whatever order they are processed in.
pub fn entity_rng(run_seed: u64, entity_index: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(run_seed);
    rng.set_stream(entity_index as u64);
    rng
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

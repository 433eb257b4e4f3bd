use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Cannot simulate from an invalid normal distribution (mean {mean}, std dev {std_dev})")]
    InvalidDistribution { mean: f64, std_dev: f64 },

    #[error("Simulation count must be positive")]
    NoSimulations,

    #[error("Statistic error while parameterizing the null: {0}")]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("Synthetic dataset could not be built: {0}")]
    Dataset(#[from] core_types::CoreError),

    #[error("Invalid synthetic dataset request: {0}")]
    InvalidRequest(String),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] configuration::error::ConfigError),

    #[error("Simulation setup error: {0}")]
    Simulation(#[from] simulator::SimulationError),

    #[error("Failed to build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] core_types::CoreError),

    #[error("Aggregation error: {0}")]
    Analyzer(#[from] analyzer::AnalyzerError),
}

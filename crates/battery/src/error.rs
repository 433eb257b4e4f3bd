use thiserror::Error;

/// A computation failure inside one test for one entity.
///
/// This is never a statistical verdict: a test that cannot be computed returns one of these
/// instead of a `TestVerdict` with `failure = true`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatteryError {
    #[error("Statistic computation failed: {0}")]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("Dataset error: {0}")]
    Core(#[from] core_types::CoreError),

    #[error("Calculation error: Division by zero encountered in metric '{0}'")]
    DivisionByZero(String),

    #[error("Not enough data to perform calculation: {0}")]
    NotEnoughData(String),

    #[error("Input shape mismatch: {0}")]
    ShapeMismatch(String),
}

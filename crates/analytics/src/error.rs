use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Not enough data to perform calculation: {0}")]
    NotEnoughData(String),

    #[error("Calculation error: Division by zero encountered in metric '{0}'")]
    DivisionByZero(String),

    #[error("Regression design matrix is singular: {0}")]
    SingularMatrix(String),

    #[error("Input length mismatch: {0}")]
    LengthMismatch(String),

    #[error("Error in calculation: {0}")]
    Calculation(String),
}

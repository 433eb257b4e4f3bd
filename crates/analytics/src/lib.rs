//! # Statistic Primitives
//!
//! Shared numeric routines used by every test in the battery.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of datasets,
//!   configuration or the tests themselves; it works on plain `f64` slices.
//! - **Stateless Calculation:** Every routine is a free function returning a `Result`, so
//!   degenerate inputs surface as an `AnalyticsError` instead of a silent NaN.
//!
//! ## Public API
//!
//! - `percentile`, `ecdf`, `mean`, `std_dev`: descriptive statistics.
//! - `ols` / `OlsFit`: least squares with coefficient significance and adjusted R².
//! - `chi_square_gof`, `standard_normal_cdf`: distribution-based p-values.

pub mod descriptive;
pub mod distribution;
pub mod error;
pub mod regression;

// Re-export the key components to create a clean, public-facing API.
pub use descriptive::{clamp_probability, ecdf, mean, percentile, std_dev};
pub use distribution::{ChiSquareTest, chi_square_gof, standard_normal_cdf};
pub use error::AnalyticsError;
pub use regression::{OlsFit, ols};

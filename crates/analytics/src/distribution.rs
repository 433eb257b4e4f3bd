use crate::descriptive::clamp_probability;
use crate::error::AnalyticsError;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal, StudentsT};

/// Result of a chi-square goodness-of-fit test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChiSquareTest {
    pub observations: usize,
    pub statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
}

/// Pearson chi-square test of observed category counts against expected probabilities.
///
/// Degrees of freedom are `categories - 1`. Every expected count must be at least one
/// observation, otherwise the statistic is not meaningful and an error is returned.
pub fn chi_square_gof(
    counts: &[usize],
    probabilities: &[f64],
) -> Result<ChiSquareTest, AnalyticsError> {
    if counts.len() != probabilities.len() {
        return Err(AnalyticsError::LengthMismatch(format!(
            "{} categories observed but {} probabilities given",
            counts.len(),
            probabilities.len()
        )));
    }
    if counts.len() < 2 {
        return Err(AnalyticsError::NotEnoughData(
            "chi-square test needs at least 2 categories".to_string(),
        ));
    }

    let n: usize = counts.iter().sum();
    let total = n as f64;
    let mut statistic = 0.0;
    for (category, (&observed, &p)) in counts.iter().zip(probabilities).enumerate() {
        let expected = total * p;
        if expected < 1.0 {
            return Err(AnalyticsError::NotEnoughData(format!(
                "expected count {:.3} in category {} is below 1 ({} observations)",
                expected, category, n
            )));
        }
        let deviation = observed as f64 - expected;
        statistic += deviation * deviation / expected;
    }

    let degrees_of_freedom = counts.len() - 1;
    let distribution = ChiSquared::new(degrees_of_freedom as f64)
        .map_err(|e| AnalyticsError::Calculation(e.to_string()))?;
    let p_value = clamp_probability(1.0 - distribution.cdf(statistic), "chi-square")?;

    Ok(ChiSquareTest {
        observations: n,
        statistic,
        degrees_of_freedom,
        p_value,
    })
}

/// Standard normal cumulative distribution function.
pub fn standard_normal_cdf(z: f64) -> Result<f64, AnalyticsError> {
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| AnalyticsError::Calculation(e.to_string()))?;
    clamp_probability(normal.cdf(z), "normal cdf")
}

/// Two-sided p-value of a t-statistic with `degrees_of_freedom` degrees of freedom.
pub(crate) fn student_t_two_sided(
    t_statistic: f64,
    degrees_of_freedom: usize,
) -> Result<f64, AnalyticsError> {
    if t_statistic.is_infinite() {
        return Ok(0.0);
    }
    let distribution = StudentsT::new(0.0, 1.0, degrees_of_freedom as f64)
        .map_err(|e| AnalyticsError::Calculation(e.to_string()))?;
    clamp_probability(
        2.0 * (1.0 - distribution.cdf(t_statistic.abs())),
        "student t",
    )
}

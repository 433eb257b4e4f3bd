use crate::error::AnalyticsError;
use statrs::statistics::Statistics;

/// Arithmetic mean of a sample.
pub fn mean(values: &[f64]) -> Result<f64, AnalyticsError> {
    if values.is_empty() {
        return Err(AnalyticsError::NotEnoughData(
            "mean of an empty sample".to_string(),
        ));
    }
    Ok(values.iter().mean())
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> Result<f64, AnalyticsError> {
    if values.len() < 2 {
        return Err(AnalyticsError::NotEnoughData(format!(
            "standard deviation needs at least 2 observations, got {}",
            values.len()
        )));
    }
    Ok(values.iter().std_dev())
}

/// The `p`-th percentile (0-100) of a sample.
///
/// Uses linear interpolation between order statistics placed at plotting positions
/// `(i - 0.5) / n`; requests outside the first and last position return the sample minimum
/// and maximum respectively.
pub fn percentile(values: &[f64], p: f64) -> Result<f64, AnalyticsError> {
    if values.is_empty() {
        return Err(AnalyticsError::NotEnoughData(
            "percentile of an empty sample".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&p) {
        return Err(AnalyticsError::Calculation(format!(
            "percentile {} is outside [0, 100]",
            p
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AnalyticsError::Calculation(
            "percentile of a sample containing non-finite values".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let position = p / 100.0 * n as f64 + 0.5;
    if position <= 1.0 {
        return Ok(sorted[0]);
    }
    if position >= n as f64 {
        return Ok(sorted[n - 1]);
    }

    let lower = position.floor();
    let fraction = position - lower;
    let lo = lower as usize - 1;
    Ok(sorted[lo] + fraction * (sorted[lo + 1] - sorted[lo]))
}

/// Empirical CDF of `values` evaluated at `x`: the share of the sample at or below `x`.
pub fn ecdf(values: &[f64], x: f64) -> Result<f64, AnalyticsError> {
    if values.is_empty() {
        return Err(AnalyticsError::NotEnoughData(
            "empirical CDF of an empty sample".to_string(),
        ));
    }
    let below = values.iter().filter(|&&v| v <= x).count();
    clamp_probability(below as f64 / values.len() as f64, "ecdf")
}

/// Forces a probability into [0, 1]. A NaN is reported as a calculation error.
pub fn clamp_probability(p: f64, metric: &str) -> Result<f64, AnalyticsError> {
    if p.is_nan() {
        return Err(AnalyticsError::Calculation(format!(
            "probability for '{}' is not a number",
            metric
        )));
    }
    Ok(p.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_sample_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values).unwrap() - 5.0).abs() < 1e-12);
        // Sample variance is 32 / 7.
        assert!((std_dev(&values).unwrap() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(std_dev(&[1.0]).is_err());
        assert!(mean(&[]).is_err());
    }

    #[test]
    fn percentile_interpolates_between_plotting_positions() {
        let values = [4.0, 1.0, 3.0, 2.0];
        // Positions are 12.5, 37.5, 62.5, 87.5.
        assert_eq!(percentile(&values, 0.0).unwrap(), 1.0);
        assert_eq!(percentile(&values, 12.5).unwrap(), 1.0);
        assert!((percentile(&values, 50.0).unwrap() - 2.5).abs() < 1e-12);
        assert!((percentile(&values, 75.0).unwrap() - 3.5).abs() < 1e-12);
        assert_eq!(percentile(&values, 99.0).unwrap(), 4.0);
        assert!(percentile(&values, 101.0).is_err());
        assert!(percentile(&[], 50.0).is_err());
    }

    #[test]
    fn percentile_is_monotonic_in_p() {
        let values: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64).collect();
        let mut last = f64::NEG_INFINITY;
        for p in 0..=100 {
            let q = percentile(&values, p as f64).unwrap();
            assert!(q >= last);
            last = q;
        }
    }

    #[test]
    fn ecdf_counts_ties_as_below() {
        let values = [1.0, 2.0, 2.0, 3.0];
        assert_eq!(ecdf(&values, 2.0).unwrap(), 0.75);
        assert_eq!(ecdf(&values, 0.0).unwrap(), 0.0);
        assert_eq!(ecdf(&values, 10.0).unwrap(), 1.0);
    }

    #[test]
    fn clamp_rejects_nan() {
        assert_eq!(clamp_probability(1.0000001, "p").unwrap(), 1.0);
        assert_eq!(clamp_probability(-1e-12, "p").unwrap(), 0.0);
        assert!(clamp_probability(f64::NAN, "p").is_err());
    }
}

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub parameters: TestParameters,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Parameters shared by every test in the battery.
///
/// A single validated instance is created per run and handed to each test by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestParameters {
    /// Significance threshold, in [0.01, 0.10].
    pub a: f64,
    /// Number of Monte Carlo paths in each entity's null matrix.
    pub simulations: usize,
    /// Size of the style-factor combinations searched by the Low Correlation test.
    pub style_factors_max: usize,
    /// Digits kept before truncation in the Digit Conformity test.
    pub decimals: u32,
    /// Selects the change-point (switching) variant of the maximum R² search.
    pub r2_switch: bool,
    /// Run seed. When absent a seed is drawn at start-up and reported with the results.
    pub seed: Option<u64>,
}

impl TestParameters {
    pub const A_RANGE: (f64, f64) = (0.01, 0.10);
    pub const MIN_SIMULATIONS: usize = 1000;
    pub const STYLE_FACTORS_RANGE: (usize, usize) = (1, 3);
    pub const DECIMALS_RANGE: (u32, u32) = (2, 6);

    /// Checks every range and clamps `style_factors_max` to the available factor count.
    pub fn validate(mut self, factor_count: usize) -> Result<Self, ConfigError> {
        let (a_min, a_max) = Self::A_RANGE;
        if !(a_min..=a_max).contains(&self.a) {
            return Err(ConfigError::ValidationError(format!(
                "a must be between {} and {}, got {}",
                a_min, a_max, self.a
            )));
        }
        if self.simulations < Self::MIN_SIMULATIONS {
            return Err(ConfigError::ValidationError(format!(
                "simulations must be at least {}, got {}",
                Self::MIN_SIMULATIONS,
                self.simulations
            )));
        }
        let (sf_min, sf_max) = Self::STYLE_FACTORS_RANGE;
        if !(sf_min..=sf_max).contains(&self.style_factors_max) {
            return Err(ConfigError::ValidationError(format!(
                "style_factors_max must be between {} and {}, got {}",
                sf_min, sf_max, self.style_factors_max
            )));
        }
        let (d_min, d_max) = Self::DECIMALS_RANGE;
        if !(d_min..=d_max).contains(&self.decimals) {
            return Err(ConfigError::ValidationError(format!(
                "decimals must be between {} and {}, got {}",
                d_min, d_max, self.decimals
            )));
        }
        if factor_count == 0 {
            return Err(ConfigError::ValidationError(
                "at least one style factor is required".to_string(),
            ));
        }

        if self.style_factors_max > factor_count {
            tracing::warn!(
                requested = self.style_factors_max,
                available = factor_count,
                "style_factors_max exceeds the number of style factors; clamping."
            );
            self.style_factors_max = factor_count;
        }

        Ok(self)
    }

    /// Applies command-line overrides on top of the loaded values.
    pub fn apply(&mut self, overrides: &ParameterOverrides) {
        if let Some(a) = overrides.a {
            self.a = a;
        }
        if let Some(simulations) = overrides.simulations {
            self.simulations = simulations;
        }
        if let Some(style_factors_max) = overrides.style_factors_max {
            self.style_factors_max = style_factors_max;
        }
        if let Some(decimals) = overrides.decimals {
            self.decimals = decimals;
        }
        if let Some(r2_switch) = overrides.r2_switch {
            self.r2_switch = r2_switch;
        }
        if overrides.seed.is_some() {
            self.seed = overrides.seed;
        }
    }
}

impl Default for TestParameters {
    fn default() -> Self {
        Self {
            a: 0.10,
            simulations: 10_000,
            style_factors_max: 3,
            decimals: 4,
            r2_switch: false,
            seed: None,
        }
    }
}

/// Settings for the parallel engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineSettings {
    /// Worker threads. Defaults to the number of logical CPUs.
    pub threads: Option<usize>,
}

impl EngineSettings {
    pub fn worker_threads(&self) -> usize {
        self.threads.filter(|&n| n > 0).unwrap_or_else(num_cpus::get)
    }
}

/// Settings for the tracing subscriber installed by the binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is not set (e.g. "info", "battery=debug").
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// Optional per-run overrides, usually parsed from the command line.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct ParameterOverrides {
    /// Significance threshold (0.01 - 0.10).
    #[cfg_attr(feature = "clap", arg(long))]
    pub a: Option<f64>,
    /// Number of Monte Carlo simulations (>= 1000).
    #[cfg_attr(feature = "clap", arg(long))]
    pub simulations: Option<usize>,
    /// Style-factor combination size (1 - 3).
    #[cfg_attr(feature = "clap", arg(long))]
    pub style_factors_max: Option<usize>,
    /// Decimals kept for the digit conformity test (2 - 6).
    #[cfg_attr(feature = "clap", arg(long))]
    pub decimals: Option<u32>,
    /// Use the change-point variant of the maximum R² search.
    #[cfg_attr(feature = "clap", arg(long))]
    pub r2_switch: Option<bool>,
    /// Seed for the Monte Carlo generators.
    #[cfg_attr(feature = "clap", arg(long))]
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let params = TestParameters::default();
        assert_eq!(params.a, 0.10);
        assert_eq!(params.simulations, 10_000);
        assert_eq!(params.style_factors_max, 3);
        assert_eq!(params.decimals, 4);
        assert!(!params.r2_switch);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let cases = [
            TestParameters {
                a: 0.2,
                ..Default::default()
            },
            TestParameters {
                simulations: 999,
                ..Default::default()
            },
            TestParameters {
                style_factors_max: 0,
                ..Default::default()
            },
            TestParameters {
                decimals: 7,
                ..Default::default()
            },
        ];
        for params in cases {
            assert!(matches!(
                params.validate(5),
                Err(ConfigError::ValidationError(_))
            ));
        }
    }

    #[test]
    fn clamps_style_factors_to_available_count() {
        let params = TestParameters::default().validate(2).unwrap();
        assert_eq!(params.style_factors_max, 2);

        let params = TestParameters::default().validate(8).unwrap();
        assert_eq!(params.style_factors_max, 3);
    }

    #[test]
    fn overrides_replace_only_given_values() {
        let mut params = TestParameters::default();
        params.apply(&ParameterOverrides {
            a: Some(0.05),
            r2_switch: Some(true),
            ..Default::default()
        });
        assert_eq!(params.a, 0.05);
        assert!(params.r2_switch);
        assert_eq!(params.simulations, 10_000);
    }

    #[test]
    fn rejects_non_boolean_switch() {
        let parsed: Result<TestParameters, _> = serde_json::from_str(r#"{"r2_switch": "maybe"}"#);
        assert!(parsed.is_err());
    }
}

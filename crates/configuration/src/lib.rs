use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{Config, EngineSettings, LoggingSettings, ParameterOverrides, TestParameters};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "fraudlens.toml";

/// Prefix for environment overrides, e.g. `FRAUDLENS__PARAMETERS__A=0.05`.
pub const ENV_PREFIX: &str = "FRAUDLENS";

/// Loads the application configuration.
///
/// Reads the given TOML file (or `fraudlens.toml` if present), then overlays environment
/// variables. Every key is optional; missing values take their documented defaults.
/// The returned parameters are not yet validated, since validation needs the dataset's
/// factor count.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(p) => config::File::from(p).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_partial_file_with_defaults() {
        let dir = std::env::temp_dir().join(format!("fraudlens-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("partial.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[parameters]\na = 0.05\nr2_switch = true\n\n[engine]\nthreads = 2").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.parameters.a, 0.05);
        assert!(config.parameters.r2_switch);
        assert_eq!(config.parameters.simulations, 10_000);
        assert_eq!(config.engine.worker_threads(), 2);
        assert_eq!(config.logging.level, "info");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = load_config(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}

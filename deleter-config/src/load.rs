use std::io;
use std::path::PathBuf;

use config::builder::{ConfigBuilder, DefaultState};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Directory containing configuration files relative to the application root.
const CONFIGURATION_DIR: &str = "configuration";

/// File stem of the always-present base configuration document.
const BASE_CONFIG_STEM: &str = "base";

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "APP";

/// Separator between the environment variable prefix and key segments.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
const ENV_SEPARATOR: &str = "__";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The current working directory could not be determined.
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[from] io::Error),
    /// Reading or deserializing the configuration sources failed.
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),
}

/// Loads configuration from `configuration/base.yaml` (if present) with
/// `APP_`-prefixed environment variable overrides.
///
/// Nested keys use `__` as the separator, so `APP_BATCH__MAX_SIZE=50`
/// overrides `batch.max_size`. Environment variables always win over the
/// file, which makes container deployments straightforward.
pub fn load_config<T: DeserializeOwned>() -> Result<T, LoadError> {
    let configuration_dir = std::env::current_dir()?.join(CONFIGURATION_DIR);

    let settings = base_builder(configuration_dir).build()?;
    let config = settings.try_deserialize::<T>()?;

    Ok(config)
}

fn base_builder(configuration_dir: PathBuf) -> ConfigBuilder<DefaultState> {
    config::Config::builder()
        .add_source(
            config::File::from(configuration_dir.join(BASE_CONFIG_STEM))
                .format(config::FileFormat::Yaml)
                .required(false),
        )
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_PREFIX_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        )
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Probe {
        max_workers: u16,
    }

    #[test]
    fn environment_overrides_are_applied() {
        // SAFETY: tests in this module are the only ones touching this
        // variable, and cargo runs each test binary in its own process.
        unsafe { std::env::set_var("APP_MAX_WORKERS", "7") };

        let probe: Probe = load_config().expect("configuration should load");
        assert_eq!(probe.max_workers, 7);

        unsafe { std::env::remove_var("APP_MAX_WORKERS") };
    }
}

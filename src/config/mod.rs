mod types;

pub use types::*;

use crate::Result;
use std::{env, path::Path};
use tracing::debug;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Loads the configuration named by `CONFIG_PATH` (default `config.yaml`).
///
/// The service runs without a configuration file: when `CONFIG_PATH` is unset
/// and `config.yaml` does not exist, built-in defaults are returned.
pub async fn load() -> Result<Config> {
    let config_path = match env::var("CONFIG_PATH") {
        Ok(path) => path,
        Err(_) if !Path::new(DEFAULT_CONFIG_PATH).exists() => {
            debug!("No configuration file found, using defaults");
            return Ok(Config::default());
        }
        Err(_) => DEFAULT_CONFIG_PATH.to_string(),
    };

    debug!("Loading configuration from: {}", config_path);

    let config_str = tokio::fs::read_to_string(&config_path).await?;
    parse(&config_str)
}

pub fn parse(config_str: &str) -> Result<Config> {
    let config: Config = serde_yaml::from_str(config_str)?;
    config.validate()?;
    Ok(config)
}

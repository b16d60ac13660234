mod types;

pub use types::*;

use crate::Result;
use std::env;
use std::path::Path;
use tracing::debug;

pub const TEST_MODE_ENV: &str = "VERTEX_TEST_MODE";
pub const PORT_ENV: &str = "AIP_HTTP_PORT";

pub async fn load() -> Result<Config> {
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

    let mut config = load_from(Path::new(&config_path)).await?;
    config.apply_env_overrides(|key| env::var(key).ok())?;

    Ok(config)
}

/// Reads a YAML config file. A missing file yields the defaults.
pub async fn load_from(path: &Path) -> Result<Config> {
    if !tokio::fs::try_exists(path).await? {
        debug!("No configuration file at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    debug!("Loading configuration from: {}", path.display());

    let config_str = tokio::fs::read_to_string(path).await?;
    let config: Config = serde_yaml::from_str(&config_str)?;

    Ok(config)
}

impl Config {
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(TEST_MODE_ENV) {
            self.pipeline.test_mode = value.eq_ignore_ascii_case("true");
        }

        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port.trim().parse().map_err(|_| {
                crate::Error::config(format!("{} is not a valid port: '{}'", PORT_ENV, port))
            })?;
        }

        Ok(())
    }
}

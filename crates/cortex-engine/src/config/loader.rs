use super::schema::CortexConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./cortex.yaml
    /// 2. ~/.cortex/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<CortexConfig, ConfigError> {
        let local_config = PathBuf::from("./cortex.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = Self::home_dir() {
            let home_config = home.join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(CortexConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<CortexConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: CortexConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// `~/.cortex`, home of the config file and the persistent store.
    pub fn home_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".cortex"))
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Overrides the directory holding `config.toml` and `auth.json`.
pub const CONFIG_DIR_ENV: &str = "FILEBRIDGE_CONFIG_DIR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("\nNo configuration file found.\nRun `filebridge config` to create one.")]
    NotFound,

    #[error("Cannot determine a configuration directory")]
    NoConfigDir,

    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to write config file: {0}")]
    FileWrite(std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server_url: Option<String>,
    pub timeout_secs: u64,
    pub auth_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_url: None,
            timeout_secs: 60,
            auth_file: None,
        }
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push("filebridge");
        Ok(path)
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn from_file() -> Result<Self, ConfigError> {
        let config_path = Self::default_path()?;

        if !config_path.exists() {
            return Err(ConfigError::NotFound);
        }

        let content = fs::read_to_string(config_path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reads the config file when there is one, defaults otherwise.
    pub fn load_or_default() -> Self {
        match Self::from_file() {
            Ok(config) => config,
            Err(ConfigError::NotFound) => Config::default(),
            Err(e) => {
                log::warn!("[CONFIG] Ignoring configuration file: {}", e);
                Config::default()
            }
        }
    }

    pub fn save_to_file(&self) -> Result<PathBuf, ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        let path = Self::default_path()?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(ConfigError::FileWrite)?;
        }
        fs::write(&path, content).map_err(ConfigError::FileWrite)?;

        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.server_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "Server URL must start with http:// or https://, got `{}`",
                    url
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn auth_file_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.auth_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("auth.json")),
        }
    }
}

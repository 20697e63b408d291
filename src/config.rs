use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::duration::deserialize_duration;
use crate::scheduler::DEFAULT_REFRESH_INTERVAL;

/// Environment variable that overrides the configured quote API key.
pub const API_KEY_ENV_VAR: &str = "STOCKBOOK_API_KEY";

/// Quote provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotesConfig {
    /// Alpha Vantage API key. When unset (and no env override is present),
    /// the public demo key is used.
    pub api_key: Option<String>,
}

fn default_refresh_interval() -> std::time::Duration {
    DEFAULT_REFRESH_INTERVAL
}

/// Auto-refresh configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// How often the scheduler refreshes quotes, e.g. "5m", "1h".
    #[serde(
        default = "default_refresh_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub interval: std::time::Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: default_refresh_interval(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub quotes: QuotesConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => config_dir.join(dir),
            None => config_dir.to_path_buf(),
        }
    }
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./stockbook.toml` if it exists in current directory
/// 2. `~/.local/share/stockbook/stockbook.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("stockbook.toml");
    if local_config.exists() {
        return local_config;
    }

    // XDG data directory fallback
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("stockbook").join("stockbook.toml");
    }

    // Final fallback to local
    local_config
}

/// Configuration with all paths resolved, ready for use.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub data_dir: PathBuf,
    pub quotes: QuotesConfig,
    pub refresh: RefreshConfig,
}

impl ResolvedConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config = Config::load(path)?;
        Ok(Self::resolve(config, path))
    }

    pub fn load_or_default(path: &Path) -> Result<Self> {
        let config = Config::load_or_default(path)?;
        Ok(Self::resolve(config, path))
    }

    fn resolve(config: Config, config_path: &Path) -> Self {
        let config_dir = config_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            data_dir: config.resolve_data_dir(&config_dir),
            quotes: config.quotes,
            refresh: config.refresh,
        }
    }

    /// The quote API key to use: environment override first, then the config
    /// file. `None` means the provider falls back to the demo key.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV_VAR)
            .ok()
            .filter(|value| !value.is_empty())
            .or_else(|| self.quotes.api_key.clone())
    }
}

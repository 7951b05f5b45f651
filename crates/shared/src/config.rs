//! Configuration for the anime search client.
//!
//! Read from a TOML file. Every section and every key is optional; whatever
//! is missing takes the value from `Config::default()`. A loaded file is
//! validated before use.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest `limit` the Jikan search endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub logging: LoggingConfig,
    pub api: ApiConfig,
    pub search: SearchConfig,
}

/// Where files live on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root for logs and persisted state
    pub root_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root_dir: "data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Relative to the data directory unless absolute
    pub log_dir: String,

    /// trace, debug, info, warn or error
    pub default_level: String,

    /// Human-readable output on stderr
    pub console: bool,

    /// Daily rolling log files
    pub file: bool,

    /// Write file logs as JSON lines
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            default_level: "info".to_string(),
            console: true,
            file: true,
            json_format: false,
        }
    }
}

/// Jikan API access
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,

    /// Results per page, sent as `limit`
    pub page_size: u32,

    pub timeout_secs: u64,

    pub user_agent: String,

    pub rate_limit: RateLimitConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.jikan.moe/v4".to_string(),
            page_size: 20,
            timeout_secs: 30,
            user_agent: concat!("anime-search/", env!("CARGO_PKG_VERSION")).to_string(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Client-side throttling, kept under Jikan's published limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_second: f64,
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 3.0,
            requests_per_minute: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Quiet period before typed input becomes the active query
    pub debounce_ms: u64,

    /// Storage key holding the recent-search history
    pub history_key: String,

    /// Persisted client state, relative to the data directory unless absolute
    pub state_dir: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            history_key: "anime-search-history".to_string(),
            state_dir: "state".to_string(),
        }
    }
}

impl Config {
    /// Load and validate a TOML file. A missing file yields the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Write as TOML, e.g. to produce a starting config
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let api = &self.api;
        if api.page_size == 0 || api.page_size > MAX_PAGE_SIZE {
            bail!("api.page_size must be between 1 and {}", MAX_PAGE_SIZE);
        }
        if api.timeout_secs == 0 {
            bail!("api.timeout_secs must be positive");
        }
        let rps = api.rate_limit.requests_per_second;
        if rps.is_nan() || rps <= 0.0 {
            bail!("api.rate_limit.requests_per_second must be positive");
        }
        if api.rate_limit.requests_per_minute == 0 {
            bail!("api.rate_limit.requests_per_minute must be positive");
        }
        if self.search.history_key.trim().is_empty() {
            bail!("search.history_key must not be empty");
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.under_data_dir(&self.logging.log_dir)
    }

    /// Directory holding persisted client state (search history)
    pub fn state_dir(&self) -> PathBuf {
        self.under_data_dir(&self.search.state_dir)
    }

    fn under_data_dir(&self, dir: &str) -> PathBuf {
        let path = Path::new(dir);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data.root_dir, "data");
        assert_eq!(config.api.base_url, "https://api.jikan.moe/v4");
        assert_eq!(config.api.page_size, 20);
        assert_eq!(config.search.debounce_ms, 250);
        assert_eq!(config.search.history_key, "anime-search-history");
        assert!(config.api.user_agent.starts_with("anime-search/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_round_trip() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.search.debounce_ms = 400;
        config.api.rate_limit.requests_per_minute = 30;
        config.save(&path)?;

        let loaded = Config::from_file(&path)?;
        assert_eq!(loaded.search.debounce_ms, 400);
        assert_eq!(loaded.api.rate_limit.requests_per_minute, 30);
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_in_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[api]\npage_size = 10\n\n[logging]\ndefault_level = \"debug\"\n",
        )?;

        let loaded = Config::from_file(&path)?;
        assert_eq!(loaded.api.page_size, 10);
        assert_eq!(loaded.api.base_url, "https://api.jikan.moe/v4");
        assert_eq!(loaded.api.rate_limit.requests_per_second, 3.0);
        assert_eq!(loaded.logging.default_level, "debug");
        assert!(loaded.logging.file);
        assert_eq!(loaded.search.debounce_ms, 250);
        Ok(())
    }

    #[test]
    fn test_invalid_values_are_rejected() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[api]\npage_size = 50\n")?;

        let error = Config::from_file(&path).unwrap_err();
        assert!(format!("{:#}", error).contains("page_size"));

        let mut config = Config::default();
        config.api.rate_limit.requests_per_second = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.history_key = "  ".to_string();
        assert!(config.validate().is_err());
        Ok(())
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.data.root_dir, "data");
    }

    #[test]
    fn test_path_resolution() {
        let mut config = Config::default();
        assert!(config.log_dir().ends_with("data/logs"));
        assert!(config.state_dir().ends_with("data/state"));

        config.search.state_dir = "/var/lib/anime-search".to_string();
        assert_eq!(config.state_dir(), PathBuf::from("/var/lib/anime-search"));
    }
}

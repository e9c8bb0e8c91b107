use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SkipperError};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Locate-with-retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Mutation observer and periodic re-scan timing
    #[serde(default)]
    pub watch: WatchConfig,

    /// Group store location
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Locate attempts per shortcut press, the first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts (ms)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl RetryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_max_attempts() -> u32 {
    10
}

fn default_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Delay before re-searching after a player container is inserted (ms)
    #[serde(default = "default_rescan_delay_ms")]
    pub rescan_delay_ms: u64,

    /// Period of the background search while no video is cached (ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            rescan_delay_ms: default_rescan_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl WatchConfig {
    pub fn rescan_delay(&self) -> Duration {
        Duration::from_millis(self.rescan_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_rescan_delay_ms() -> u64 {
    500
}

fn default_poll_interval_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage area JSON file (overrides the default data-dir location)
    pub path: Option<String>,
}

impl Config {
    /// Load configuration from all sources (file, env, defaults)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &std::path::Path) -> Result<Self> {
        let config: Config = Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Config::default()))
            // Merge config file if exists
            .merge(Toml::file(config_path))
            // Merge environment variables (VIDEO_SKIPPER_RETRY__MAX_ATTEMPTS, ...).
            // STORE and EXTENSION_ID belong to the CLI flags, not the config tree.
            .merge(
                Env::prefixed("VIDEO_SKIPPER_")
                    .ignore(&["STORE", "EXTENSION_ID"])
                    .split("__"),
            )
            .extract()
            .map_err(|e| SkipperError::ConfigError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("video-skipper")
            .join("config.toml")
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| SkipperError::ConfigError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Group store file: explicit override, then `store.path`, then the data dir.
    pub fn store_path(&self, override_path: Option<&str>) -> PathBuf {
        match override_path.or(self.store.path.as_deref()) {
            Some(path) => PathBuf::from(shellexpand::tilde(path).into_owned()),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("video-skipper")
                .join("storage.json"),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(SkipperError::ConfigError(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.watch.poll_interval_ms == 0 {
            return Err(SkipperError::ConfigError(
                "watch.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

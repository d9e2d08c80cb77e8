//! Configuration file loading with precedence handling.

use crate::state::pagination::{
    PaginationConfig, DEFAULT_LOAD_COOLDOWN, DEFAULT_LOAD_MORE_THRESHOLD, DEFAULT_PAGE_SIZE,
};
use crate::state::switcher::DEFAULT_RESTORE_SUPPRESSION;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV_VAR: &str = "SMSVIEW_CONFIG";

/// Environment variable overriding the page size.
pub const PAGE_SIZE_ENV_VAR: &str = "SMSVIEW_PAGE_SIZE";

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to read config file (permission issues, not a file).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML syntax or unknown keys.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },

    /// A setting has a value outside its allowed range.
    #[error("Invalid value for {key}: {reason}")]
    Invalid {
        /// Setting name.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields are optional - if not specified, hardcoded defaults are used.
/// Corresponds to `~/.config/smsview/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Records per page.
    #[serde(default)]
    pub page_size: Option<u32>,

    /// Load-more trigger as a fraction of scroll height.
    #[serde(default)]
    pub load_more_threshold: Option<f64>,

    /// Pause after a page load, in milliseconds.
    #[serde(default)]
    pub load_cooldown_ms: Option<u64>,

    /// Upper bound of cache-priming suppression, in milliseconds.
    #[serde(default)]
    pub restore_suppression_ms: Option<u64>,

    /// Client-side cap on pinned senders.
    #[serde(default)]
    pub pinned_limit: Option<usize>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,
}

/// Resolved configuration after applying precedence rules.
///
/// Created by merging defaults, config file, env vars, and CLI args.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Records per page.
    pub page_size: u32,
    /// Load-more trigger fraction.
    pub load_more_threshold: f64,
    /// Pause after a page load.
    pub load_cooldown: Duration,
    /// Upper bound of cache-priming suppression.
    pub restore_suppression: Duration,
    /// Client-side cap on pinned senders.
    pub pinned_limit: Option<usize>,
    /// Path to log file for tracing output.
    pub log_file_path: PathBuf,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            load_more_threshold: DEFAULT_LOAD_MORE_THRESHOLD,
            load_cooldown: DEFAULT_LOAD_COOLDOWN,
            restore_suppression: DEFAULT_RESTORE_SUPPRESSION,
            pinned_limit: None,
            log_file_path: default_log_path(),
        }
    }
}

impl ResolvedConfig {
    /// Pagination tuning derived from this config.
    pub fn pagination(&self) -> PaginationConfig {
        PaginationConfig {
            page_size: self.page_size,
            load_more_threshold: self.load_more_threshold,
            cooldown: self.load_cooldown,
        }
    }

    /// Reject values the pagination machinery cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero page size or a threshold
    /// outside `(0, 1]`.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "page_size",
                reason: "must be at least 1".to_string(),
            });
        }
        let threshold = self.load_more_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Invalid {
                key: "load_more_threshold",
                reason: format!("{threshold} is not in (0, 1]"),
            });
        }
        Ok(self)
    }
}

/// Resolve default log file path.
///
/// Returns `~/.local/state/smsview/smsview.log` on Unix-like systems,
/// or appropriate platform path on other systems.
///
/// If state directory cannot be determined, falls back to current directory.
pub fn default_log_path() -> PathBuf {
    match dirs::state_dir() {
        Some(state_dir) => state_dir.join("smsview").join("smsview.log"),
        None => PathBuf::from("smsview.log"),
    }
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if file doesn't exist (not an error - use defaults).
///
/// # Errors
///
/// Returns error if file exists but has read or parse errors.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(config))
}

/// Resolve default config file path.
///
/// Returns `~/.config/smsview/config.toml` on Unix, appropriate path on other platforms.
/// Returns `None` if home directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("smsview").join("config.toml"))
}

/// Load configuration with precedence handling.
///
/// Precedence (highest to lowest):
/// 1. Explicit `config_path` argument (CLI `--config`)
/// 2. `SMSVIEW_CONFIG` environment variable
/// 3. Default path `~/.config/smsview/config.toml`
///
/// Missing config files are NOT errors - defaults are used.
///
/// # Errors
///
/// Returns error only if a config file exists but cannot be read or parsed.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        return load_config_file(PathBuf::from(env_path));
    }

    match default_config_path() {
        Some(default_path) => load_config_file(default_path),
        None => Ok(None),
    }
}

/// Apply environment variable overrides to resolved config.
///
/// Checks for `SMSVIEW_PAGE_SIZE`.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the variable is set but not a number.
pub fn apply_env_overrides(mut config: ResolvedConfig) -> Result<ResolvedConfig, ConfigError> {
    if let Ok(raw) = std::env::var(PAGE_SIZE_ENV_VAR) {
        config.page_size = raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: "page_size",
            reason: format!("{PAGE_SIZE_ENV_VAR}={raw:?} is not a number"),
        })?;
    }
    Ok(config)
}

/// Merge config file into defaults to create resolved config.
///
/// For each field in `ConfigFile`, if `Some(value)`, use it; otherwise use default.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let Some(config) = config_file else {
        return defaults;
    };

    ResolvedConfig {
        page_size: config.page_size.unwrap_or(defaults.page_size),
        load_more_threshold: config
            .load_more_threshold
            .unwrap_or(defaults.load_more_threshold),
        load_cooldown: config
            .load_cooldown_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.load_cooldown),
        restore_suppression: config
            .restore_suppression_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.restore_suppression),
        pinned_limit: config.pinned_limit.or(defaults.pinned_limit),
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
    }
}

/// Apply CLI argument overrides to resolved config.
///
/// CLI args have the highest precedence and override all other sources.
/// Only applies overrides for flags that were explicitly set by the user.
///
/// Precedence chain: Defaults → Config File → Env Vars → CLI Args (highest)
pub fn apply_cli_overrides(
    mut config: ResolvedConfig,
    page_size_override: Option<u32>,
    threshold_override: Option<f64>,
) -> ResolvedConfig {
    if let Some(page_size) = page_size_override {
        config.page_size = page_size;
    }
    if let Some(threshold) = threshold_override {
        config.load_more_threshold = threshold;
    }
    config
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;

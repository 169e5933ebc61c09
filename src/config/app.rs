//! Process configuration loading from `dashboard.toml` and the environment.
//!
//! The TOML file is optional: every field has a default so a bare checkout runs
//! against a local `SQLite` file. `DATABASE_URL` and `BIND_ADDRESS` override the
//! file, mirroring how the bot picks up secrets from `.env`.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{path::Path, time::Duration};
use tracing::{debug, info};

/// Name of the config file read when `BOT_DASHBOARD_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "dashboard.toml";

/// Configuration structure representing the entire dashboard.toml file
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Database connection string, e.g. `sqlite://data/bot_dashboard.sqlite?mode=rwc`
    pub database_url: String,
    pub server: ServerConfig,
    pub runtime: RuntimeConfig,
    pub activity_log: ActivityLogConfig,
}

/// HTTP listener settings for the REST boundary
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

/// Limits applied to every call into the Discord runtime
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Upper bound for connect, send and register calls
    pub request_timeout_secs: u64,
}

/// Retention and read window for the activity log
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ActivityLogConfig {
    /// Oldest entries beyond this count are pruned after each append
    pub max_entries: u64,
    /// Number of entries returned by a single read
    pub list_limit: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/bot_dashboard.sqlite?mode=rwc".to_string(),
            server: ServerConfig::default(),
            runtime: RuntimeConfig::default(),
            activity_log: ActivityLogConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 15,
        }
    }
}

impl Default for ActivityLogConfig {
    fn default() -> Self {
        Self {
            max_entries: 500,
            list_limit: 100,
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AppConfig {
    fn validate(&self) -> Result<()> {
        if self.runtime.request_timeout_secs == 0 {
            return Err(Error::Settings {
                message: "runtime.request_timeout_secs must be greater than zero".to_string(),
            });
        }
        if self.activity_log.list_limit == 0 || self.activity_log.max_entries == 0 {
            return Err(Error::Settings {
                message: "activity_log limits must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(address) = std::env::var("BIND_ADDRESS") {
            self.server.bind_address = address;
        }
    }
}

/// Parses a configuration from TOML text without touching the environment.
///
/// # Errors
/// Returns `Error::Settings` if the TOML syntax is invalid or a limit is zero.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Settings {
        message: format!("Failed to parse dashboard config: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file, falling back to defaults if it does not exist.
///
/// # Errors
/// Returns an error if:
/// - The file exists but cannot be read
/// - The TOML syntax is invalid
/// - A limit is set to zero
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    let mut config = if path_ref.exists() {
        debug!("Loading dashboard configuration from: {:?}", path_ref);
        let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Settings {
            message: format!("Failed to read config file {path_ref:?}: {e}"),
        })?;
        parse_config(&contents)?
    } else {
        info!("No config file at {:?}, using defaults", path_ref);
        AppConfig::default()
    };
    config.apply_env_overrides();
    Ok(config)
}

/// Loads configuration from `BOT_DASHBOARD_CONFIG` or `./dashboard.toml`.
///
/// # Errors
/// See [`load_config`].
pub fn load_app_configuration() -> Result<AppConfig> {
    let path =
        std::env::var("BOT_DASHBOARD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config(path)
}

/// Reads `DISCORD_BOT_TOKEN` from the environment, ignoring blank values.
///
/// Used once at boot to seed the stored token; the value is never logged.
#[must_use]
pub fn bootstrap_token() -> Option<String> {
    std::env::var("DISCORD_BOT_TOKEN")
        .ok()
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

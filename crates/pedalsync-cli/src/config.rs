//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use pedalsync_core::SessionConfig;
use serde::{Deserialize, Serialize};

/// Rider id used when neither the flag nor the config names one.
pub const DEFAULT_USER: &str = "rider";

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default rider id
    #[serde(default)]
    pub user: Option<String>,

    /// Database file (defaults to the platform data directory)
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,

    /// Live session tunables
    #[serde(default)]
    pub session: SessionSettings,
}

/// Tunables passed to the session controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Seconds between backend syncs.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Number of recent readings averaged for speed stats.
    #[serde(default = "default_speed_window")]
    pub speed_window: usize,

    /// Weight used when the profile has none.
    #[serde(default = "default_weight")]
    pub default_weight_kg: f64,

    /// Metabolic equivalent for calorie estimates.
    #[serde(default = "default_met")]
    pub met: f64,

    /// Stop the session when the sensor goes away.
    #[serde(default = "default_true")]
    pub stop_on_disconnect: bool,
}

fn default_sync_interval() -> u64 {
    pedalsync_core::config::DEFAULT_SYNC_INTERVAL.as_secs()
}

fn default_speed_window() -> usize {
    pedalsync_core::config::DEFAULT_SPEED_WINDOW
}

fn default_weight() -> f64 {
    pedalsync_core::config::DEFAULT_WEIGHT_KG
}

fn default_met() -> f64 {
    pedalsync_core::CYCLING_MET
}

fn default_true() -> bool {
    true
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            sync_interval_secs: default_sync_interval(),
            speed_window: default_speed_window(),
            default_weight_kg: default_weight(),
            met: default_met(),
            stop_on_disconnect: default_true(),
        }
    }
}

impl SessionSettings {
    /// Controller configuration, with an optional sync interval override.
    pub fn to_session_config(&self, sync_secs: Option<u64>) -> SessionConfig {
        let secs = sync_secs.unwrap_or(self.sync_interval_secs);
        SessionConfig::builder()
            .sync_interval(Duration::from_secs(secs))
            .speed_window(self.speed_window)
            .default_weight_kg(self.default_weight_kg)
            .met(self.met)
            .stop_on_disconnect(self.stop_on_disconnect)
            .build()
    }
}

impl Config {
    /// Get the default config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pedalsync")
            .join("config.toml")
    }

    /// Load config from file, or return default if not found
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config {}: {}", path.display(), e);
                }
            }
        }
        Self::default()
    }

    /// Save config to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Database path: flag, then config, then the platform default.
    pub fn database_path(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.database.clone())
            .unwrap_or_else(pedalsync_store::default_db_path)
    }
}

/// Resolve the rider id, preferring the explicit argument.
pub fn resolve_user(user: Option<String>, config: &Config) -> String {
    user.filter(|u| !u.trim().is_empty())
        .or_else(|| config.user.clone())
        .unwrap_or_else(|| DEFAULT_USER.to_string())
}

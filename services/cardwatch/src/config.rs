//! Configuration types for the cardwatch service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the backend serving the swagger proxy and diff endpoints
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Directory holding persisted registry state
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Refresh interval used when no persisted value exists
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            state_dir: default_state_dir(),
            refresh_interval_ms: default_refresh_interval_ms(),
            dashboard: DashboardConfig::default(),
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_dashboard_port(),
        }
    }
}

fn default_backend_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("cardwatch-state")
}

fn default_refresh_interval_ms() -> u64 {
    4000
}

fn default_true() -> bool {
    true
}

fn default_dashboard_port() -> u16 {
    8090
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::CardwatchError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

use crate::appspec::NormalizeOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("settings validation failed: {0}")]
    Settings(String),
}

fn default_poll_interval_seconds() -> u64 {
    10
}

fn default_app_tag() -> String {
    "release".to_string()
}

fn default_nest_parameter_groups() -> bool {
    true
}

/// Deployment settings for the remote services and the engine. The poll
/// interval is a configuration point on purpose: there is no timeout, and
/// whether a watchdog supervises long polls is a deployment decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub execution_url: String,
    pub object_store_url: String,
    pub catalog_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_app_tag")]
    pub app_tag: String,
    #[serde(default)]
    pub log_root: Option<PathBuf>,
    #[serde(default = "default_nest_parameter_groups")]
    pub nest_parameter_groups: bool,
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            nest_groups: self.nest_parameter_groups,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("execution_url", &self.execution_url),
            ("object_store_url", &self.object_store_url),
            ("catalog_url", &self.catalog_url),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Settings(format!("{field} must be non-empty")));
            }
        }
        if self.poll_interval_seconds == 0 {
            return Err(ConfigError::Settings(
                "poll_interval_seconds must be at least 1".to_string(),
            ));
        }
        if self.app_tag.trim().is_empty() {
            return Err(ConfigError::Settings("app_tag must be non-empty".to_string()));
        }
        Ok(())
    }
}

pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let settings: Settings = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    settings.validate()?;
    Ok(settings)
}

//! Configuration for the proofstage orchestrator.
//!
//! Precedence, highest first: environment variables, config file, built-in
//! defaults. The file is TOML and every table is optional; an empty file is
//! a valid configuration. Discovery looks at `PROOFSTAGE_CONFIG` first,
//! then the platform config directory.
//!
//! The config carries only orchestration-level knobs: where the backend
//! lives, how patient the HTTP client is, the two poll profiles, and the
//! merge-modify regeneration cap. Nothing here describes analysis
//! semantics.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;

use proofstage_utils::error::ConfigError;

/// Environment variable naming an explicit config file path.
pub const CONFIG_PATH_ENV: &str = "PROOFSTAGE_CONFIG";
/// Environment variable overriding the backend base URL.
pub const BASE_URL_ENV: &str = "PROOFSTAGE_BASE_URL";

const DEFAULT_BASE_URL: &str = "https://api.proofstage.io";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_JOB_POLL_INTERVAL_SECS: u64 = 3;
const DEFAULT_JOB_POLL_MAX_SECS: u64 = 600;
const DEFAULT_PROGRESS_POLL_INTERVAL_SECS: u64 = 2;
const DEFAULT_MAX_REGENERATE: u32 = 3;

/// Backend collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the analysis backend.
    pub base_url: String,
    /// Environment variable holding the API key, if the deployment needs
    /// one. The key itself never appears in config files.
    pub api_key_env: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Poll profile settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Background-job watching interval in seconds.
    pub job_interval_secs: u64,
    /// Background-job watching cap in seconds.
    pub job_max_duration_secs: u64,
    /// Autonomous-progress watching interval in seconds. This profile has
    /// no duration cap; it ends on a terminal progress report.
    pub progress_interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            job_interval_secs: DEFAULT_JOB_POLL_INTERVAL_SECS,
            job_max_duration_secs: DEFAULT_JOB_POLL_MAX_SECS,
            progress_interval_secs: DEFAULT_PROGRESS_POLL_INTERVAL_SECS,
        }
    }
}

impl PollConfig {
    #[must_use]
    pub const fn job_interval(&self) -> Duration {
        Duration::from_secs(self.job_interval_secs)
    }

    #[must_use]
    pub const fn job_max_duration(&self) -> Duration {
        Duration::from_secs(self.job_max_duration_secs)
    }

    #[must_use]
    pub const fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }
}

/// Merge-modify settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Maximum regenerations per apply-mode request, on top of the first
    /// generation.
    pub max_regenerate: u32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            max_regenerate: DEFAULT_MAX_REGENERATE,
        }
    }
}

/// Top-level proofstage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub poll: PollConfig,
    pub merge: MergeConfig,
}

impl Config {
    /// Load configuration with discovery and environment precedence.
    ///
    /// Order: `PROOFSTAGE_CONFIG` path (must exist if set), then the
    /// platform config directory, then defaults. `PROOFSTAGE_BASE_URL`
    /// overrides the file value either way.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when an explicitly named file is missing or
    /// unparseable, or when validation fails.
    pub fn discover() -> Result<Self, ConfigError> {
        let mut config = if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            Self::load(Utf8Path::new(&path))?
        } else if let Some(path) = default_config_path() {
            if path.exists() {
                Self::load(&path)?
            } else {
                debug!("no config file found, using defaults");
                Self::default()
            }
        } else {
            Self::default()
        };

        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            config.backend.base_url = base_url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file and validate it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on missing file, unreadable file, parse
    /// failure, or invalid values.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field-level constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "backend.base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "backend.base_url",
                reason: format!("expected an http(s) URL, got '{}'", self.backend.base_url),
            });
        }
        if self.backend.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "backend.request_timeout_secs",
                reason: "must be positive".to_string(),
            });
        }
        if self.poll.job_interval_secs == 0 || self.poll.progress_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "poll",
                reason: "intervals must be positive".to_string(),
            });
        }
        if self.poll.job_max_duration_secs < self.poll.job_interval_secs {
            return Err(ConfigError::InvalidValue {
                field: "poll.job_max_duration_secs",
                reason: "must be at least one interval".to_string(),
            });
        }
        if self.merge.max_regenerate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "merge.max_regenerate",
                reason: "must allow at least one regeneration".to_string(),
            });
        }
        Ok(())
    }
}

fn default_config_path() -> Option<Utf8PathBuf> {
    let dir = dirs::config_dir()?;
    let path = dir.join("proofstage").join("config.toml");
    Utf8PathBuf::from_path_buf(path).ok()
}

//! Configuration for the preview worker
//!
//! Loads and saves the preferred preview limits, the initially selected
//! device and worker timeouts as TOML.

use crate::types::{DeviceId, Size};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config file: {0}")]
    Read(#[source] io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write config file: {0}")]
    Write(#[source] io::Error),
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    pub preview: SizeConfig,
    pub device: DeviceConfig,
    pub worker: WorkerConfig,
}

/// Preview size limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeConfig {
    /// Requests are clamped to this width before negotiation
    pub preferred_width: u32,
    /// Requests are clamped to this height before negotiation
    pub preferred_height: u32,
    /// Size used by a restart when no preview was requested yet
    pub default_width: u32,
    pub default_height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device selected at startup (0 = back, 1 = front)
    pub default_device: DeviceId,
}

/// Command worker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub thread_name: String,
    /// How long `spawn` waits for the worker to publish its queue
    pub startup_timeout_ms: u64,
    /// How long `shutdown` waits for the worker thread to exit
    pub shutdown_timeout_ms: u64,
    /// How long a snapshot query waits for its reply
    pub query_timeout_ms: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            preview: SizeConfig {
                preferred_width: 1280,
                preferred_height: 720,
                default_width: 1920,
                default_height: 1080,
            },
            device: DeviceConfig {
                default_device: DeviceId::BACK,
            },
            worker: WorkerConfig {
                thread_name: "crabpreview-camera".to_string(),
                startup_timeout_ms: 2000,
                shutdown_timeout_ms: 2000,
                query_timeout_ms: 1000,
            },
        }
    }
}

impl SizeConfig {
    pub fn preferred(&self) -> Size {
        Size::new(self.preferred_width, self.preferred_height)
    }

    pub fn default_size(&self) -> Size {
        Size::new(self.default_width, self.default_height)
    }
}

impl WorkerConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl PreviewConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigFileError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(ConfigFileError::Read)?;
        let config: PreviewConfig = toml::from_str(&contents)?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigFileError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigFileError::Write)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string).map_err(ConfigFileError::Write)?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("crabpreview.toml")
    }

    /// Load from default location, falling back to defaults on any error
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.preview.preferred_width == 0 || self.preview.preferred_height == 0 {
            return Err("Preferred preview size must be non-zero".to_string());
        }
        if self.preview.default_width == 0 || self.preview.default_height == 0 {
            return Err("Default preview size must be non-zero".to_string());
        }
        if self.worker.thread_name.trim().is_empty() {
            return Err("Worker thread name must not be empty".to_string());
        }
        if self.worker.startup_timeout_ms == 0 {
            return Err("Startup timeout must be at least 1 ms".to_string());
        }
        if self.worker.query_timeout_ms == 0 {
            return Err("Query timeout must be at least 1 ms".to_string());
        }

        Ok(())
    }
}

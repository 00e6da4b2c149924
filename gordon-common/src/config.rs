//! Configuration loading and resolution
//!
//! The player reads a small TOML file at startup. Resolution order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory (`<config_dir>/gordon/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing file is never fatal: the player logs a warning and starts with
//! compiled defaults. A file that exists but does not parse is an error.

use crate::time::DEFAULT_SAMPLE_RATE;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "GORDON_CONFIG";

/// Player configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Session sample rate; decoded audio is normalized to this rate
    pub sample_rate: u32,

    /// Output device buffer length in milliseconds
    pub buffer_ms: u32,

    /// Initial volume (0-100 percent)
    pub volume_percent: u8,

    /// Default step for `forward` / `rewind`
    pub seek_step_seconds: f64,

    /// Step for `louder` / `quieter`
    pub volume_step_percent: u8,

    /// Marker slots created for each new session (grows on demand)
    pub marker_slots: usize,

    /// Directory for exported regions
    pub export_dir: PathBuf,

    /// Output device name (None = default device)
    pub device: Option<String>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_ms: 100,
            volume_percent: 100,
            seek_step_seconds: 5.0,
            volume_step_percent: 10,
            marker_slots: 10,
            export_dir: PathBuf::from("."),
            device: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PlayerConfig =
            toml::from_str(text).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        debug!("Reading config file {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Resolve and load configuration following the priority order above.
    ///
    /// An explicitly requested file (CLI or environment) that does not exist
    /// is reported as a warning and defaults are used.
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from);
        let candidate = resolve_config_path(cli_path, env_path.as_deref(), default_config_path());

        match candidate {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::load_file(&path)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                debug!("No config file location available, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be positive".to_string()));
        }
        if self.buffer_ms == 0 {
            return Err(Error::Config("buffer_ms must be positive".to_string()));
        }
        if self.volume_percent > 100 {
            return Err(Error::Config(format!(
                "volume_percent must be 0-100, got {}",
                self.volume_percent
            )));
        }
        if self.volume_step_percent > 100 {
            return Err(Error::Config(format!(
                "volume_step_percent must be 0-100, got {}",
                self.volume_step_percent
            )));
        }
        if self.marker_slots < 2 {
            return Err(Error::Config(
                "marker_slots must be at least 2 (start and end markers)".to_string(),
            ));
        }
        if !(self.seek_step_seconds.is_finite() && self.seek_step_seconds > 0.0) {
            return Err(Error::Config("seek_step_seconds must be positive".to_string()));
        }
        Ok(())
    }

    /// Output buffer length in frames at the configured sample rate
    pub fn buffer_frames(&self) -> u32 {
        ((self.sample_rate as u64 * self.buffer_ms as u64) / 1000).max(1) as u32
    }
}

/// Pick the config file path by priority: CLI, environment, platform default
pub fn resolve_config_path(
    cli_path: Option<&Path>,
    env_path: Option<&Path>,
    platform_default: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env_path {
        return Some(path.to_path_buf());
    }
    platform_default
}

/// Platform config file location (`~/.config/gordon/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gordon").join("config.toml"))
}

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::TrainLiveError;
use crate::logging::LogConfig;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration metadata
    #[serde(default)]
    pub metadata: ConfigMetadata,

    /// Rest/work countdown defaults
    #[serde(default)]
    pub timer: TimerSettings,

    /// Circuit runner defaults
    #[serde(default)]
    pub circuit: CircuitSettings,

    /// Run session pace estimation
    #[serde(default)]
    pub run: RunSettings,

    /// Upstream GPS fix filtering
    #[serde(default)]
    pub gps: GpsFilterSettings,

    /// Logging setup
    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            version: "1.0".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Rest/work timer defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerSettings {
    /// Rest countdown used when `start` is called without seconds
    pub default_rest_seconds: u32,

    /// Work countdown used when `start` is called without seconds
    pub default_work_seconds: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            default_rest_seconds: 90,
            default_work_seconds: 30,
        }
    }
}

/// Circuit runner defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitSettings {
    /// Exercise phase length for steps without a duration
    pub default_step_seconds: u32,
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self { default_step_seconds: 30 }
    }
}

/// Pace estimation tuning for run sessions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// GPS-reported speed below this is ignored for current pace (m/s)
    pub min_reliable_speed_mps: f64,

    /// Trailing distance used for rolling-window pace (meters)
    pub rolling_window_m: f64,

    /// Minimum trailing distance before a rolling pace is reported (meters)
    pub min_window_m: f64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            min_reliable_speed_mps: 0.5,
            rolling_window_m: 200.0,
            min_window_m: 50.0,
        }
    }
}

/// Acceptance policy applied to raw location fixes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsFilterSettings {
    /// Fixes with a worse horizontal accuracy are dropped (meters)
    pub max_accuracy_m: f64,

    /// Fixes closer than this to the last accepted fix are dropped (meters)
    pub min_movement_m: f64,
}

impl Default for GpsFilterSettings {
    fn default() -> Self {
        Self {
            max_accuracy_m: 30.0,
            min_movement_m: 5.0,
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".trainlive")
            .join("config.toml")
    }

    /// Load configuration, falling back to defaults when the file does not
    /// exist. A file that exists but fails to parse or validate is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject settings the state machines cannot run with
    pub fn validate(&self) -> std::result::Result<(), TrainLiveError> {
        let invalid = |message: String| Err(TrainLiveError::Configuration(message));

        if self.timer.default_rest_seconds == 0 || self.timer.default_work_seconds == 0 {
            return invalid("timer defaults must be greater than zero".to_string());
        }
        if self.circuit.default_step_seconds == 0 {
            return invalid("circuit.default_step_seconds must be greater than zero".to_string());
        }
        if self.run.min_reliable_speed_mps < 0.0 {
            return invalid("run.min_reliable_speed_mps must not be negative".to_string());
        }
        if self.run.min_window_m <= 0.0 || self.run.rolling_window_m < self.run.min_window_m {
            return invalid(format!(
                "run.rolling_window_m ({}) must be at least run.min_window_m ({}) and both positive",
                self.run.rolling_window_m, self.run.min_window_m
            ));
        }
        if self.gps.max_accuracy_m <= 0.0 || self.gps.min_movement_m < 0.0 {
            return invalid("gps thresholds must be positive".to_string());
        }
        Ok(())
    }
}

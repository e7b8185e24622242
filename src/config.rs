//! Configuration for laser-kinematics.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::outliers::{FirstFramePolicy, DEFAULT_THRESHOLD_MULTIPLIER};
use crate::loader::ColumnLayout;

/// Recording-level analysis parameters. Constant for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Video frame rate
    pub fps: f64,

    /// Number of laser events to analyze per subject
    pub event_count: usize,

    /// Outlier threshold in standard deviations above the mean delta
    pub threshold_multiplier: f64,

    /// Lookback used for the velocity signal (seconds)
    pub velocity_window_secs: f64,

    /// Distance of the pre/post samples from each laser edge (seconds)
    pub align_offset_secs: f64,

    /// What to do when frame 0 is flagged as an outlier
    pub first_frame_policy: FirstFramePolicy,

    /// How coordinate columns are located
    pub columns: ColumnLayout,

    /// Only analyze the first N frames of each recording
    pub max_frames: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fps: 10.0,
            event_count: 80,
            threshold_multiplier: DEFAULT_THRESHOLD_MULTIPLIER,
            velocity_window_secs: 0.5,
            align_offset_secs: 0.5,
            first_frame_policy: FirstFramePolicy::default(),
            columns: ColumnLayout::default(),
            max_frames: None,
        }
    }
}

impl AnalysisConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(ConfigError::Invalid {
                field: "fps",
                value: self.fps.to_string(),
            });
        }
        if self.event_count == 0 {
            return Err(ConfigError::Invalid {
                field: "event_count",
                value: self.event_count.to_string(),
            });
        }
        if !(self.threshold_multiplier.is_finite() && self.threshold_multiplier >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "threshold_multiplier",
                value: self.threshold_multiplier.to_string(),
            });
        }
        if self.max_frames == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_frames",
                value: "0".to_string(),
            });
        }
        self.velocity_window_frames()?;
        self.align_offset_frames()?;
        Ok(())
    }

    /// Velocity lookback in frames.
    pub fn velocity_window_frames(&self) -> Result<usize, ConfigError> {
        secs_to_frames("velocity_window_secs", self.velocity_window_secs, self.fps)
    }

    /// Pre/post sample offset in frames.
    pub fn align_offset_frames(&self) -> Result<usize, ConfigError> {
        secs_to_frames("align_offset_secs", self.align_offset_secs, self.fps)
    }
}

/// Round `secs * fps` to the nearest frame; zero frames is an error.
fn secs_to_frames(field: &'static str, secs: f64, fps: f64) -> Result<usize, ConfigError> {
    let frames = (secs * fps).round();
    if !frames.is_finite() || frames < 1.0 {
        return Err(ConfigError::Invalid {
            field,
            value: secs.to_string(),
        });
    }
    Ok(frames as usize)
}

/// Main configuration: analysis parameters plus output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Per-subject analysis parameters
    pub analysis: AnalysisConfig,

    /// Directory for summary exports
    pub export_path: PathBuf,

    /// Directory for the run ledger
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("laser-kinematics");

        Self {
            analysis: AnalysisConfig::default(),
            export_path: data_dir.join("exports"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file, falling back to defaults
    /// when it does not exist.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("laser-kinematics")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    /// A parameter is out of range
    Invalid { field: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid { field, value } => write!(f, "Invalid {field}: {value}"),
        }
    }
}

impl std::error::Error for ConfigError {}

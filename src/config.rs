use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for clipstitch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Output video settings
    pub video: VideoConfig,

    /// Timestamp stamping settings
    pub stamp: StampConfig,

    /// Intermediate conversion settings
    pub conversion: ConversionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            video: VideoConfig::default(),
            stamp: StampConfig::default(),
            conversion: ConversionConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|_| ConfigError::ParseFailed {
            path: path.display().to_string(),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.video.validate()?;
        self.stamp.validate()?;
        self.conversion.validate()?;
        Ok(())
    }
}

/// Output encoding parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Pipeline frame rate in Hz; intermediates are produced at this rate
    /// and gap math assumes it
    pub frame_rate: f64,

    /// FFmpeg codec identifier for the output encoder
    pub codec: String,

    /// Overwrite existing outputs and intermediates
    pub overwrite: bool,

    /// Remove partial output left behind by a dimension-mismatch abort.
    /// Off by default so the partial file can be inspected.
    pub discard_partial_output: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            codec: "libx264".to_string(),
            overwrite: true,
            discard_partial_output: false,
        }
    }
}

impl VideoConfig {
    fn validate(&self) -> Result<()> {
        if !(self.frame_rate > 0.0) || !self.frame_rate.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: "video.frame_rate".to_string(),
                value: self.frame_rate.to_string(),
            }
            .into());
        }

        if self.codec.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "video.codec".to_string(),
                value: self.codec.clone(),
            }
            .into());
        }

        Ok(())
    }
}

/// Where and how the timestamp is burned into each frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampConfig {
    /// Pixels from the left edge to the start of the text
    pub margin_x: u32,

    /// Pixels from the bottom edge up to the text baseline
    pub margin_y: u32,

    /// Integer glyph magnification (1 = 5x7 pixels per character)
    pub scale: u32,

    /// chrono format string for the displayed instant
    pub format: String,
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            margin_x: 10,
            margin_y: 30,
            scale: 2,
            format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

impl StampConfig {
    fn validate(&self) -> Result<()> {
        if self.scale == 0 {
            return Err(ConfigError::InvalidValue {
                key: "stamp.scale".to_string(),
                value: self.scale.to_string(),
            }
            .into());
        }

        if self.format.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "stamp.format".to_string(),
                value: self.format.clone(),
            }
            .into());
        }

        Ok(())
    }
}

/// Naming convention for raw clips and per-clip intermediates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Extension of raw recordings inside an experiment directory
    pub raw_extension: String,

    /// Prefix for intermediate per-clip files (`part_<stem>.mp4`)
    pub intermediate_prefix: String,

    /// Delete intermediates after a successful concatenation
    pub cleanup_intermediates: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            raw_extension: "MOV".to_string(),
            intermediate_prefix: "part_".to_string(),
            cleanup_intermediates: true,
        }
    }
}

impl ConversionConfig {
    fn validate(&self) -> Result<()> {
        if self.raw_extension.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "conversion.raw_extension".to_string(),
                value: self.raw_extension.clone(),
            }
            .into());
        }

        if self.intermediate_prefix.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "conversion.intermediate_prefix".to_string(),
                value: self.intermediate_prefix.clone(),
            }
            .into());
        }

        Ok(())
    }
}

use thiserror::Error;

/// Main error type for the clipstitch library
#[derive(Error, Debug)]
pub enum StitchError {
    #[error("Video I/O error: {0}")]
    Video(#[from] VideoError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Errors from decoding, probing, or encoding a single video file
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to open video: {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("Failed to probe video metadata: {path}: {reason}")]
    Probe { path: String, reason: String },

    #[error("Frame decode failed: {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Failed to start encoder: {reason}")]
    EncoderStart { reason: String },

    #[error("Encoder write failed: {reason}")]
    EncodeWrite { reason: String },

    #[error("Invalid frame dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Errors that abort an experiment run as a whole
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No usable input clips in: {path}")]
    NoInput { path: String },

    #[error(
        "Clip dimensions {actual_width}x{actual_height} do not match output \
         {expected_width}x{expected_height}: {path}"
    )]
    DimensionMismatch {
        path: String,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using StitchError
pub type Result<T> = std::result::Result<T, StitchError>;

impl StitchError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Errors that are contained at the clip boundary: the pipeline logs
    /// them, skips the clip, and carries on with the next segment.
    pub fn is_clip_local(&self) -> bool {
        matches!(
            self,
            Self::Video(VideoError::Open { .. })
                | Self::Video(VideoError::Probe { .. })
                | Self::Video(VideoError::Decode { .. })
        )
    }
}

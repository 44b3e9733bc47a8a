//! Error types for zamba.

use std::path::PathBuf;

/// Result type alias for zamba operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for zamba.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Model not found in configuration.
    #[error("model '{name}' not found in configuration")]
    ModelNotFound {
        /// Name of the missing model.
        name: String,
    },

    /// Model already exists in configuration.
    #[error("model '{name}' already exists in configuration")]
    ModelAlreadyExists {
        /// Name of the existing model.
        name: String,
    },

    /// Model file does not exist.
    #[error("model file does not exist: {path}")]
    ModelFileNotFound {
        /// Path to the missing model file.
        path: PathBuf,
    },

    /// Labels file does not exist.
    #[error("labels file does not exist: {path}")]
    LabelsFileNotFound {
        /// Path to the missing labels file.
        path: PathBuf,
    },

    /// Failed to read labels file.
    #[error("failed to read labels file '{path}'")]
    LabelsRead {
        /// Path to the labels file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No usable video inputs found.
    #[error("no video files found in the provided paths")]
    NoValidVideoFiles,

    /// The video container could not be opened or decoding failed.
    #[error("unreadable video '{path}': {reason}")]
    UnreadableVideo {
        /// Path to the video.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// A decoded frame has a pixel layout the preprocessor cannot normalize.
    #[error("unsupported frame format: {channels} channel(s) at {bit_depth} bits")]
    UnsupportedFrameFormat {
        /// Number of colour channels in the frame.
        channels: u8,
        /// Bits per channel.
        bit_depth: u8,
    },

    /// A video produced no usable frames.
    #[error("no usable frames sampled from '{path}'")]
    EmptySample {
        /// Path to the video.
        path: PathBuf,
    },

    /// Failed to build the classifier session.
    #[error("failed to build classifier: {reason}")]
    ClassifierBuild {
        /// Description of the build failure.
        reason: String,
    },

    /// A single inference call failed.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// Inference kept failing after every batch-size reduction.
    #[error("inference failed after {attempts} attempt(s): {reason}")]
    InferenceExhausted {
        /// Number of attempts made.
        attempts: usize,
        /// Description of the last failure.
        reason: String,
    },

    /// The model returned an output that cannot be a probability vector.
    #[error("invalid model output: {reason}")]
    ModelOutput {
        /// Description of the malformed output.
        reason: String,
    },

    /// Failed to write a report file.
    #[error("failed to write report '{path}'")]
    ReportWrite {
        /// Path to the report file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to parse a report file.
    #[error("failed to parse report '{path}': {reason}")]
    ReportParse {
        /// Path to the report file.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The run was cancelled before the video was processed.
    #[error("cancelled")]
    Cancelled,

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Whether this error must abort the whole run rather than a single video.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InferenceExhausted { .. } | Self::ModelOutput { .. }
        )
    }

    /// Short machine-readable code used in report rows.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnreadableVideo { .. } => "unreadable_video",
            Self::UnsupportedFrameFormat { .. } => "unsupported_frame_format",
            Self::EmptySample { .. } => "empty_sample",
            Self::Inference { .. } | Self::InferenceExhausted { .. } | Self::ModelOutput { .. } => {
                "inference_error"
            }
            Self::Cancelled => "cancelled",
            _ => "error",
        }
    }
}

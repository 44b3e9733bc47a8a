//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "zamba";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "ZAMBA_CONFIG";

/// Default number of frames sampled per video.
pub const DEFAULT_SAMPLE_COUNT: usize = 16;

/// Default presence threshold applied to aggregated probabilities.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Default number of frames sent to the classifier in one call.
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// Maximum allowed batch size to prevent accelerator memory exhaustion.
pub const MAX_BATCH_SIZE: usize = 512;

/// Default number of halving retries after an inference failure.
///
/// With the initial attempt this gives four tries, e.g. 8 → 4 → 2 → 1.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Default per-video wall-clock budget in seconds (0 disables the budget).
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Default number of labels counted as a frame's vote in top-k voting.
pub const DEFAULT_TOP_K: usize = 1;

/// Default seed for seeded-random frame sampling.
pub const DEFAULT_SEED: u64 = 42;

/// Default model input resolution.
pub mod input {
    /// Input width in pixels.
    pub const WIDTH: u32 = 224;
    /// Input height in pixels.
    pub const HEIGHT: u32 = 224;
    /// ImageNet channel means, applied after scaling to [0, 1].
    pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
    /// ImageNet channel standard deviations.
    pub const STD: [f32; 3] = [0.229, 0.224, 0.225];
}

/// Probability bounds.
pub mod probability {
    /// Minimum valid probability.
    pub const MIN: f32 = 0.0;
    /// Maximum valid probability.
    pub const MAX: f32 = 1.0;
}

/// Supported video container extensions.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "wmv", "m4v", "mpeg", "mpg", "webm", "3gp",
];

/// Supported still-image extensions for image-sequence clips.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

/// Report file names used when `--output` names a directory.
pub mod report_filenames {
    /// CSV prediction table.
    pub const CSV: &str = "zamba_predictions.csv";
    /// JSON report.
    pub const JSON: &str = "zamba_predictions.json";
    /// Most-likely label per video.
    pub const LABELS: &str = "zamba_labels.csv";
}

/// Status strings written into report rows.
pub mod status {
    /// Video scored successfully.
    pub const OK: &str = "ok";
    /// Video yielded no usable frames.
    pub const NO_DATA: &str = "no-data";
    /// Video could not be processed.
    pub const FAILED: &str = "failed";
}

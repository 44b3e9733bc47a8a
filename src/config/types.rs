//! Configuration type definitions.

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_SAMPLE_COUNT, DEFAULT_SEED,
    DEFAULT_THRESHOLD, DEFAULT_TIMEOUT_SECS, DEFAULT_TOP_K, input,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configured models by name.
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,

    /// Default settings.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Inference settings.
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// Configuration for a single model.
///
/// Everything the pipeline needs to know about a model beyond its weights
/// lives here: input geometry, normalization, frame sampling, aggregation
/// and decision thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX model file.
    pub path: PathBuf,

    /// Path to the labels file (one species label per line, in output order).
    pub labels: PathBuf,

    /// Activation applied to raw model outputs.
    #[serde(default)]
    pub activation: OutputActivation,

    /// Input tensor geometry and normalization.
    #[serde(default)]
    pub input: InputConfig,

    /// Frame sampling settings.
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Temporal aggregation and decision thresholds.
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

impl ModelConfig {
    /// Create a model entry with default pipeline settings.
    pub fn new(path: PathBuf, labels: PathBuf) -> Self {
        Self {
            path,
            labels,
            activation: OutputActivation::default(),
            input: InputConfig::default(),
            sampling: SamplingConfig::default(),
            aggregation: AggregationConfig::default(),
        }
    }
}

/// Activation applied to the model's raw output vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputActivation {
    /// Outputs are already probabilities.
    #[default]
    None,
    /// Independent per-label sigmoid (multi-label models).
    Sigmoid,
    /// Softmax across labels (single-label models).
    Softmax,
}

/// Memory layout of the input tensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// Batch, channels, height, width.
    #[default]
    Nchw,
    /// Batch, height, width, channels.
    Nhwc,
}

/// Input tensor geometry and normalization parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Input width in pixels.
    pub width: u32,
    /// Input height in pixels.
    pub height: u32,
    /// Tensor layout expected by the model.
    pub layout: TensorLayout,
    /// Per-channel mean subtracted after scaling pixels to [0, 1].
    pub mean: [f32; 3],
    /// Per-channel standard deviation divided after mean subtraction.
    pub std: [f32; 3],
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            width: input::WIDTH,
            height: input::HEIGHT,
            layout: TensorLayout::default(),
            mean: input::MEAN,
            std: input::STD,
        }
    }
}

/// Frame sampling policy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SamplingKind {
    /// Evenly spaced frames across the whole video.
    #[default]
    Uniform,
    /// Frames at configured fractional positions.
    Offsets,
    /// Random frames drawn from a fixed seed.
    Random,
}

/// Frame sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Number of frames sampled per video.
    pub count: usize,
    /// Sampling policy.
    pub policy: SamplingKind,
    /// Fractional positions in [0, 1) used by the `offsets` policy.
    pub offsets: Vec<f32>,
    /// Seed used by the `random` policy.
    pub seed: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_SAMPLE_COUNT,
            policy: SamplingKind::default(),
            offsets: Vec::new(),
            seed: DEFAULT_SEED,
        }
    }
}

/// Temporal aggregation selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationKind {
    /// Per-species mean of frame probabilities.
    #[default]
    Mean,
    /// Per-species maximum of frame probabilities.
    Max,
    /// Share of frames ranking the species among their top-k labels.
    TopKVote,
}

/// Aggregation and decision threshold settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Aggregation function.
    pub policy: AggregationKind,
    /// Labels per frame counted as votes by `top-k-vote`.
    pub top_k: usize,
    /// Default presence threshold (present when probability >= threshold).
    pub threshold: f32,
    /// Per-species threshold overrides.
    pub thresholds: BTreeMap<String, f32>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            policy: AggregationKind::default(),
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_THRESHOLD,
            thresholds: BTreeMap::new(),
        }
    }
}

/// Default run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Default model name to use.
    pub model: Option<String>,

    /// Maximum frames per inference call.
    pub batch_size: usize,

    /// Concurrent videos (0 = available parallelism).
    pub jobs: usize,

    /// Per-video wall-clock budget in seconds (0 = unlimited).
    pub timeout_secs: u64,

    /// Halving retries after an inference failure (0 = no retry).
    pub max_retries: usize,

    /// Report formats.
    pub formats: Vec<OutputFormat>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: None,
            batch_size: DEFAULT_BATCH_SIZE,
            jobs: 0,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            formats: vec![OutputFormat::Csv],
        }
    }
}

/// Inference device configuration.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum InferenceDevice {
    /// Automatically select (GPU if available, else CPU).
    #[default]
    Auto,
    /// Best available GPU provider, warn and fall back to CPU.
    Gpu,
    /// Force CPU inference.
    Cpu,
    /// NVIDIA CUDA, fail if unavailable.
    Cuda,
    /// NVIDIA `TensorRT`, fail if unavailable.
    #[value(name = "tensorrt")]
    TensorRt,
    /// Apple `CoreML`, fail if unavailable.
    #[value(name = "coreml")]
    CoreMl,
    /// Windows `DirectML`, fail if unavailable.
    #[value(name = "directml")]
    DirectMl,
}

/// Inference settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Device to use for inference.
    pub device: InferenceDevice,
}

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Per-video, per-species probability table.
    Csv,
    /// Full report with run metadata.
    Json,
    /// Most likely species per video.
    Labels,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
            Self::Labels => write!(f, "labels"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" | "table" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "labels" | "class-names" => Ok(Self::Labels),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

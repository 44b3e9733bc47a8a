//! CLI argument definitions.

use crate::cli::validators::{parse_positive, parse_probability};
use crate::config::{AggregationKind, InferenceDevice, OutputFormat, SamplingKind};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Species classification for camera trap videos.
#[derive(Debug, Parser)]
#[command(name = "zamba")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Videos, directories or image-sequence folders to classify.
    pub inputs: Vec<PathBuf>,

    /// Options for prediction runs.
    #[command(flatten)]
    pub predict: PredictArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage models.
    Models {
        /// Models action to perform.
        #[command(subcommand)]
        action: ModelsAction,
    },
    /// List ONNX Runtime execution providers usable on this machine.
    Providers,
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Models subcommand actions.
#[derive(Debug, Subcommand)]
pub enum ModelsAction {
    /// List configured models.
    List,
    /// Add a new model to configuration.
    Add {
        /// Name for this model (e.g., "african", "european").
        name: String,
        /// Path to the ONNX model file.
        #[arg(long)]
        path: PathBuf,
        /// Path to the labels file (one species per line).
        #[arg(long)]
        labels: PathBuf,
        /// Set as the default model.
        #[arg(long)]
        default: bool,
    },
    /// Verify model files exist and settings are valid.
    Check,
}

/// Arguments for a prediction run.
#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct PredictArgs {
    /// Model name from configuration.
    #[arg(short, long, env = "ZAMBA_MODEL")]
    pub model: Option<String>,

    /// Path to ONNX model file (overrides config).
    #[arg(long, env = "ZAMBA_MODEL_PATH", requires = "labels_path")]
    pub model_path: Option<PathBuf>,

    /// Path to labels file (overrides config).
    #[arg(long, env = "ZAMBA_LABELS_PATH")]
    pub labels_path: Option<PathBuf>,

    /// Directory for report files (default: current directory).
    #[arg(short, long, env = "ZAMBA_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Report formats (comma-separated: csv,json,labels).
    #[arg(short, long, value_delimiter = ',', env = "ZAMBA_FORMAT")]
    pub format: Option<Vec<OutputFormat>>,

    /// Maximum frames per inference call.
    #[arg(short, long, value_parser = parse_positive, env = "ZAMBA_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Frames sampled per video.
    #[arg(short = 'k', long, value_parser = parse_positive, env = "ZAMBA_SAMPLE_COUNT")]
    pub sample_count: Option<usize>,

    /// Default presence threshold (0.0-1.0).
    #[arg(short, long, value_parser = parse_probability, env = "ZAMBA_THRESHOLD")]
    pub threshold: Option<f32>,

    /// Videos processed concurrently (0 = all cores).
    #[arg(short, long, env = "ZAMBA_JOBS")]
    pub jobs: Option<usize>,

    /// Per-video time budget in seconds (0 = none).
    #[arg(long, env = "ZAMBA_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Frame aggregation policy.
    #[arg(long, value_enum, env = "ZAMBA_AGGREGATION")]
    pub aggregation: Option<AggregationKind>,

    /// Frame sampling policy.
    #[arg(long, value_enum, env = "ZAMBA_SAMPLING")]
    pub sampling: Option<SamplingKind>,

    /// Inference device.
    #[arg(long, value_enum, env = "ZAMBA_DEVICE", conflicts_with_all = ["gpu", "cpu"])]
    pub device: Option<InferenceDevice>,

    /// Use the best available GPU provider, falling back to CPU.
    #[arg(long, conflicts_with = "cpu")]
    pub gpu: bool,

    /// Force CPU inference.
    #[arg(long, conflicts_with = "gpu")]
    pub cpu: bool,

    /// Suppress progress output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace+ORT info, -vvv: trace+ORT debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable the progress bar.
    #[arg(long)]
    pub no_progress: bool,
}

impl PredictArgs {
    /// Device chosen on the command line, if any.
    #[must_use]
    pub const fn device_override(&self) -> Option<InferenceDevice> {
        if self.gpu {
            Some(InferenceDevice::Gpu)
        } else if self.cpu {
            Some(InferenceDevice::Cpu)
        } else {
            self.device
        }
    }
}

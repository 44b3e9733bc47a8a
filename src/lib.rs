//! Zamba - species classification for camera trap videos.
//!
//! Videos are decoded, a fixed number of frames is sampled and normalized,
//! an ONNX image classifier scores each frame and the per-frame scores are
//! aggregated into one species prediction per video.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod inference;
pub mod output;
pub mod pipeline;
pub mod video;

use clap::Parser;
use cli::{Cli, Command, PredictArgs};
use config::{
    Config, ModelConfig, config_file_path, load_default_config, save_default_config,
    validate_config, validate_model_settings,
};
use constants::MAX_BATCH_SIZE;
use inference::{BatchInferenceEngine, OnnxClassifier};
use output::{RunSettings, progress, write_report};
use pipeline::{
    AggregationPolicy, RunOptions, TemporalAggregator, Thresholds, VideoPipeline,
    collect_input_files, run_videos,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use video::{FramePreprocessor, SamplingPolicy};

pub use error::{Error, Result};

/// How a run that did not error ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every video was processed (possibly as no-data).
    Success,
    /// The report was written but at least one video failed.
    VideosFailed,
}

/// Main entry point for zamba CLI.
pub fn run() -> Result<RunStatus> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.predict.verbose, cli.predict.quiet);

    let cancel = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(&cancel);

    // Load configuration
    let config = load_default_config()?;

    // Handle subcommands
    if let Some(command) = cli.command {
        handle_command(command, &config)?;
        return Ok(RunStatus::Success);
    }

    // Show help if no inputs provided
    if cli.inputs.is_empty() {
        cli::help::print_smart_help(&config);
        return Ok(RunStatus::Success);
    }

    predict_videos(&cli.inputs, &cli.predict, &config, cancel)
}

/// First Ctrl+C cancels the run; a second one exits immediately.
fn install_interrupt_handler(cancel: &Arc<AtomicBool>) {
    let cancel = Arc::clone(cancel);
    if let Err(e) = ctrlc::set_handler(move || {
        if cancel.swap(true, Ordering::SeqCst) {
            std::process::exit(130); // 128 + SIGINT(2)
        }
        warn!("Interrupted, finishing videos in flight (Ctrl+C again to abort)");
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }
}

/// Resolve the model to use: explicit paths, then `-m`, then the default.
fn resolve_model(args: &PredictArgs, config: &Config) -> Result<(String, ModelConfig)> {
    if let (Some(path), Some(labels)) = (&args.model_path, &args.labels_path) {
        let name = path
            .file_stem()
            .map_or_else(|| "custom".to_string(), |s| s.to_string_lossy().into_owned());
        return Ok((name, ModelConfig::new(path.clone(), labels.clone())));
    }

    let model_name = args
        .model
        .clone()
        .or_else(|| config.defaults.model.clone())
        .ok_or_else(|| Error::ConfigValidation {
            message: "no model specified (use -m or set defaults.model in config)".to_string(),
        })?;

    let mut model = config::get_model(config, &model_name)?.clone();
    if let Some(labels) = &args.labels_path {
        model.labels.clone_from(labels);
    }
    Ok((model_name, model))
}

/// Classify input videos with the given options.
fn predict_videos(
    inputs: &[PathBuf],
    args: &PredictArgs,
    config: &Config,
    cancel: Arc<AtomicBool>,
) -> Result<RunStatus> {
    let total_start = Instant::now();
    validate_config(config)?;

    // Collect all input videos
    let videos = collect_input_files(inputs)?;
    if videos.is_empty() {
        return Err(Error::NoValidVideoFiles);
    }
    info!("Found {} video(s) to process", videos.len());

    // Resolve model configuration, CLI overrides first
    let (model_name, mut model) = resolve_model(args, config)?;
    if let Some(count) = args.sample_count {
        model.sampling.count = count;
    }
    if let Some(policy) = args.sampling {
        model.sampling.policy = policy;
    }
    if let Some(policy) = args.aggregation {
        model.aggregation.policy = policy;
    }
    if let Some(threshold) = args.threshold {
        model.aggregation.threshold = threshold;
    }
    validate_model_settings(&model_name, &model)?;

    // Resolve run settings
    let batch_size = args.batch_size.unwrap_or(config.defaults.batch_size);
    if batch_size > MAX_BATCH_SIZE {
        return Err(Error::ConfigValidation {
            message: format!("batch_size must be at most {MAX_BATCH_SIZE}, got {batch_size}"),
        });
    }
    let formats = args
        .format
        .clone()
        .unwrap_or_else(|| config.defaults.formats.clone());
    let timeout_secs = args.timeout.unwrap_or(config.defaults.timeout_secs);
    let options = RunOptions {
        jobs: args.jobs.unwrap_or(config.defaults.jobs),
        timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
    };
    let device = args.device_override().unwrap_or(config.inference.device);
    let output_dir = args.output.clone().unwrap_or_else(|| PathBuf::from("."));

    // Build the pipeline
    info!("Loading model: {model_name}");
    let classifier = OnnxClassifier::from_config(&model, device)?;
    let pipeline = Arc::new(VideoPipeline {
        sample_count: model.sampling.count,
        sampling: SamplingPolicy::from_config(&model.sampling),
        preprocessor: FramePreprocessor::new(&model.input),
        engine: BatchInferenceEngine::new(
            Arc::new(classifier),
            batch_size,
            config.defaults.max_retries,
        ),
        aggregator: TemporalAggregator::new(
            AggregationPolicy::from_config(&model.aggregation),
            Thresholds::from_config(&model.aggregation),
        ),
    });
    let settings = RunSettings {
        sample_count: pipeline.sample_count,
        sampling: pipeline.sampling.name().to_string(),
        aggregation: pipeline.aggregator.policy().name(),
        threshold: model.aggregation.threshold,
        batch_size,
    };

    // Process videos
    let progress_enabled = !args.quiet && !args.no_progress;
    let video_progress = progress::create_video_progress(videos.len(), progress_enabled);
    let report = match run_videos(
        &videos,
        &pipeline,
        &options,
        cancel,
        video_progress.as_ref(),
    ) {
        Ok(report) => report,
        Err(e) => {
            progress::finish_progress(video_progress, "Failed");
            return Err(e);
        }
    };
    progress::finish_progress(video_progress, "Complete");

    // Write reports
    write_report(&report, &output_dir, &formats, &model_name, &settings)?;

    // Summary
    let summary = report.summary();
    info!(
        "Complete: {} processed, {} no-data, {} failed in {:.2}s",
        summary.processed,
        summary.no_data,
        summary.failed,
        total_start.elapsed().as_secs_f64()
    );

    if summary.failed > 0 {
        warn!("{} video(s) failed", summary.failed);
        return Ok(RunStatus::VideosFailed);
    }
    Ok(RunStatus::Success)
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ORT logging is suppressed by default because provider fallback is
    // expected in auto mode. Use -v to see ORT warnings, -vv for info.
    let filter_str = if quiet {
        "warn,ort=off".to_string()
    } else {
        match verbose {
            0 => "info,ort=off".to_string(),
            1 => "debug,ort=warn".to_string(),
            2 => "trace,ort=info".to_string(),
            _ => "trace".to_string(), // -vvv: no ORT filter, full trace
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn handle_command(command: Command, config: &Config) -> Result<()> {
    match command {
        Command::Config { action } => handle_config_command(action),
        Command::Models { action } => handle_models_command(action, config),
        Command::Providers => {
            handle_providers_command();
            Ok(())
        }
    }
}

fn handle_providers_command() {
    use inference::provider::{GPU_PRIORITY, available_providers};

    let available = available_providers();

    println!("Execution providers:");
    println!();
    println!("  ✓ CPU (always available)");
    for provider in GPU_PRIORITY {
        let marker = if available.contains(&provider) { "✓" } else { "✗" };
        println!("  {marker} {}", provider.metadata().description);
    }

    println!();
    println!("To use a specific provider:");
    println!("  --gpu              Best available GPU, fallback to CPU");
    println!("  --cpu              Use CPU only");
    println!("  --device <name>    Require one provider (cuda, tensorrt, coreml, directml)");
    println!("  (default)          Auto-select (GPU if available, fallback to CPU)");
}

fn handle_config_command(action: cli::ConfigAction) -> Result<()> {
    use cli::ConfigAction;

    match action {
        ConfigAction::Init => {
            let path = config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
                println!("Use 'zamba models add' to add models.");
            } else {
                let config = Config::default();
                let saved_path = save_default_config(&config)?;
                println!("Created configuration file: {}", saved_path.display());
                println!("\nNext steps:");
                println!("  zamba models add <name> --path <model.onnx> --labels <labels.txt> --default");
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_default_config()?;
            println!("{config:#?}");
            Ok(())
        }
        ConfigAction::Path => {
            let path = config_file_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn handle_models_command(action: cli::ModelsAction, config: &Config) -> Result<()> {
    use cli::ModelsAction;

    match action {
        ModelsAction::List => {
            if config.models.is_empty() {
                println!("No models configured.");
            } else {
                println!("Configured models:");
                let mut names: Vec<_> = config.models.keys().collect();
                names.sort();
                for name in names {
                    let default_marker = config.defaults.model.as_ref().is_some_and(|d| d == name);
                    let model = &config.models[name];
                    println!(
                        "  {} ({}){}",
                        name,
                        model.path.display(),
                        if default_marker { " [default]" } else { "" }
                    );
                }
            }
            Ok(())
        }
        ModelsAction::Add {
            name,
            path,
            labels,
            default,
        } => handle_models_add(name, &path, &labels, default),
        ModelsAction::Check => {
            for (name, model) in &config.models {
                config::validate_model_config(name, model)?;
                println!("  {name}: OK");
            }
            Ok(())
        }
    }
}

/// Handle the `models add` command.
fn handle_models_add(name: String, path: &Path, labels: &Path, set_default: bool) -> Result<()> {
    // Validate files exist
    if !path.exists() {
        return Err(Error::ModelFileNotFound {
            path: path.to_path_buf(),
        });
    }
    if !labels.exists() {
        return Err(Error::LabelsFileNotFound {
            path: labels.to_path_buf(),
        });
    }

    let mut config = load_default_config()?;
    if config.models.contains_key(&name) {
        return Err(Error::ModelAlreadyExists { name });
    }

    config.models.insert(
        name.clone(),
        ModelConfig::new(path.to_path_buf(), labels.to_path_buf()),
    );
    if set_default {
        config.defaults.model = Some(name.clone());
    }

    let config_path = save_default_config(&config)?;

    println!("Added model '{name}'");
    println!("  Model: {}", path.display());
    println!("  Labels: {}", labels.display());
    println!("  Default: {}", if set_default { "yes" } else { "no" });
    println!("\nConfiguration saved to: {}", config_path.display());

    Ok(())
}

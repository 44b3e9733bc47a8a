//! End-to-end pipeline tests with a fake classifier and image-sequence clips.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use zamba::config::{InputConfig, OutputFormat};
use zamba::inference::{BatchInferenceEngine, FrameBatch, FrameClassifier};
use zamba::output::{ReportEntry, RunSettings, read_csv, write_report};
use zamba::pipeline::{
    AggregationPolicy, RunOptions, TemporalAggregator, Thresholds, VideoPipeline,
    collect_input_files, run_videos,
};
use zamba::video::{FramePreprocessor, SamplingPolicy};
use zamba::{Error, Result};

/// Scores `red` and `green` with the mean of the matching channel.
///
/// Frames whose red channel is saturated take longer, so bright clips finish
/// after dark ones.
struct ChannelClassifier {
    labels: Vec<String>,
    slow_red: Duration,
}

impl ChannelClassifier {
    fn new(slow_red: Duration) -> Self {
        Self {
            labels: vec!["red".to_string(), "green".to_string()],
            slow_red,
        }
    }
}

impl FrameClassifier for ChannelClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn classify(&self, batch: &FrameBatch) -> Result<Vec<Vec<f32>>> {
        let mut outputs = Vec::with_capacity(batch.len());
        for frame in batch.tensors().outer_iter() {
            let channel_mean = |c: usize| {
                frame
                    .index_axis(ndarray::Axis(0), c)
                    .mean()
                    .unwrap_or(0.0)
                    .clamp(0.0, 1.0)
            };
            let red = channel_mean(0);
            if red > 0.9 {
                std::thread::sleep(self.slow_red);
            }
            outputs.push(vec![red, channel_mean(1)]);
        }
        Ok(outputs)
    }
}

/// Fails every call, as a model that cannot fit any batch would.
struct OutOfMemoryClassifier {
    labels: Vec<String>,
    calls: AtomicUsize,
}

impl FrameClassifier for OutOfMemoryClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn classify(&self, _batch: &FrameBatch) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::Inference {
            reason: "CUDA out of memory".to_string(),
        })
    }
}

fn pipeline(classifier: Arc<dyn FrameClassifier>) -> Arc<VideoPipeline> {
    let input = InputConfig {
        width: 8,
        height: 8,
        mean: [0.0; 3],
        std: [1.0; 3],
        ..InputConfig::default()
    };
    Arc::new(VideoPipeline {
        sample_count: 3,
        sampling: SamplingPolicy::UniformStride,
        preprocessor: FramePreprocessor::new(&input),
        engine: BatchInferenceEngine::new(classifier, 2, 2),
        aggregator: TemporalAggregator::new(AggregationPolicy::Mean, Thresholds::uniform(0.5)),
    })
}

/// Write a clip of `frames` solid-colour stills into `root/name`.
fn clip(root: &Path, name: &str, colour: [u8; 3], frames: usize) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    for i in 0..frames {
        RgbImage::from_pixel(16, 12, Rgb(colour))
            .save(dir.join(format!("frame_{i:04}.png")))
            .unwrap();
    }
    dir
}

fn settings() -> RunSettings {
    RunSettings {
        sample_count: 3,
        sampling: "uniform".to_string(),
        aggregation: "mean".to_string(),
        threshold: 0.5,
        batch_size: 2,
    }
}

#[test]
fn test_run_reports_every_video_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("videos");
    clip(&root, "a_red", [255, 0, 0], 5);
    clip(&root, "b_green", [0, 255, 0], 7);
    let broken = clip(&root, "c_broken", [0, 0, 0], 1);
    std::fs::write(broken.join("frame_0001.png"), b"not a png").unwrap();
    clip(&root, "d_dark", [0, 0, 0], 2);

    let videos = collect_input_files(&[root]).unwrap();
    assert_eq!(videos.len(), 4);

    let options = RunOptions {
        jobs: 4,
        timeout: Some(Duration::from_secs(60)),
    };
    let report = run_videos(
        &videos,
        &pipeline(Arc::new(ChannelClassifier::new(Duration::from_millis(50)))),
        &options,
        Arc::new(AtomicBool::new(false)),
        None,
    )
    .unwrap();

    let order: Vec<&Path> = report.entries().iter().map(ReportEntry::video).collect();
    assert_eq!(order, videos.iter().map(PathBuf::as_path).collect::<Vec<_>>());

    let summary = report.summary();
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 1);

    match &report.entries()[0] {
        ReportEntry::Predicted(p) => {
            assert_eq!(p.frame_count(), 3);
            assert_eq!(p.top_species().unwrap().species, "red");
            assert!(!p.score("green").unwrap().present);
        }
        ReportEntry::Failed(f) => panic!("unexpected failure: {}", f.message),
    }
    match &report.entries()[2] {
        ReportEntry::Failed(f) => assert_eq!(f.code, "unreadable_video"),
        ReportEntry::Predicted(_) => panic!("corrupt frame must fail the clip"),
    }
    match &report.entries()[3] {
        ReportEntry::Predicted(p) => {
            assert_eq!(p.frame_count(), 2);
            assert!(p.scores().iter().all(|s| !s.present && s.probability == 0.0));
        }
        ReportEntry::Failed(f) => panic!("unexpected failure: {}", f.message),
    }
}

#[test]
fn test_csv_report_parses_back() {
    let dir = tempfile::tempdir().unwrap();
    let videos = vec![
        clip(dir.path(), "green", [0, 255, 0], 4),
        dir.path().join("missing.mp4"),
    ];

    let report = run_videos(
        &videos,
        &pipeline(Arc::new(ChannelClassifier::new(Duration::ZERO))),
        &RunOptions::default(),
        Arc::new(AtomicBool::new(false)),
        None,
    )
    .unwrap();

    let out = dir.path().join("results");
    let written = write_report(
        &report,
        &out,
        &[OutputFormat::Csv, OutputFormat::Labels],
        "channels",
        &settings(),
    )
    .unwrap();

    let rows = read_csv(&written[0]).unwrap();
    assert_eq!(rows, report.rows());
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].species.as_deref(), Some("green"));
    assert_eq!(rows[1].present, Some(true));
    assert_eq!(rows[2].status, "failed");

    let labels = std::fs::read_to_string(&written[1]).unwrap();
    assert!(labels.lines().nth(1).unwrap().ends_with(",green"));
    assert!(labels.lines().nth(2).unwrap().ends_with(",failed"));
}

#[test]
fn test_slow_video_times_out_without_affecting_others() {
    let dir = tempfile::tempdir().unwrap();
    let videos = vec![
        clip(dir.path(), "a_green", [0, 255, 0], 3),
        clip(dir.path(), "b_red", [255, 0, 0], 3),
        clip(dir.path(), "c_dark", [0, 0, 0], 3),
    ];

    let report = run_videos(
        &videos,
        &pipeline(Arc::new(ChannelClassifier::new(Duration::from_secs(2)))),
        &RunOptions {
            jobs: 3,
            timeout: Some(Duration::from_millis(500)),
        },
        Arc::new(AtomicBool::new(false)),
        None,
    )
    .unwrap();

    let order: Vec<&Path> = report.entries().iter().map(ReportEntry::video).collect();
    assert_eq!(order, videos.iter().map(PathBuf::as_path).collect::<Vec<_>>());

    let statuses: Vec<&str> = report.entries().iter().map(ReportEntry::status).collect();
    assert_eq!(statuses, vec!["ok", "failed", "ok"]);
    match &report.entries()[1] {
        ReportEntry::Failed(f) => {
            assert_eq!(f.code, "unreadable_video");
            assert!(f.message.contains("timed out"), "{}", f.message);
        }
        ReportEntry::Predicted(_) => panic!("slow clip must exceed its budget"),
    }
    assert_eq!(report.summary().failed, 1);
}

#[test]
fn test_exhausted_inference_retries_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let videos = vec![clip(dir.path(), "a", [10, 10, 10], 4)];
    let classifier = Arc::new(OutOfMemoryClassifier {
        labels: vec!["blank".to_string()],
        calls: AtomicUsize::new(0),
    });

    let result = run_videos(
        &videos,
        &pipeline(Arc::clone(&classifier) as Arc<dyn FrameClassifier>),
        &RunOptions {
            jobs: 1,
            timeout: None,
        },
        Arc::new(AtomicBool::new(false)),
        None,
    );

    assert!(matches!(
        result,
        Err(Error::InferenceExhausted { attempts: 2, .. })
    ));
    // Batch of 2, then 1, then no smaller size is left.
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
}

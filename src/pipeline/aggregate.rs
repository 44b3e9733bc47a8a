//! Temporal aggregation of per-frame predictions into one video prediction.

use crate::config::{AggregationConfig, AggregationKind};
use crate::inference::PredictionVector;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// How per-frame probabilities are combined for each species.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationPolicy {
    /// Mean of frame probabilities.
    Mean,
    /// Highest frame probability.
    Max,
    /// Fraction of frames ranking the species among their `k` most probable labels.
    TopKVote {
        /// Labels per frame that receive a vote.
        k: usize,
    },
}

impl AggregationPolicy {
    /// Build the policy described by a model's aggregation settings.
    #[must_use]
    pub fn from_config(config: &AggregationConfig) -> Self {
        match config.policy {
            AggregationKind::Mean => Self::Mean,
            AggregationKind::Max => Self::Max,
            AggregationKind::TopKVote => Self::TopKVote {
                k: config.top_k.max(1),
            },
        }
    }

    /// Short name used in logs and report metadata.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Mean => "mean".to_string(),
            Self::Max => "max".to_string(),
            Self::TopKVote { k } => format!("top-{k}-vote"),
        }
    }
}

/// Per-species presence thresholds with a default.
///
/// Presence is inclusive: a species is present when its probability is at
/// least its threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    default: f32,
    overrides: BTreeMap<String, f32>,
}

impl Thresholds {
    /// Thresholds with one value for every species.
    #[must_use]
    pub const fn uniform(default: f32) -> Self {
        Self {
            default,
            overrides: BTreeMap::new(),
        }
    }

    /// Thresholds from a model's aggregation settings.
    #[must_use]
    pub fn from_config(config: &AggregationConfig) -> Self {
        Self {
            default: config.threshold,
            overrides: config.thresholds.clone(),
        }
    }

    /// Replace the default threshold, keeping per-species overrides.
    #[must_use]
    pub const fn with_default(mut self, default: f32) -> Self {
        self.default = default;
        self
    }

    /// Threshold for one species.
    #[must_use]
    pub fn for_species(&self, species: &str) -> f32 {
        self.overrides.get(species).copied().unwrap_or(self.default)
    }

    /// Default threshold.
    #[must_use]
    pub const fn default_threshold(&self) -> f32 {
        self.default
    }
}

/// Aggregated probability and presence decision for one species.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesScore {
    /// Species label.
    pub species: String,
    /// Aggregated probability in `[0, 1]`.
    pub probability: f32,
    /// Whether `probability` reached the species threshold.
    pub present: bool,
}

/// Outcome of aggregating one video.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    /// One score per label, in vocabulary order.
    Scores(Vec<SpeciesScore>),
    /// The video produced no usable frames.
    NoData,
}

/// Aggregated prediction for one video. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPrediction {
    video: PathBuf,
    frames: usize,
    aggregate: Aggregate,
}

impl VideoPrediction {
    /// Video this prediction belongs to.
    #[must_use]
    pub fn video(&self) -> &Path {
        &self.video
    }

    /// Number of frame predictions that were aggregated.
    #[must_use]
    pub const fn frame_count(&self) -> usize {
        self.frames
    }

    /// Aggregated scores or the no-data marker.
    #[must_use]
    pub const fn aggregate(&self) -> &Aggregate {
        &self.aggregate
    }

    /// Whether the video produced no usable frames.
    #[must_use]
    pub const fn is_no_data(&self) -> bool {
        matches!(self.aggregate, Aggregate::NoData)
    }

    /// Per-species scores; empty for no-data videos.
    #[must_use]
    pub fn scores(&self) -> &[SpeciesScore] {
        match &self.aggregate {
            Aggregate::Scores(scores) => scores,
            Aggregate::NoData => &[],
        }
    }

    /// Score of one species.
    #[must_use]
    pub fn score(&self, species: &str) -> Option<&SpeciesScore> {
        self.scores().iter().find(|s| s.species == species)
    }

    /// Most probable species; ties resolve to the earlier label.
    #[must_use]
    pub fn top_species(&self) -> Option<&SpeciesScore> {
        self.scores().iter().reduce(|best, candidate| {
            if candidate.probability > best.probability {
                candidate
            } else {
                best
            }
        })
    }
}

/// Combines per-frame predictions of one video and applies thresholds.
///
/// Species are aggregated and thresholded independently of each other.
#[derive(Debug, Clone)]
pub struct TemporalAggregator {
    policy: AggregationPolicy,
    thresholds: Thresholds,
}

impl TemporalAggregator {
    /// Create an aggregator.
    #[must_use]
    pub const fn new(policy: AggregationPolicy, thresholds: Thresholds) -> Self {
        Self { policy, thresholds }
    }

    /// Aggregation policy in use.
    #[must_use]
    pub const fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    /// Thresholds in use.
    #[must_use]
    pub const fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Aggregate the ordered frame predictions of one video.
    ///
    /// Zero frames yield [`Aggregate::NoData`], never a probability.
    #[must_use]
    pub fn aggregate(&self, video: &Path, frames: &[PredictionVector]) -> VideoPrediction {
        let aggregate = frames.first().map_or(Aggregate::NoData, |first| {
            let probabilities = match self.policy {
                AggregationPolicy::Mean => mean(frames),
                AggregationPolicy::Max => max(frames),
                AggregationPolicy::TopKVote { k } => top_k_vote(frames, k),
            };
            let scores = first
                .labels()
                .iter()
                .zip(probabilities)
                .map(|(species, probability)| {
                    let probability = probability.clamp(0.0, 1.0);
                    SpeciesScore {
                        present: probability >= self.thresholds.for_species(species),
                        species: species.clone(),
                        probability,
                    }
                })
                .collect();
            Aggregate::Scores(scores)
        });

        VideoPrediction {
            video: video.to_path_buf(),
            frames: frames.len(),
            aggregate,
        }
    }

    /// The no-data prediction for a video that yielded no frames.
    #[must_use]
    pub fn no_data(&self, video: &Path) -> VideoPrediction {
        self.aggregate(video, &[])
    }
}

fn label_count(frames: &[PredictionVector]) -> usize {
    frames.first().map_or(0, |f| f.probabilities().len())
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn mean(frames: &[PredictionVector]) -> Vec<f32> {
    let mut sums = vec![0.0_f64; label_count(frames)];
    for frame in frames {
        for (sum, p) in sums.iter_mut().zip(frame.probabilities()) {
            *sum += f64::from(*p);
        }
    }
    let n = frames.len() as f64;
    sums.into_iter().map(|s| (s / n) as f32).collect()
}

fn max(frames: &[PredictionVector]) -> Vec<f32> {
    let mut best = vec![0.0_f32; label_count(frames)];
    for frame in frames {
        for (b, p) in best.iter_mut().zip(frame.probabilities()) {
            *b = b.max(*p);
        }
    }
    best
}

#[allow(clippy::cast_precision_loss)]
fn top_k_vote(frames: &[PredictionVector], k: usize) -> Vec<f32> {
    let mut votes = vec![0_usize; label_count(frames)];
    for frame in frames {
        let mut ranked: Vec<(usize, f32)> =
            frame.probabilities().iter().copied().enumerate().collect();
        // Stable sort keeps label order among equal probabilities.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (label, _) in ranked.into_iter().take(k) {
            votes[label] += 1;
        }
    }
    let n = frames.len() as f32;
    votes.into_iter().map(|v| v as f32 / n).collect()
}

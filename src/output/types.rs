//! Report data types.

use crate::constants::status;
use crate::error::Error;
use crate::pipeline::VideoPrediction;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A video that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFailure {
    /// Path of the video.
    pub video: PathBuf,
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl VideoFailure {
    /// Record a per-video error.
    pub fn from_error(video: &Path, error: &Error) -> Self {
        Self {
            video: video.to_path_buf(),
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Outcome for one input video.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEntry {
    /// Aggregated prediction, possibly no-data.
    Predicted(VideoPrediction),
    /// Typed failure.
    Failed(VideoFailure),
}

impl ReportEntry {
    /// Build an entry from a per-video result.
    pub fn from_result(video: &Path, result: Result<VideoPrediction, Error>) -> Self {
        match result {
            Ok(prediction) => Self::Predicted(prediction),
            Err(e) => Self::Failed(VideoFailure::from_error(video, &e)),
        }
    }

    /// Path of the video.
    #[must_use]
    pub fn video(&self) -> &Path {
        match self {
            Self::Predicted(prediction) => prediction.video(),
            Self::Failed(failure) => &failure.video,
        }
    }

    /// Status string: `ok`, `no-data` or `failed`.
    #[must_use]
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Predicted(prediction) if prediction.is_no_data() => status::NO_DATA,
            Self::Predicted(_) => status::OK,
            Self::Failed(_) => status::FAILED,
        }
    }

    /// Flatten into table rows.
    ///
    /// Scored videos yield one row per species in vocabulary order; no-data
    /// and failed videos yield a single marker row.
    #[must_use]
    pub fn rows(&self) -> Vec<ReportRow> {
        let video = self.video().display().to_string();
        match self {
            Self::Predicted(prediction) if !prediction.is_no_data() => prediction
                .scores()
                .iter()
                .map(|score| ReportRow {
                    video: video.clone(),
                    species: Some(score.species.clone()),
                    probability: Some(score.probability),
                    present: Some(score.present),
                    status: status::OK.to_string(),
                    error: None,
                })
                .collect(),
            Self::Predicted(_) => vec![ReportRow::marker(video, status::NO_DATA, None)],
            Self::Failed(failure) => vec![ReportRow::marker(
                video,
                status::FAILED,
                Some(failure.message.clone()),
            )],
        }
    }
}

/// One row of the prediction table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Video identifier.
    pub video: String,
    /// Species label; empty on marker rows.
    pub species: Option<String>,
    /// Aggregated probability; empty on marker rows.
    pub probability: Option<f32>,
    /// Presence decision; empty on marker rows.
    pub present: Option<bool>,
    /// `ok`, `no-data` or `failed`.
    pub status: String,
    /// Error message for failed videos.
    pub error: Option<String>,
}

impl ReportRow {
    fn marker(video: String, status: &str, error: Option<String>) -> Self {
        Self {
            video,
            species: None,
            probability: None,
            present: None,
            status: status.to_string(),
            error,
        }
    }
}

/// Per-run outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Videos scored successfully.
    pub processed: usize,
    /// Videos that yielded no usable frames.
    pub no_data: usize,
    /// Videos that failed.
    pub failed: usize,
}

impl Summary {
    /// Total videos accounted for.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.processed + self.no_data + self.failed
    }
}

/// Predictions for every input video, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionReport {
    entries: Vec<ReportEntry>,
}

impl PredictionReport {
    /// Create a report from entries already in input order.
    #[must_use]
    pub const fn new(entries: Vec<ReportEntry>) -> Self {
        Self { entries }
    }

    /// Entries in input order.
    #[must_use]
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Number of videos in the report.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the report is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count outcomes by status.
    #[must_use]
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for entry in &self.entries {
            match entry.status() {
                status::OK => summary.processed += 1,
                status::NO_DATA => summary.no_data += 1,
                _ => summary.failed += 1,
            }
        }
        summary
    }

    /// All table rows, grouped by video in input order.
    #[must_use]
    pub fn rows(&self) -> Vec<ReportRow> {
        self.entries.iter().flat_map(ReportEntry::rows).collect()
    }
}

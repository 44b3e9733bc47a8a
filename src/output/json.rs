//! JSON report writer.

use crate::error::{Error, Result};
use crate::output::{OutputWriter, ReportEntry, Summary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// JSON report file structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReportFile {
    /// Model name.
    pub model: String,
    /// Report generation timestamp.
    pub generated_at: DateTime<Utc>,
    /// Run settings.
    pub settings: RunSettings,
    /// Outcome counts.
    pub summary: Summary,
    /// Per-video results in input order.
    pub videos: Vec<JsonVideo>,
}

/// Pipeline settings recorded with the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Frames sampled per video.
    pub sample_count: usize,
    /// Sampling policy name.
    pub sampling: String,
    /// Aggregation policy name.
    pub aggregation: String,
    /// Default presence threshold.
    pub threshold: f32,
    /// Maximum frames per inference call.
    pub batch_size: usize,
}

/// One video in the JSON report.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonVideo {
    /// Video path.
    pub video: String,
    /// `ok`, `no-data` or `failed`.
    pub status: String,
    /// Number of frames aggregated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<usize>,
    /// Per-species scores for scored videos.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub species: Vec<JsonSpecies>,
    /// Error details for failed videos.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonError>,
}

/// Aggregated score for one species.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSpecies {
    /// Species label.
    pub species: String,
    /// Aggregated probability.
    pub probability: f32,
    /// Presence decision.
    pub present: bool,
}

/// Failure details.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonError {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&ReportEntry> for JsonVideo {
    fn from(entry: &ReportEntry) -> Self {
        let video = entry.video().display().to_string();
        let status = entry.status().to_string();
        match entry {
            ReportEntry::Predicted(prediction) => Self {
                video,
                status,
                frames: Some(prediction.frame_count()),
                species: prediction
                    .scores()
                    .iter()
                    .map(|s| JsonSpecies {
                        species: s.species.clone(),
                        probability: s.probability,
                        present: s.present,
                    })
                    .collect(),
                error: None,
            },
            ReportEntry::Failed(failure) => Self {
                video,
                status,
                frames: None,
                species: Vec::new(),
                error: Some(JsonError {
                    code: failure.code.clone(),
                    message: failure.message.clone(),
                }),
            },
        }
    }
}

/// Writer for the JSON report.
///
/// Entries are collected and the document is written on finalize.
pub struct JsonReportWriter {
    output_path: PathBuf,
    model: String,
    settings: RunSettings,
    videos: Vec<JsonVideo>,
    summary: Summary,
}

impl JsonReportWriter {
    /// Create a new JSON report writer.
    pub fn new(output_path: &Path, model: &str, settings: RunSettings) -> Self {
        Self {
            output_path: output_path.to_path_buf(),
            model: model.to_string(),
            settings,
            videos: Vec::new(),
            summary: Summary::default(),
        }
    }
}

impl OutputWriter for JsonReportWriter {
    fn write_header(&mut self) -> Result<()> {
        // No header for JSON - written at finalize
        Ok(())
    }

    fn write_entry(&mut self, entry: &ReportEntry) -> Result<()> {
        match entry.status() {
            crate::constants::status::OK => self.summary.processed += 1,
            crate::constants::status::NO_DATA => self.summary.no_data += 1,
            _ => self.summary.failed += 1,
        }
        self.videos.push(JsonVideo::from(entry));
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let report = JsonReportFile {
            model: self.model.clone(),
            generated_at: Utc::now(),
            settings: self.settings.clone(),
            summary: self.summary,
            videos: std::mem::take(&mut self.videos),
        };

        let file = File::create(&self.output_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &report).map_err(|e| Error::ReportWrite {
            path: self.output_path.clone(),
            source: Box::new(e),
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::PredictionVector;
    use crate::pipeline::{AggregationPolicy, TemporalAggregator, Thresholds};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn settings() -> RunSettings {
        RunSettings {
            sample_count: 16,
            sampling: "uniform".to_string(),
            aggregation: "mean".to_string(),
            threshold: 0.5,
            batch_size: 8,
        }
    }

    #[test]
    fn test_json_writer_basic() {
        let dir = tempdir().expect("create temp dir");
        let output_path = dir.path().join("zamba_predictions.json");

        let labels: Arc<[String]> = vec!["gorilla".to_string()].into();
        let frame = PredictionVector::new(labels, vec![0.75]).expect("valid vector");
        let aggregator =
            TemporalAggregator::new(AggregationPolicy::Max, Thresholds::uniform(0.5));

        let mut writer = JsonReportWriter::new(&output_path, "gabon-v2", settings());
        writer.write_header().expect("write header");
        writer
            .write_entry(&ReportEntry::Predicted(
                aggregator.aggregate(Path::new("a.mp4"), &[frame]),
            ))
            .expect("write entry");
        writer
            .write_entry(&ReportEntry::from_result(Path::new("b.mp4"), Err(Error::Cancelled)))
            .expect("write entry");
        writer.finalize().expect("finalize");

        let content = std::fs::read_to_string(&output_path).expect("read file");
        let report: JsonReportFile = serde_json::from_str(&content).expect("parse JSON");

        assert_eq!(report.model, "gabon-v2");
        assert_eq!(report.settings, settings());
        assert_eq!(report.summary.processed, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.videos.len(), 2);
        assert_eq!(report.videos[0].species[0].species, "gorilla");
        assert!(report.videos[0].species[0].present);
        assert_eq!(report.videos[1].status, "failed");
        assert_eq!(
            report.videos[1].error.as_ref().map(|e| e.code.as_str()),
            Some("cancelled")
        );
    }
}

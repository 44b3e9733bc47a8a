//! Most-likely-species output: one row per video.

use crate::error::{Error, Result};
use crate::output::{OutputWriter, ReportEntry};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Writes `video,label` rows, where the label is the top species or the
/// video's status when it has no scores.
pub struct LabelsWriter {
    writer: csv::Writer<BufWriter<File>>,
    path: PathBuf,
}

impl LabelsWriter {
    /// Create a new labels writer.
    pub fn new(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: csv::Writer::from_writer(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    fn write_row(&mut self, video: &str, label: &str) -> Result<()> {
        self.writer
            .write_record([video, label])
            .map_err(|e| Error::ReportWrite {
                path: self.path.clone(),
                source: Box::new(e),
            })
    }
}

impl OutputWriter for LabelsWriter {
    fn write_header(&mut self) -> Result<()> {
        self.write_row("video", "label")
    }

    fn write_entry(&mut self, entry: &ReportEntry) -> Result<()> {
        let video = entry.video().display().to_string();
        let label = match entry {
            ReportEntry::Predicted(prediction) => prediction
                .top_species()
                .map_or_else(|| entry.status().to_string(), |s| s.species.clone()),
            ReportEntry::Failed(_) => entry.status().to_string(),
        };
        self.write_row(&video, &label)
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

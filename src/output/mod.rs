//! Output format writers.

mod csv;
mod json;
mod labels;
pub mod progress;
mod types;
mod writer;

pub use csv::{CSV_HEADER, CsvWriter, read_csv};
pub use json::{JsonError, JsonReportFile, JsonReportWriter, JsonSpecies, JsonVideo, RunSettings};
pub use labels::LabelsWriter;
pub use types::{PredictionReport, ReportEntry, ReportRow, Summary, VideoFailure};
pub use writer::OutputWriter;

use crate::config::OutputFormat;
use crate::error::Result;
use crate::pipeline::report_path_for;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write the report in every requested format into `output_dir`.
///
/// Returns the paths written, in format order.
pub fn write_report(
    report: &PredictionReport,
    output_dir: &Path,
    formats: &[OutputFormat],
    model: &str,
    settings: &RunSettings,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let mut written = Vec::with_capacity(formats.len());
    for &format in formats {
        let path = report_path_for(output_dir, format);
        let mut writer: Box<dyn OutputWriter> = match format {
            OutputFormat::Csv => Box::new(CsvWriter::new(&path)?),
            OutputFormat::Json => Box::new(JsonReportWriter::new(&path, model, settings.clone())),
            OutputFormat::Labels => Box::new(LabelsWriter::new(&path)?),
        };

        writer.write_header()?;
        for entry in report.entries() {
            writer.write_entry(entry)?;
        }
        writer.finalize()?;

        info!("Wrote {format} report: {}", path.display());
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_write_report_all_formats() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("results");
        let report = PredictionReport::new(vec![ReportEntry::from_result(
            Path::new("a.mp4"),
            Err(Error::Cancelled),
        )]);
        let settings = RunSettings {
            sample_count: 4,
            sampling: "uniform".to_string(),
            aggregation: "max".to_string(),
            threshold: 0.5,
            batch_size: 2,
        };

        let written = write_report(
            &report,
            &output_dir,
            &[OutputFormat::Csv, OutputFormat::Json, OutputFormat::Labels],
            "test",
            &settings,
        )
        .unwrap();

        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|p| p.exists()));
        let rows = read_csv(&written[0]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "failed");
    }
}

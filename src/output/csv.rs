//! CSV prediction table writer and reader.

use crate::error::{Error, Result};
use crate::output::{OutputWriter, ReportEntry, ReportRow};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Column names, in order.
pub const CSV_HEADER: [&str; 6] = ["video", "species", "probability", "present", "status", "error"];

/// CSV format output writer.
///
/// Probabilities are written in their shortest round-trip form so the table
/// parses back to identical values.
pub struct CsvWriter {
    writer: csv::Writer<BufWriter<File>>,
    path: PathBuf,
}

impl CsvWriter {
    /// Create a new CSV writer.
    pub fn new(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::new(file));
        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }

    fn write_err(&self, e: csv::Error) -> Error {
        Error::ReportWrite {
            path: self.path.clone(),
            source: Box::new(e),
        }
    }
}

impl OutputWriter for CsvWriter {
    fn write_header(&mut self) -> Result<()> {
        self.writer
            .write_record(CSV_HEADER)
            .map_err(|e| self.write_err(e))
    }

    fn write_entry(&mut self, entry: &ReportEntry) -> Result<()> {
        for row in entry.rows() {
            self.writer.serialize(&row).map_err(|e| self.write_err(e))?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Parse a prediction table written by [`CsvWriter`].
pub fn read_csv(path: &Path) -> Result<Vec<ReportRow>> {
    let parse_err = |line: Option<u64>, e: &dyn std::fmt::Display| Error::ReportParse {
        path: path.to_path_buf(),
        reason: line.map_or_else(|| e.to_string(), |l| format!("line {l}: {e}")),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| parse_err(None, &e))?;

    let headers = reader.headers().map_err(|e| parse_err(None, &e))?.clone();
    if headers.iter().ne(CSV_HEADER) {
        return Err(parse_err(
            Some(1),
            &format!("unexpected header {:?}", headers.iter().collect::<Vec<_>>()),
        ));
    }

    reader
        .deserialize::<ReportRow>()
        .map(|record| {
            record.map_err(|e| {
                let line = e.position().map(csv::Position::line);
                parse_err(line, &e)
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::inference::PredictionVector;
    use crate::pipeline::{AggregationPolicy, TemporalAggregator, Thresholds};
    use std::sync::Arc;

    fn write_report(path: &Path, entries: &[ReportEntry]) {
        let mut writer = CsvWriter::new(path).unwrap();
        writer.write_header().unwrap();
        for entry in entries {
            writer.write_entry(entry).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn entries() -> Vec<ReportEntry> {
        let labels: Arc<[String]> = vec![
            "blank".to_string(),
            "chimpanzee".to_string(),
            "red duiker, bay duiker".to_string(),
        ]
        .into();
        let frames = vec![
            PredictionVector::new(Arc::clone(&labels), vec![0.1, 0.7, 1.0 / 3.0]).unwrap(),
            PredictionVector::new(labels, vec![0.2, 0.4, 0.0]).unwrap(),
        ];
        let aggregator = TemporalAggregator::new(AggregationPolicy::Mean, Thresholds::uniform(0.5));
        vec![
            ReportEntry::Predicted(aggregator.aggregate(Path::new("site1/cam \"A\".mp4"), &frames)),
            ReportEntry::Predicted(aggregator.no_data(Path::new("empty.mp4"))),
            ReportEntry::from_result(
                Path::new("broken.avi"),
                Err(Error::UnreadableVideo {
                    path: PathBuf::from("broken.avi"),
                    reason: "invalid data found when processing input".to_string(),
                }),
            ),
        ]
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.csv");
        let entries = entries();
        write_report(&path, &entries);

        let expected: Vec<ReportRow> = entries.iter().flat_map(ReportEntry::rows).collect();
        let parsed = read_csv(&path).unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(parsed.len(), 5);
    }

    #[test]
    fn test_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.csv");
        write_report(&path, &entries());

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "video,species,probability,present,status,error");
        assert!(lines[2].starts_with("\"site1/cam \"\"A\"\".mp4\",chimpanzee,"));
        assert!(lines[2].ends_with(",true,ok,"));
        assert_eq!(lines[4], "empty.mp4,,,,no-data,");
        assert!(lines[5].starts_with("broken.avi,,,,failed,"));
    }

    #[test]
    fn test_read_csv_rejects_foreign_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.csv");
        std::fs::write(&path, "Start (s),End (s),Confidence\n0,3,0.9\n").unwrap();

        assert!(matches!(read_csv(&path), Err(Error::ReportParse { .. })));
    }

    #[test]
    fn test_read_csv_reports_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(
            &path,
            "video,species,probability,present,status,error\na.mp4,elephant,high,true,ok,\n",
        )
        .unwrap();

        let err = read_csv(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}

//! Output writer trait definition.

use crate::error::Result;
use crate::output::ReportEntry;

/// Trait for writing prediction reports.
pub trait OutputWriter {
    /// Write the file header (if applicable).
    fn write_header(&mut self) -> Result<()>;

    /// Write the outcome of a single video.
    fn write_entry(&mut self, entry: &ReportEntry) -> Result<()>;

    /// Finalize the output (flush, close, etc.).
    fn finalize(&mut self) -> Result<()>;
}

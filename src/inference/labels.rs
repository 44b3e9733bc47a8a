//! Label vocabulary loading.

use crate::error::{Error, Result};
use std::path::Path;

/// Read a labels file: one species label per line, in model output order.
///
/// Blank lines and surrounding whitespace are ignored.
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(Error::LabelsFileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| Error::LabelsRead {
        path: path.to_path_buf(),
        source,
    })?;

    let labels: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    if labels.is_empty() {
        return Err(Error::ClassifierBuild {
            reason: format!("labels file '{}' is empty", path.display()),
        });
    }

    Ok(labels)
}

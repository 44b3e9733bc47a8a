//! Input discovery and report placement.

use crate::config::OutputFormat;
use crate::constants::{VIDEO_EXTENSIONS, report_filenames};
use crate::error::Result;
use crate::video::{has_extension, is_image_sequence};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Collect videos from paths (files and directories).
///
/// Directories are scanned recursively in sorted order. A directory that
/// holds only still images is one image-sequence clip. Explicit inputs keep
/// the order they were given in; duplicates are dropped. An explicit path
/// that does not exist is kept so it is reported as a failed video.
pub fn collect_input_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_video_file(path) {
                files.push(path.clone());
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            collect_videos_recursive(path, &mut files)?;
        } else {
            warn!("Input does not exist: {}", path.display());
            files.push(path.clone());
        }
    }

    let mut seen = HashSet::new();
    files.retain(|f| seen.insert(f.clone()));
    Ok(files)
}

/// Recursively collect videos and image-sequence clips from a directory.
fn collect_videos_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    if is_image_sequence(dir) {
        debug!("Treating {} as an image sequence", dir.display());
        files.push(dir.to_path_buf());
        return Ok(());
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_videos_recursive(&path, files)?;
        } else if is_video_file(&path) {
            files.push(path);
        }
    }

    Ok(())
}

/// Check if a file has a supported video container extension.
fn is_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Report file path for a format inside the output directory.
pub fn report_path_for(output_dir: &Path, format: OutputFormat) -> PathBuf {
    let name = match format {
        OutputFormat::Csv => report_filenames::CSV,
        OutputFormat::Json => report_filenames::JSON,
        OutputFormat::Labels => report_filenames::LABELS,
    };
    output_dir.join(name)
}

//! Image-sequence clips: a directory of still frames from a camera trap burst.

use crate::error::{Error, Result};
use crate::video::frame::{PixelBuffer, VideoAsset};
use crate::video::reader::{FrameDecoder, is_image_file};
use image::{DynamicImage, GenericImageView};
use std::path::{Path, PathBuf};

/// Decoder over the sorted still images of one directory.
pub struct ImageSequenceDecoder {
    asset: VideoAsset,
    files: Vec<PathBuf>,
    position: usize,
}

impl ImageSequenceDecoder {
    /// Open a directory as a clip. Frames are ordered by file name.
    pub fn open(dir: &Path) -> Result<Self> {
        let files = list_frames(dir)?;
        let first = files.first().ok_or_else(|| Error::UnreadableVideo {
            path: dir.to_path_buf(),
            reason: "directory contains no image frames".to_string(),
        })?;

        let (width, height) = image::image_dimensions(first).map_err(|e| unreadable(dir, &e))?;

        Ok(Self {
            asset: VideoAsset {
                path: dir.to_path_buf(),
                duration_secs: None,
                frame_rate: None,
                width,
                height,
                frame_count: Some(files.len()),
            },
            files,
            position: 0,
        })
    }
}

impl FrameDecoder for ImageSequenceDecoder {
    fn asset(&self) -> &VideoAsset {
        &self.asset
    }

    fn decode_next(&mut self) -> Result<Option<(Option<f64>, PixelBuffer)>> {
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };
        let image = image::open(path).map_err(|e| unreadable(&self.asset.path, &e))?;
        self.position += 1;
        Ok(Some((None, to_pixel_buffer(&image))))
    }

    fn skip_next(&mut self) -> Result<bool> {
        if self.position >= self.files.len() {
            return Ok(false);
        }
        self.position += 1;
        Ok(true)
    }
}

/// Whether a directory holds an image sequence rather than a tree of videos.
pub fn is_image_sequence(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    let mut saw_image = false;
    for entry in entries.flatten() {
        let path = entry.path();
        if is_image_file(&path) {
            saw_image = true;
        } else if path.is_dir() || crate::video::reader::has_extension(
            &path,
            crate::constants::VIDEO_EXTENSIONS,
        ) {
            return false;
        }
    }
    saw_image
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| unreadable(dir, &e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_image_file(path))
        .collect();
    files.sort();
    Ok(files)
}

/// Convert a decoded still into the interleaved pixel layout used by the pipeline.
///
/// Floating-point images are reported with a 32-bit depth and rejected later
/// by the preprocessor.
pub fn to_pixel_buffer(image: &DynamicImage) -> PixelBuffer {
    let (width, height) = image.dimensions();
    let (channels, bit_depth, data) = match image {
        DynamicImage::ImageLuma8(buf) => (1, 8, buf.as_raw().clone()),
        DynamicImage::ImageLumaA8(buf) => (2, 8, buf.as_raw().clone()),
        DynamicImage::ImageRgb8(buf) => (3, 8, buf.as_raw().clone()),
        DynamicImage::ImageRgba8(buf) => (4, 8, buf.as_raw().clone()),
        DynamicImage::ImageLuma16(buf) => (1, 16, le_bytes(buf.as_raw())),
        DynamicImage::ImageLumaA16(buf) => (2, 16, le_bytes(buf.as_raw())),
        DynamicImage::ImageRgb16(buf) => (3, 16, le_bytes(buf.as_raw())),
        DynamicImage::ImageRgba16(buf) => (4, 16, le_bytes(buf.as_raw())),
        other => {
            let channels = other.color().channel_count();
            (channels, 32, Vec::new())
        }
    };
    PixelBuffer {
        width,
        height,
        channels,
        bit_depth,
        data,
    }
}

fn le_bytes(samples: &[u16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

fn unreadable(path: &Path, err: &dyn std::fmt::Display) -> Error {
    Error::UnreadableVideo {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

//! Video and frame data types.

use std::path::{Path, PathBuf};

/// Metadata about an opened video.
///
/// Immutable once the container has been probed.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoAsset {
    /// Path to the video file or image-sequence directory.
    pub path: PathBuf,
    /// Duration in seconds, when the container reports it.
    pub duration_secs: Option<f64>,
    /// Frames per second, when known.
    pub frame_rate: Option<f64>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Number of frames reported by the container, if any.
    ///
    /// A stream may still end early; readers report the count actually reached.
    pub frame_count: Option<usize>,
}

impl VideoAsset {
    /// Path of the video.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Raw decoded pixels, interleaved, row-major.
///
/// 16-bit samples are stored little-endian, two bytes per sample.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Interleaved channels per pixel.
    pub channels: u8,
    /// Bits per channel sample.
    pub bit_depth: u8,
    /// Pixel bytes.
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Create an 8-bit RGB buffer.
    #[must_use]
    pub const fn rgb8(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels: 3,
            bit_depth: 8,
            data,
        }
    }

    /// Number of bytes a buffer with these dimensions must hold.
    #[must_use]
    pub fn expected_len(&self) -> usize {
        self.width as usize
            * self.height as usize
            * usize::from(self.channels)
            * usize::from(self.bit_depth).div_ceil(8)
    }
}

/// A single decoded frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Zero-based position in playback order.
    pub index: usize,
    /// Presentation time in seconds, when known.
    pub timestamp_secs: Option<f64>,
    /// Decoded pixels.
    pub pixels: PixelBuffer,
}

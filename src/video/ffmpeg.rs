//! Container decoding through FFmpeg via `video-rs`.

use crate::error::{Error, Result};
use crate::video::frame::{PixelBuffer, VideoAsset};
use crate::video::reader::FrameDecoder;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, trace};
use video_rs::decode::Decoder;

static FFMPEG_INIT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

fn ensure_initialized() -> std::result::Result<(), String> {
    FFMPEG_INIT
        .get_or_init(|| video_rs::init().map_err(|e| e.to_string()))
        .clone()
}

/// Frame decoder over a video container.
pub struct FfmpegDecoder {
    asset: VideoAsset,
    decoder: Decoder,
}

impl FfmpegDecoder {
    /// Open and probe a video container.
    pub fn open(path: &Path) -> Result<Self> {
        let unreadable = |reason: String| Error::UnreadableVideo {
            path: path.to_path_buf(),
            reason,
        };

        ensure_initialized().map_err(&unreadable)?;
        let decoder = Decoder::new(path).map_err(|e| unreadable(e.to_string()))?;

        let (width, height) = decoder.size();
        let frame_rate = f64::from(decoder.frame_rate());
        let frame_rate = (frame_rate.is_finite() && frame_rate > 0.0).then_some(frame_rate);
        let duration_secs = decoder
            .duration()
            .ok()
            .map(|d| d.as_secs_f64())
            .filter(|d| d.is_finite() && *d > 0.0);

        #[allow(clippy::cast_possible_truncation)]
        let frame_count = decoder
            .frames()
            .ok()
            .filter(|n| *n > 0)
            .map(|n| n as usize);

        debug!(
            "Opened {}: {}x{}, fps={:?}, frames={:?}",
            path.display(),
            width,
            height,
            frame_rate,
            frame_count
        );

        Ok(Self {
            asset: VideoAsset {
                path: path.to_path_buf(),
                duration_secs,
                frame_rate,
                width,
                height,
                frame_count,
            },
            decoder,
        })
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn asset(&self) -> &VideoAsset {
        &self.asset
    }

    fn decode_next(&mut self) -> Result<Option<(Option<f64>, PixelBuffer)>> {
        match self.decoder.decode() {
            Ok((time, frame)) => {
                let shape = frame.shape();
                let (height, width, channels) = (shape[0], shape[1], shape[2]);
                let pixels = PixelBuffer {
                    width: u32::try_from(width).unwrap_or(u32::MAX),
                    height: u32::try_from(height).unwrap_or(u32::MAX),
                    channels: u8::try_from(channels).unwrap_or(u8::MAX),
                    bit_depth: 8,
                    data: frame.iter().copied().collect(),
                };
                let timestamp = time.as_secs_f64();
                Ok(Some((timestamp.is_finite().then_some(timestamp), pixels)))
            }
            Err(video_rs::Error::DecodeExhausted) => {
                trace!("End of stream for {}", self.asset.path.display());
                Ok(None)
            }
            Err(e) => Err(Error::UnreadableVideo {
                path: self.asset.path.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

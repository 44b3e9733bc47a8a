//! Lazy frame reading over a pluggable decoder backend.

use crate::constants::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::error::{Error, Result};
use crate::video::frame::{Frame, PixelBuffer, VideoAsset};
use crate::video::image_sequence::ImageSequenceDecoder;
use std::collections::VecDeque;
use std::path::Path;
use tracing::debug;

/// A decoder backend producing frames in playback order.
///
/// Implementations own the underlying decoder resource and must release it
/// when dropped.
pub trait FrameDecoder {
    /// Metadata probed when the decoder was opened.
    fn asset(&self) -> &VideoAsset;

    /// Decode the next frame. `Ok(None)` marks a clean end of stream.
    fn decode_next(&mut self) -> Result<Option<(Option<f64>, PixelBuffer)>>;

    /// Advance past the next frame without materializing its pixels.
    ///
    /// Returns `false` at end of stream. Backends that cannot skip cheaply
    /// decode and discard.
    fn skip_next(&mut self) -> Result<bool> {
        Ok(self.decode_next()?.is_some())
    }
}

/// How a reader's frame sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// Frames may still be produced.
    Reading,
    /// The stream ended normally.
    Finished,
    /// Decoding failed; the sequence ended abnormally.
    Failed,
}

/// Lazy, finite, single-pass sequence of decoded frames.
///
/// The decoder is released as soon as the sequence ends (normally or not)
/// and on drop, so early termination by the consumer also frees it.
pub struct VideoFrameReader {
    asset: VideoAsset,
    decoder: Option<Box<dyn FrameDecoder>>,
    next_index: usize,
    state: ReadState,
}

impl VideoFrameReader {
    /// Wrap an opened decoder.
    pub fn new(decoder: Box<dyn FrameDecoder>) -> Self {
        Self {
            asset: decoder.asset().clone(),
            decoder: Some(decoder),
            next_index: 0,
            state: ReadState::Reading,
        }
    }

    /// Metadata of the video being read.
    #[must_use]
    pub const fn asset(&self) -> &VideoAsset {
        &self.asset
    }

    /// Current termination state.
    #[must_use]
    pub const fn state(&self) -> ReadState {
        self.state
    }

    /// Restrict the sequence to the given frame indices.
    ///
    /// Indices must be strictly increasing; frames in between are skipped
    /// without converting their pixels.
    #[must_use]
    pub fn sampled(self, indices: Vec<usize>) -> SampledFrames {
        SampledFrames {
            reader: self,
            wanted: indices.into(),
            short: false,
        }
    }

    /// Count the remaining frames by skipping through the stream.
    pub fn count_frames(mut self) -> Result<usize> {
        let mut count = 0;
        while self.advance_skip()? {
            count += 1;
        }
        Ok(count)
    }

    fn release(&mut self, state: ReadState) {
        if self.decoder.take().is_some() {
            debug!("Released decoder for {}", self.asset.path.display());
        }
        self.state = state;
    }

    fn advance_skip(&mut self) -> Result<bool> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(false);
        };
        match decoder.skip_next() {
            Ok(true) => {
                self.next_index += 1;
                Ok(true)
            }
            Ok(false) => {
                self.release(ReadState::Finished);
                Ok(false)
            }
            Err(e) => {
                self.release(ReadState::Failed);
                Err(e)
            }
        }
    }
}

impl Iterator for VideoFrameReader {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let decoder = self.decoder.as_mut()?;
        match decoder.decode_next() {
            Ok(Some((timestamp_secs, pixels))) => {
                let frame = Frame {
                    index: self.next_index,
                    timestamp_secs,
                    pixels,
                };
                self.next_index += 1;
                Some(Ok(frame))
            }
            Ok(None) => {
                self.release(ReadState::Finished);
                None
            }
            Err(e) => {
                self.release(ReadState::Failed);
                Some(Err(e))
            }
        }
    }
}

/// Frames at selected indices, decoded lazily from a [`VideoFrameReader`].
pub struct SampledFrames {
    reader: VideoFrameReader,
    wanted: VecDeque<usize>,
    short: bool,
}

impl SampledFrames {
    /// Termination state of the underlying reader.
    #[must_use]
    pub const fn state(&self) -> ReadState {
        self.reader.state
    }

    /// Frames the stream actually held, if it ended before a wanted index.
    #[must_use]
    pub const fn frames_reached(&self) -> Option<usize> {
        if self.short {
            Some(self.reader.next_index)
        } else {
            None
        }
    }
}

impl Iterator for SampledFrames {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let target = *self.wanted.front()?;
        while self.reader.next_index < target {
            match self.reader.advance_skip() {
                Ok(true) => {}
                Ok(false) => {
                    self.short = true;
                    self.wanted.clear();
                    return None;
                }
                Err(e) => {
                    self.wanted.clear();
                    return Some(Err(e));
                }
            }
        }
        self.wanted.pop_front();
        let item = self.reader.next();
        if self.wanted.is_empty() && self.reader.state == ReadState::Reading {
            self.reader.release(ReadState::Finished);
        }
        if item.is_none() {
            self.short = true;
        }
        if matches!(item, Some(Err(_)) | None) {
            self.wanted.clear();
        }
        item
    }
}

/// Open a video file or image-sequence directory for reading.
pub fn open_video(path: &Path) -> Result<VideoFrameReader> {
    if path.is_dir() {
        return Ok(VideoFrameReader::new(Box::new(ImageSequenceDecoder::open(
            path,
        )?)));
    }

    if !path.is_file() {
        return Err(Error::UnreadableVideo {
            path: path.to_path_buf(),
            reason: "file does not exist".to_string(),
        });
    }

    if !has_extension(path, VIDEO_EXTENSIONS) {
        return Err(Error::UnreadableVideo {
            path: path.to_path_buf(),
            reason: "unrecognized video container".to_string(),
        });
    }

    open_container(path)
}

#[cfg(feature = "video")]
fn open_container(path: &Path) -> Result<VideoFrameReader> {
    let decoder = crate::video::ffmpeg::FfmpegDecoder::open(path)?;
    Ok(VideoFrameReader::new(Box::new(decoder)))
}

#[cfg(not(feature = "video"))]
fn open_container(path: &Path) -> Result<VideoFrameReader> {
    Err(Error::UnreadableVideo {
        path: path.to_path_buf(),
        reason: "video container support requires the 'video' feature".to_string(),
    })
}

/// Check a path's extension against a list, ignoring ASCII case.
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension().is_some_and(|ext| {
        extensions
            .iter()
            .any(|candidate| ext.eq_ignore_ascii_case(candidate))
    })
}

/// Whether a path is a still image usable as part of an image sequence.
pub fn is_image_file(path: &Path) -> bool {
    path.is_file() && has_extension(path, IMAGE_EXTENSIONS)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Decoder yielding `total` tiny frames, optionally failing at `fail_at`.
    struct ScriptedDecoder {
        asset: VideoAsset,
        position: usize,
        total: usize,
        fail_at: Option<usize>,
        dropped: Arc<AtomicBool>,
    }

    impl ScriptedDecoder {
        fn boxed(total: usize, fail_at: Option<usize>, dropped: Arc<AtomicBool>) -> Box<Self> {
            Box::new(Self {
                asset: VideoAsset {
                    path: PathBuf::from("scripted.mp4"),
                    duration_secs: None,
                    frame_rate: Some(1.0),
                    width: 1,
                    height: 1,
                    frame_count: Some(total),
                },
                position: 0,
                total,
                fail_at,
                dropped,
            })
        }
    }

    impl Drop for ScriptedDecoder {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    impl FrameDecoder for ScriptedDecoder {
        fn asset(&self) -> &VideoAsset {
            &self.asset
        }

        fn decode_next(&mut self) -> Result<Option<(Option<f64>, PixelBuffer)>> {
            if self.fail_at == Some(self.position) {
                return Err(Error::UnreadableVideo {
                    path: self.asset.path.clone(),
                    reason: "corrupt packet".to_string(),
                });
            }
            if self.position >= self.total {
                return Ok(None);
            }
            #[allow(clippy::cast_precision_loss)]
            let ts = self.position as f64;
            self.position += 1;
            Ok(Some((Some(ts), PixelBuffer::rgb8(1, 1, vec![0, 0, 0]))))
        }

        fn skip_next(&mut self) -> Result<bool> {
            if self.fail_at == Some(self.position) {
                return Err(Error::UnreadableVideo {
                    path: self.asset.path.clone(),
                    reason: "corrupt packet".to_string(),
                });
            }
            if self.position >= self.total {
                return Ok(false);
            }
            self.position += 1;
            Ok(true)
        }
    }

    #[test]
    fn test_reader_yields_frames_in_order_then_finishes() {
        let dropped = Arc::new(AtomicBool::new(false));
        let mut reader = VideoFrameReader::new(ScriptedDecoder::boxed(3, None, dropped.clone()));

        let indices: Vec<usize> = reader.by_ref().map(|f| f.unwrap().index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(reader.state(), ReadState::Finished);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_reader_signals_abnormal_termination() {
        let dropped = Arc::new(AtomicBool::new(false));
        let mut reader =
            VideoFrameReader::new(ScriptedDecoder::boxed(5, Some(2), dropped.clone()));

        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
        assert_eq!(reader.state(), ReadState::Failed);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_reader_releases_decoder_on_early_drop() {
        let dropped = Arc::new(AtomicBool::new(false));
        let mut reader = VideoFrameReader::new(ScriptedDecoder::boxed(10, None, dropped.clone()));
        let _ = reader.next();
        assert!(!dropped.load(Ordering::SeqCst));
        drop(reader);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_sampled_frames_skip_to_wanted_indices() {
        let dropped = Arc::new(AtomicBool::new(false));
        let reader = VideoFrameReader::new(ScriptedDecoder::boxed(10, None, dropped.clone()));

        let frames: Vec<Frame> = reader
            .sampled(vec![1, 4, 9])
            .collect::<Result<_>>()
            .unwrap();
        let indices: Vec<usize> = frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![1, 4, 9]);
        assert_eq!(frames[1].timestamp_secs, Some(4.0));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_sampled_frames_stop_at_short_stream() {
        let dropped = Arc::new(AtomicBool::new(false));
        let reader = VideoFrameReader::new(ScriptedDecoder::boxed(3, None, dropped));

        let mut sampled = reader.sampled(vec![0, 2, 5, 7]);
        let frames: Vec<Frame> = sampled.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(sampled.state(), ReadState::Finished);
        assert_eq!(sampled.frames_reached(), Some(3));
    }

    #[test]
    fn test_sampled_frames_ending_on_last_wanted_index_is_not_short() {
        let dropped = Arc::new(AtomicBool::new(false));
        let reader = VideoFrameReader::new(ScriptedDecoder::boxed(6, None, dropped));

        let mut sampled = reader.sampled(vec![1, 5]);
        assert_eq!(sampled.by_ref().count(), 2);
        assert_eq!(sampled.frames_reached(), None);
    }

    #[test]
    fn test_sampled_frames_short_when_wanted_index_is_end_of_stream() {
        let dropped = Arc::new(AtomicBool::new(false));
        let reader = VideoFrameReader::new(ScriptedDecoder::boxed(4, None, dropped));

        let mut sampled = reader.sampled(vec![1, 4]);
        assert_eq!(sampled.by_ref().count(), 1);
        assert_eq!(sampled.frames_reached(), Some(4));
    }

    #[test]
    fn test_count_frames() {
        let dropped = Arc::new(AtomicBool::new(false));
        let reader = VideoFrameReader::new(ScriptedDecoder::boxed(7, None, dropped));
        assert_eq!(reader.count_frames().unwrap(), 7);
    }

    #[test]
    fn test_open_missing_file_is_unreadable() {
        let result = open_video(Path::new("/definitely/missing/clip.mp4"));
        assert!(matches!(result, Err(Error::UnreadableVideo { .. })));
    }

    #[test]
    fn test_has_extension_ignores_case() {
        assert!(has_extension(Path::new("CLIP.MP4"), VIDEO_EXTENSIONS));
        assert!(has_extension(Path::new("trap_0001.avi"), VIDEO_EXTENSIONS));
        assert!(!has_extension(Path::new("notes.txt"), VIDEO_EXTENSIONS));
    }
}

//! Video decoding, frame sampling and preprocessing.

#[cfg(feature = "video")]
mod ffmpeg;
mod frame;
mod image_sequence;
mod preprocess;
mod reader;
mod sampler;

pub use frame::{Frame, PixelBuffer, VideoAsset};
pub use image_sequence::{ImageSequenceDecoder, is_image_sequence};
pub use preprocess::FramePreprocessor;
pub use reader::{
    FrameDecoder, ReadState, SampledFrames, VideoFrameReader, has_extension, is_image_file,
    open_video,
};
pub use sampler::{SamplingPolicy, sample_indices};

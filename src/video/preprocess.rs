//! Frame to tensor conversion.

use crate::config::{InputConfig, TensorLayout};
use crate::error::{Error, Result};
use crate::video::frame::PixelBuffer;
use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::Array3;

/// Resizes and normalizes raw frames into the model's input tensor shape.
///
/// Stateless apart from the normalization parameters; one instance can be
/// shared by every worker.
#[derive(Debug, Clone)]
pub struct FramePreprocessor {
    width: u32,
    height: u32,
    layout: TensorLayout,
    mean: [f32; 3],
    std: [f32; 3],
}

impl FramePreprocessor {
    /// Create a preprocessor for a model's input settings.
    #[must_use]
    pub const fn new(input: &InputConfig) -> Self {
        Self {
            width: input.width,
            height: input.height,
            layout: input.layout,
            mean: input.mean,
            std: input.std,
        }
    }

    /// Shape of one output tensor, without the batch dimension.
    #[must_use]
    pub const fn tensor_shape(&self) -> [usize; 3] {
        let (w, h) = (self.width as usize, self.height as usize);
        match self.layout {
            TensorLayout::Nchw => [3, h, w],
            TensorLayout::Nhwc => [h, w, 3],
        }
    }

    /// Convert one frame into a normalized tensor.
    pub fn preprocess(&self, pixels: &PixelBuffer) -> Result<Array3<f32>> {
        let rgb = to_rgb8(pixels)?;
        let rgb = if rgb.dimensions() == (self.width, self.height) {
            rgb
        } else {
            imageops::resize(&rgb, self.width, self.height, FilterType::Triangle)
        };

        let mut tensor = Array3::<f32>::zeros(self.tensor_shape());
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                let value = (f32::from(pixel[c]) / 255.0 - self.mean[c]) / self.std[c];
                match self.layout {
                    TensorLayout::Nchw => tensor[[c, y, x]] = value,
                    TensorLayout::Nhwc => tensor[[y, x, c]] = value,
                }
            }
        }
        Ok(tensor)
    }
}

/// Reduce any supported pixel layout to 8-bit RGB.
fn to_rgb8(pixels: &PixelBuffer) -> Result<RgbImage> {
    let unsupported = || Error::UnsupportedFrameFormat {
        channels: pixels.channels,
        bit_depth: pixels.bit_depth,
    };

    if !(1..=4).contains(&pixels.channels) || !matches!(pixels.bit_depth, 8 | 16) {
        return Err(unsupported());
    }
    if pixels.width == 0 || pixels.height == 0 || pixels.data.len() != pixels.expected_len() {
        return Err(unsupported());
    }

    let channels = usize::from(pixels.channels);
    let samples: Vec<u8> = if pixels.bit_depth == 16 {
        pixels
            .data
            .chunks_exact(2)
            .map(|pair| (u16::from_le_bytes([pair[0], pair[1]]) >> 8) as u8)
            .collect()
    } else {
        pixels.data.clone()
    };

    let rgb: Vec<u8> = match channels {
        1 | 2 => samples
            .chunks_exact(channels)
            .flat_map(|px| [px[0], px[0], px[0]])
            .collect(),
        3 => samples,
        _ => samples
            .chunks_exact(channels)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
    };

    RgbImage::from_raw(pixels.width, pixels.height, rgb).ok_or_else(unsupported)
}

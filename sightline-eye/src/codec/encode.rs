//! Frame → model input tensor

use crate::error::EncodeError;
use crate::frame::Frame;
use crate::tensor::Tensor;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

const CHANNELS: usize = 3;
const BYTES_PER_PIXEL: usize = 4;

/// Resampling used when the frame is not already `input_size × input_size`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    /// Nearest neighbor; fastest, blocky on downscale
    Nearest,
    /// Bilinear (triangle) filter
    #[default]
    Bilinear,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Bilinear => FilterType::Triangle,
        }
    }
}

/// Pack `frame` into a `[1, 3, S, S]` tensor with R, G, B planes in `[0, 1]`.
///
/// The frame is stretched to the square input; aspect ratio is not preserved.
pub fn encode(frame: &Frame, input_size: u32, filter: ResizeFilter) -> Result<Tensor<f32>, EncodeError> {
    let (width, height) = (frame.width(), frame.height());
    if width == 0 || height == 0 {
        return Err(EncodeError::EmptyFrame { width, height });
    }
    if input_size == 0 {
        return Err(EncodeError::InvalidInputSize);
    }

    let row_bytes = width as usize * BYTES_PER_PIXEL;
    if frame.stride() < row_bytes {
        return Err(EncodeError::InvalidStride {
            stride: frame.stride(),
            min: row_bytes,
        });
    }
    // Saturates so a stride beyond the address space reads as an unsatisfiable length
    let required = frame
        .stride()
        .checked_mul(height as usize - 1)
        .and_then(|n| n.checked_add(row_bytes))
        .unwrap_or(usize::MAX);
    if frame.pixels().len() < required {
        return Err(EncodeError::BufferTooSmall {
            expected: required,
            actual: frame.pixels().len(),
        });
    }

    let size = input_size as usize;
    let planes = if width == input_size && height == input_size {
        pack_planar(frame.pixels(), frame.stride(), size)
    } else {
        let source = packed_image(frame, row_bytes)?;
        let resized = imageops::resize(&source, input_size, input_size, filter.into());
        pack_planar(resized.as_raw(), size * BYTES_PER_PIXEL, size)
    };

    // Length is 3 * S * S by construction
    Tensor::new(vec![1, CHANNELS, size, size], planes).map_err(|_| EncodeError::InvalidInputSize)
}

/// Copy the visible rows into a tightly packed image, dropping stride padding
fn packed_image(frame: &Frame, row_bytes: usize) -> Result<RgbaImage, EncodeError> {
    let height = frame.height() as usize;
    let mut packed = Vec::with_capacity(row_bytes * height);
    for row in frame.pixels().chunks(frame.stride()).take(height) {
        packed.extend_from_slice(&row[..row_bytes]);
    }
    let actual = packed.len();
    RgbaImage::from_raw(frame.width(), frame.height(), packed).ok_or(EncodeError::BufferTooSmall {
        expected: row_bytes * height,
        actual,
    })
}

/// Interleaved RGBA rows → three contiguous planes
fn pack_planar(rgba: &[u8], stride: usize, size: usize) -> Vec<f32> {
    let plane = size * size;
    let mut out = vec![0.0f32; plane * CHANNELS];
    for y in 0..size {
        let row = &rgba[y * stride..y * stride + size * BYTES_PER_PIXEL];
        for (x, px) in row.chunks_exact(BYTES_PER_PIXEL).enumerate() {
            let idx = y * size + x;
            out[idx] = px[0] as f32 / 255.0;
            out[plane + idx] = px[1] as f32 / 255.0;
            out[2 * plane + idx] = px[2] as f32 / 255.0;
        }
    }
    out
}

//! Captured frames and frame identity

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Pixel layout of a frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit interleaved R, G, B, A
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Original frame size, returned with results so the producer can rescale boxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

/// An owned, immutable RGBA8 frame tagged with its capture order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    frame_id: u64,
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl Frame {
    /// Create a tightly packed RGBA8 frame (`stride == width * 4`)
    pub fn rgba(frame_id: u64, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        let stride = width as usize * PixelFormat::Rgba8.bytes_per_pixel();
        Self::with_stride(frame_id, width, height, stride, pixels)
    }

    /// Create an RGBA8 frame whose rows are `stride` bytes apart
    pub fn with_stride(frame_id: u64, width: u32, height: u32, stride: usize, pixels: Vec<u8>) -> Self {
        Self {
            frame_id,
            width,
            height,
            stride,
            format: PixelFormat::Rgba8,
            pixels,
        }
    }

    /// Solid-color frame, mostly useful for warm-up and tests
    pub fn filled(frame_id: u64, width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * 4);
        for _ in 0..count {
            pixels.extend_from_slice(&rgba);
        }
        Self::rgba(frame_id, width, height, pixels)
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn dimensions(&self) -> FrameDimensions {
        FrameDimensions {
            width: self.width,
            height: self.height,
        }
    }
}

/// Hands out strictly increasing frame ids.
///
/// Producers should stamp frames with this instead of wall-clock time, which
/// can produce equal ids for frames captured within the same clock tick.
#[derive(Debug)]
pub struct FrameClock {
    next: AtomicU64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Stamp a tightly packed RGBA8 buffer with the next id
    pub fn capture(&self, width: u32, height: u32, pixels: Vec<u8>) -> Frame {
        Frame::rgba(self.next_id(), width, height, pixels)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_frame_stride() {
        let frame = Frame::rgba(7, 4, 2, vec![0; 32]);
        assert_eq!(frame.stride(), 16);
        assert_eq!(frame.frame_id(), 7);
        assert_eq!(frame.format(), PixelFormat::Rgba8);
        assert_eq!(frame.dimensions(), FrameDimensions { width: 4, height: 2 });
    }

    #[test]
    fn test_filled_frame() {
        let frame = Frame::filled(1, 3, 3, [10, 20, 30, 255]);
        assert_eq!(frame.pixels().len(), 36);
        assert_eq!(&frame.pixels()[4..8], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_frame_clock_is_strictly_monotonic() {
        let clock = FrameClock::new();
        let ids: Vec<u64> = (0..100).map(|_| clock.next_id()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids[0], 1);
    }

    #[test]
    fn test_frame_clock_capture() {
        let clock = FrameClock::starting_at(10);
        let a = clock.capture(1, 1, vec![0; 4]);
        let b = clock.capture(1, 1, vec![0; 4]);
        assert_eq!(a.frame_id(), 10);
        assert_eq!(b.frame_id(), 11);
    }
}

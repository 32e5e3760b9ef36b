//! RGBA framebuffer the status panel is rendered into

use alloc::vec;
use alloc::vec::Vec;

/// Bytes per RGBA8 pixel
const BYTES_PER_PIXEL: usize = 4;

/// A grid of RGBA8 samples, row-major
///
/// Created per refresh by the renderer and consumed by [pack](crate::packer::pack).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Raw pixel data does not match the requested dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeMismatch {
    /// `width * height * 4`
    pub expected: usize,
    /// length of the data handed in
    pub actual: usize,
}

impl core::fmt::Display for SizeMismatch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "framebuffer size mismatch: expected {} bytes, got {}",
            self.expected, self.actual
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SizeMismatch {}

impl FrameBuffer {
    /// Creates a fully transparent framebuffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0; 4])
    }

    /// Creates a framebuffer with every pixel set to `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = vec![0; pixels * BYTES_PER_PIXEL];
        for chunk in data.chunks_exact_mut(BYTES_PER_PIXEL) {
            chunk.copy_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wraps raw RGBA8 data.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, SizeMismatch> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Returns the width of the framebuffer.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of the framebuffer.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the raw RGBA8 data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some((y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL)
        } else {
            None
        }
    }

    /// Returns the pixel at the given coordinates, `None` when out of range.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let idx = self.index(x, y)?;
        let mut rgba = [0; 4];
        rgba.copy_from_slice(&self.data[idx..idx + BYTES_PER_PIXEL]);
        Some(rgba)
    }

    /// Sets a pixel at the given coordinates. Writes outside the frame are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if let Some(idx) = self.index(x, y) {
            self.data[idx..idx + BYTES_PER_PIXEL].copy_from_slice(&rgba);
        }
    }

    /// Fills a rectangle, clipped to the frame.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, rgba: [u8; 4]) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        for py in y..y_end {
            for px in x..x_end {
                self.set_pixel(px, py, rgba);
            }
        }
    }

    /// Fills the whole frame with one color.
    pub fn clear(&mut self, rgba: [u8; 4]) {
        for chunk in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            chunk.copy_from_slice(&rgba);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK_RGBA, WHITE_RGBA};

    #[test]
    fn new_is_transparent() {
        let frame = FrameBuffer::new(4, 2);
        assert_eq!(frame.data().len(), 32);
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn pixel_access() {
        let mut frame = FrameBuffer::filled(3, 3, WHITE_RGBA);
        frame.set_pixel(1, 2, BLACK_RGBA);
        assert_eq!(frame.pixel(1, 2), Some(BLACK_RGBA));
        assert_eq!(frame.pixel(2, 1), Some(WHITE_RGBA));
        assert_eq!(frame.pixel(3, 0), None);

        // silently clipped
        frame.set_pixel(10, 10, BLACK_RGBA);
        frame.fill_rect(2, 2, 5, 5, BLACK_RGBA);
        assert_eq!(frame.pixel(2, 2), Some(BLACK_RGBA));
    }

    #[test]
    fn from_rgba_checks_len() {
        assert_eq!(
            FrameBuffer::from_rgba(2, 2, vec![0; 15]),
            Err(SizeMismatch {
                expected: 16,
                actual: 15
            })
        );
        let frame = FrameBuffer::from_rgba(2, 2, vec![0xFF; 16]).unwrap();
        assert_eq!(frame.pixel(1, 1), Some(WHITE_RGBA));
    }
}

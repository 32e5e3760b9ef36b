//! Conversion of an RGBA frame into a 1-bit bitplane
//!
//! The controller wants one bit per pixel, row-major, MSB first, with a
//! cleared bit for black. A frame may be rendered either in the panel's own
//! portrait layout or turned by 90° (landscape); the latter is rotated back
//! into panel space while packing.

use alloc::vec;
use alloc::vec::Vec;
use bit_field::BitField;
use core::fmt;

use crate::color::Color;
use crate::framebuffer::FrameBuffer;
use crate::geometry::{Orientation, PanelGeometry};

/// One packed bitplane, ready to be sent to the controller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedBitmap {
    bytes: Vec<u8>,
}

impl PackedBitmap {
    /// A plane of the given geometry with every pixel white.
    pub fn white(geometry: PanelGeometry) -> Self {
        PackedBitmap {
            bytes: vec![Color::White.get_byte_value(); geometry.buffer_len()],
        }
    }

    /// Raw bytes of the plane
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True for a plane without any bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Color of a single pixel in panel coordinates
    ///
    /// `None` for a pixel outside the panel or a plane packed for another one.
    pub fn color_at(&self, geometry: PanelGeometry, x: u32, y: u32) -> Option<Color> {
        if !geometry.contains(x, y) {
            return None;
        }
        let (index, bit) = bit_position(geometry, x, y);
        self.bytes
            .get(index)
            .map(|byte| Color::from(byte.get_bit(bit) as u8))
    }

    fn clear_bit(&mut self, index: usize, bit: usize) {
        self.bytes[index].set_bit(bit, false);
    }

    /// Consumes the plane and returns its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for PackedBitmap {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// The frame could not be packed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackError {
    /// The frame matches the panel in neither orientation
    UnsupportedDimensions {
        /// frame width
        width: u32,
        /// frame height
        height: u32,
        /// panel it was packed for
        panel: PanelGeometry,
    },
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedDimensions {
                width,
                height,
                panel,
            } => write!(
                f,
                "frame of {width}x{height} fits panel {panel} in no orientation"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PackError {}

// byte index and bit (LSB = 0) of a pixel in panel space
fn bit_position(geometry: PanelGeometry, x: u32, y: u32) -> (usize, usize) {
    let index = (x as usize + y as usize * geometry.width() as usize) / 8;
    (index, 7 - (x as usize % 8))
}

/// Packs `frame` into a black bitplane for a panel of `geometry`.
///
/// Every bit starts out white. For a horizontal frame the source pixel `(x, y)`
/// ends up at `(y, height - x - 1)` on the panel.
pub fn pack(frame: &FrameBuffer, geometry: PanelGeometry) -> Result<PackedBitmap, PackError> {
    let (frame_width, frame_height) = (frame.width(), frame.height());
    let orientation = geometry
        .orientation_of(frame_width, frame_height)
        .ok_or(PackError::UnsupportedDimensions {
            width: frame_width,
            height: frame_height,
            panel: geometry,
        })?;
    log::debug!("packing {frame_width}x{frame_height} frame ({orientation:?})");

    let mut bitmap = PackedBitmap::white(geometry);
    for y in 0..frame_height {
        for x in 0..frame_width {
            let black = frame
                .pixel(x, y)
                .map_or(false, |rgba| Color::from_rgba(rgba) == Color::Black);
            if !black {
                continue;
            }
            let (panel_x, panel_y) = match orientation {
                Orientation::Vertical => (x, y),
                Orientation::Horizontal => (y, geometry.height() - x - 1),
            };
            let (index, bit) = bit_position(geometry, panel_x, panel_y);
            bitmap.clear_bit(index, bit);
        }
    }
    Ok(bitmap)
}

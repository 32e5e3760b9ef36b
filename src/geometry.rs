//! Panel geometry and frame orientation

use core::fmt;

/// Pixel size of a panel as the controller sees it
///
/// This never changes at runtime and is handed by value to both the driver and
/// the [packer](crate::packer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PanelGeometry {
    width: u32,
    height: u32,
}

/// Invalid panel size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// One side is zero
    Empty,
    /// `width * height` is not a multiple of 8, bitplanes would not be byte aligned
    NotByteAligned {
        /// requested width
        width: u32,
        /// requested height
        height: u32,
    },
    /// `width * height` does not fit a `u32`
    TooLarge {
        /// requested width
        width: u32,
        /// requested height
        height: u32,
    },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "panel geometry must not be empty"),
            Self::NotByteAligned { width, height } => write!(
                f,
                "panel geometry {width}x{height} does not fill whole bytes"
            ),
            Self::TooLarge { width, height } => {
                write!(f, "panel geometry {width}x{height} is too large")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GeometryError {}

/// How a frame is laid out relative to the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Frame has the panel's own width and height
    Vertical,
    /// Frame is turned by 90°, width and height are swapped
    Horizontal,
}

impl PanelGeometry {
    /// Creates a new geometry, checking that the bitplanes are byte aligned.
    pub const fn new(width: u32, height: u32) -> Result<Self, GeometryError> {
        if width == 0 || height == 0 {
            return Err(GeometryError::Empty);
        }
        match width.checked_mul(height) {
            None => Err(GeometryError::TooLarge { width, height }),
            Some(pixels) if pixels % 8 != 0 => {
                Err(GeometryError::NotByteAligned { width, height })
            }
            Some(_) => Ok(PanelGeometry { width, height }),
        }
    }

    /// Width in pixels
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of bytes of one bitplane
    pub const fn buffer_len(&self) -> usize {
        (self.width * self.height / 8) as usize
    }

    /// Whether `(x, y)` lies on the panel
    pub const fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Determines how a frame of the given size maps onto the panel.
    ///
    /// Returns `None` if the frame matches neither orientation.
    pub fn orientation_of(&self, width: u32, height: u32) -> Option<Orientation> {
        if width == self.width && height == self.height {
            Some(Orientation::Vertical)
        } else if width == self.height && height == self.width {
            Some(Orientation::Horizontal)
        } else {
            None
        }
    }
}

impl fmt::Display for PanelGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

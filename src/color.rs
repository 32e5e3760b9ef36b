//! B/W Color for EPDs

/// Channel distance from the extremes below which a sample counts as white or transparent
pub const BLACK_THRESHOLD_OFFSET: u8 = 10;

/// Opaque white as RGBA
pub const WHITE_RGBA: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
/// Opaque black as RGBA
pub const BLACK_RGBA: [u8; 4] = [0x00, 0x00, 0x00, 0xFF];

/// Color of a single bit in one of the bitplanes
///
/// The controller of the 2.13" (B/C) panel expects a cleared bit for a
/// colored pixel and a set bit for white.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Color {
    /// Black (or red on the chromatic plane)
    Black,
    /// White
    #[default]
    White,
}

impl Color {
    /// Get the color encoding of the color for one bit
    pub fn get_bit_value(&self) -> u8 {
        match self {
            Color::White => 1u8,
            Color::Black => 0u8,
        }
    }

    /// Gets a full byte of black or white pixels
    pub fn get_byte_value(&self) -> u8 {
        match self {
            Color::White => 0xff,
            Color::Black => 0x00,
        }
    }

    /// Returns the inverse of the given color.
    pub fn inverse(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Classifies an RGBA sample.
    ///
    /// A pixel is black when it is dark on all three channels and not close
    /// to transparent. Everything else, light or see-through, stays white.
    pub fn from_rgba(rgba: [u8; 4]) -> Color {
        let [r, g, b, a] = rgba;
        let limit = u8::MAX - BLACK_THRESHOLD_OFFSET;
        if r < limit && g < limit && b < limit && a > BLACK_THRESHOLD_OFFSET {
            Color::Black
        } else {
            Color::White
        }
    }
}

impl From<u8> for Color {
    fn from(value: u8) -> Self {
        match value {
            0 => Color::Black,
            _ => Color::White,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_u8() {
        assert_eq!(Color::Black, Color::from(0u8));
        assert_eq!(Color::White, Color::from(1u8));
    }

    #[test]
    fn u8_conversion() {
        assert_eq!(Color::from(Color::Black.get_bit_value()), Color::Black);
        assert_eq!(Color::from(Color::White.get_bit_value()), Color::White);
        assert_eq!(Color::Black.inverse(), Color::White);
        assert_eq!(Color::White.inverse().get_byte_value(), 0x00);
    }

    #[test]
    fn rgba_threshold() {
        assert_eq!(Color::from_rgba(BLACK_RGBA), Color::Black);
        assert_eq!(Color::from_rgba(WHITE_RGBA), Color::White);
        // grey stays black as long as every channel is below 245
        assert_eq!(Color::from_rgba([244, 244, 244, 255]), Color::Black);
        assert_eq!(Color::from_rgba([245, 0, 0, 255]), Color::White);
        assert_eq!(Color::from_rgba([0, 0, 245, 255]), Color::White);
        // near transparent
        assert_eq!(Color::from_rgba([0, 0, 0, 10]), Color::White);
        assert_eq!(Color::from_rgba([0, 0, 0, 11]), Color::Black);
    }
}

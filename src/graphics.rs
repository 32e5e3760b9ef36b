//! Graphics Support for the RGBA framebuffer
//!
//! Lets embedded-graphics draw into a [FrameBuffer], which is then packed
//! into a bitplane. The frame keeps full RGBA so anything drawn with a color
//! counts as black once it is dark enough, see [Color::from_rgba](crate::color::Color::from_rgba).

use embedded_graphics_core::{
    pixelcolor::{Rgb888, RgbColor},
    prelude::*,
    primitives::Rectangle,
};

use crate::framebuffer::FrameBuffer;

fn to_rgba(color: Rgb888) -> [u8; 4] {
    [color.r(), color.g(), color.b(), 0xFF]
}

/// For use with embedded_grahics
impl DrawTarget for FrameBuffer {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            // negative coordinates are outside, everything else is clipped by set_pixel
            if let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) {
                self.set_pixel(x, y, to_rgba(color));
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if let Some(bottom_right) = area.bottom_right() {
            self.fill_rect(
                area.top_left.x as u32,
                area.top_left.y as u32,
                (bottom_right.x - area.top_left.x + 1) as u32,
                (bottom_right.y - area.top_left.y + 1) as u32,
                to_rgba(color),
            );
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        FrameBuffer::clear(self, to_rgba(color));
        Ok(())
    }
}

/// For use with embedded_grahics
impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK_RGBA, WHITE_RGBA};

    #[test]
    fn graphics_size() {
        let frame = FrameBuffer::new(212, 104);
        assert_eq!(frame.size(), Size::new(212, 104));
    }

    #[test]
    fn draw_and_clip() {
        let mut frame = FrameBuffer::new(8, 4);
        DrawTarget::clear(&mut frame, Rgb888::WHITE).unwrap();
        assert_eq!(frame.pixel(7, 3), Some(WHITE_RGBA));

        frame
            .draw_iter([
                Pixel(Point::new(1, 1), Rgb888::BLACK),
                Pixel(Point::new(-1, 1), Rgb888::BLACK),
                Pixel(Point::new(9, 9), Rgb888::BLACK),
            ])
            .unwrap();
        assert_eq!(frame.pixel(1, 1), Some(BLACK_RGBA));
        assert_eq!(frame.pixel(0, 1), Some(WHITE_RGBA));

        frame
            .fill_solid(
                &Rectangle::new(Point::new(-2, 3), Size::new(20, 5)),
                Rgb888::BLACK,
            )
            .unwrap();
        for x in 0..8 {
            assert_eq!(frame.pixel(x, 3), Some(BLACK_RGBA));
        }
        assert_eq!(frame.pixel(0, 2), Some(WHITE_RGBA));
    }
}

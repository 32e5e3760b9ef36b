use crate::geometry::PanelGeometry;

/// All commands need to have this trait which gives the address of the command
/// which needs to be send via SPI with activated CommandsPin (Data/Command Pin in CommandMode)
pub(crate) trait Command: Copy {
    fn address(self) -> u8;
}

/// All the functions to interact with a black/red EPD
///
/// The SPI device and the delay are borrowed per call, so the same bus can be
/// used for something else in between.
///
/// # Example
///
///```rust, no_run
///# use embedded_hal_mock::eh1::*;
///# fn main() -> Result<(), Box<dyn std::error::Error>> {
///use epd_stats::{epd2in13bc::*, framebuffer::FrameBuffer, prelude::*};
///#
///# let mut spi = spi::Mock::new(&[]);
///# let busy_in = digital::Mock::new(&[]);
///# let dc = digital::Mock::new(&[]);
///# let rst = digital::Mock::new(&[]);
///# let mut delay = delay::NoopDelay::new();
///
///// Setup EPD
///let mut epd = Epd2in13bc::new(busy_in, dc, rst, DriverSettings::default());
///epd.init(&mut spi, &mut delay)?;
///
///// Render and pack a landscape frame
///let frame = FrameBuffer::filled(212, 104, epd_stats::color::BLACK_RGBA);
///let black = pack(&frame, epd.geometry())?;
///
///// Display it without any red
///epd.display_black(&mut spi, &mut delay, black.as_bytes())?;
///
///// Set the EPD to sleep
///epd.sleep(&mut spi, &mut delay)?;
///# Ok(())
///# }
///```
pub trait BiColorDisplay<SPI, DELAY> {
    /// Error returned by every operation
    type Error;

    /// This initialises the EPD and powers it up
    ///
    /// This function calls the hardware reset, so you don't need to call reset
    /// yourself when trying to wake your device up after setting it to sleep.
    fn init(&mut self, spi: &mut SPI, delay: &mut DELAY) -> Result<(), Self::Error>;

    /// Let the device enter deep-sleep mode to save power.
    ///
    /// The deep sleep mode returns to standby with a hardware reset.
    fn sleep(&mut self, spi: &mut SPI, delay: &mut DELAY) -> Result<(), Self::Error>;

    /// Wakes the device up from sleep
    fn wake_up(&mut self, spi: &mut SPI, delay: &mut DELAY) -> Result<(), Self::Error>;

    /// Size of the panel in its native orientation
    fn geometry(&self) -> PanelGeometry;

    /// Get the width of the display
    fn width(&self) -> u32 {
        self.geometry().width()
    }

    /// Get the height of the display
    fn height(&self) -> u32 {
        self.geometry().height()
    }

    /// Transmits the black plane with a blank red plane and refreshes
    ///
    /// This function waits until the device isn't busy anymore
    fn display_black(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
        black: &[u8],
    ) -> Result<(), Self::Error>;

    /// Transmits both planes and refreshes
    ///
    /// This function waits until the device isn't busy anymore
    fn display(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
        black: &[u8],
        chromatic: &[u8],
    ) -> Result<(), Self::Error>;

    /// Turns the whole panel white
    fn clear(&mut self, spi: &mut SPI, delay: &mut DELAY) -> Result<(), Self::Error>;

    /// Checks if the display is busy transmitting data
    ///
    /// This is normally handled by the more complicated commands themselves,
    /// but in the case you send data and commands directly you might need to check
    /// if the device is still busy
    fn is_busy(&mut self) -> bool;
}

//! A simple Driver for the Waveshare 2.13" (B/C) E-Ink Display via SPI
//! More information on this display can be found at the [Waveshare Wiki](https://www.waveshare.com/wiki/2.13inch_e-Paper_HAT_(B))
//! This driver was build and tested for 212x104, 2.13inch E-Ink display HAT for Raspberry Pi, three-color, SPI interface
//!
//! # Example for the 2.13" E-Ink Display
//!
//!```rust, no_run
//!# use embedded_hal_mock::eh1::*;
//!# fn main() -> Result<(), Box<dyn std::error::Error>> {
//!use epd_stats::{epd2in13bc::*, prelude::*};
//!#
//!# let mut spi = spi::Mock::new(&[]);
//!# let busy_in = digital::Mock::new(&[]);
//!# let dc = digital::Mock::new(&[]);
//!# let rst = digital::Mock::new(&[]);
//!# let mut delay = delay::NoopDelay::new();
//!
//!// Setup EPD
//!let mut epd = Epd2in13bc::new(busy_in, dc, rst, DriverSettings::default());
//!epd.init(&mut spi, &mut delay)?;
//!
//!// Both planes are packed the same way, a cleared bit is a colored pixel
//!let black = PackedBitmap::white(GEOMETRY);
//!let red = PackedBitmap::white(GEOMETRY);
//!epd.display(&mut spi, &mut delay, black.as_bytes(), red.as_bytes())?;
//!
//!// Set the EPD to sleep
//!epd.sleep(&mut spi, &mut delay)?;
//!# Ok(())
//!# }
//!```
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};

use crate::color::Color;
use crate::error::ErrorKind;
use crate::geometry::PanelGeometry;
use crate::interface::{DisplayInterface, ResetTiming};
use crate::traits::BiColorDisplay;

pub(crate) mod command;
use self::command::Command;

/// Width of epd2in13bc in pixels
pub const WIDTH: u32 = 104;
/// Height of epd2in13bc in pixels
pub const HEIGHT: u32 = 212;

/// Native geometry of the panel
pub const GEOMETRY: PanelGeometry = match PanelGeometry::new(WIDTH, HEIGHT) {
    Ok(geometry) => geometry,
    Err(_) => panic!("epd2in13bc geometry is not byte aligned"),
};

/// Default interval between two reads of the busy line
pub const DEFAULT_BUSY_POLL_MS: u32 = 100;
/// Default upper bound for a single busy wait, a full refresh takes ~15s
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 60_000;

const RESET_TIMING: ResetTiming = ResetTiming {
    initial_ms: 200,
    low_ms: 10,
    settle_ms: 200,
};
const INIT_SETTLE_MS: u32 = 100;

const BOOSTER_SOFT_START: [u8; 3] = [0x17, 0x17, 0x17];
const PANEL_SETTING: u8 = 0x8F;
const VCOM_AND_DATA_INTERVAL: u8 = 0xF0;
const DEEP_SLEEP_CHECK_CODE: u8 = 0xA5;

/// Construction parameters of the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverSettings {
    /// Panel size the controller is configured for
    pub geometry: PanelGeometry,
    /// Interval between two reads of the busy line
    pub busy_poll_ms: u32,
    /// Give up waiting for the busy line after this long
    pub busy_timeout_ms: u32,
}

impl Default for DriverSettings {
    fn default() -> Self {
        DriverSettings {
            geometry: GEOMETRY,
            busy_poll_ms: DEFAULT_BUSY_POLL_MS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

// contents of one bitplane
#[derive(Clone, Copy)]
enum Plane<'a> {
    Buffer(&'a [u8]),
    Fill(Color),
}

/// Epd2in13bc driver
pub struct Epd2in13bc<SPI, BUSY, DC, RST> {
    interface: DisplayInterface<SPI, BUSY, DC, RST>,
    geometry: PanelGeometry,
}

impl<SPI, BUSY, DC, RST> Epd2in13bc<SPI, BUSY, DC, RST>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
{
    /// Creates a new driver from the Busy InputPin, DC and RST
    ///
    /// Nothing is sent yet, call [init](BiColorDisplay::init) before the
    /// first frame.
    pub fn new(busy: BUSY, dc: DC, rst: RST, settings: DriverSettings) -> Self {
        let interface = DisplayInterface::new(
            busy,
            dc,
            rst,
            settings.busy_poll_ms,
            settings.busy_timeout_ms,
        );
        Epd2in13bc {
            interface,
            geometry: settings.geometry,
        }
    }

    /// Hardware reset: high for 200ms, low for 10ms, high for 200ms
    pub fn reset<DELAY: DelayNs>(
        &mut self,
        delay: &mut DELAY,
    ) -> Result<(), ErrorKind<SPI, BUSY, DC, RST>> {
        log::debug!("reset");
        self.interface.reset(delay, RESET_TIMING)
    }

    /// Panel size the controller was set up for
    pub fn geometry(&self) -> PanelGeometry {
        self.geometry
    }

    /// Gives back the pins
    pub fn release(self) -> (BUSY, DC, RST) {
        self.interface.release()
    }

    fn command(
        &mut self,
        spi: &mut SPI,
        command: Command,
    ) -> Result<(), ErrorKind<SPI, BUSY, DC, RST>> {
        self.interface.cmd(spi, command)
    }

    fn cmd_with_data(
        &mut self,
        spi: &mut SPI,
        command: Command,
        data: &[u8],
    ) -> Result<(), ErrorKind<SPI, BUSY, DC, RST>> {
        self.interface.cmd_with_data(spi, command, data)
    }

    fn wait_until_idle<DELAY: DelayNs>(
        &mut self,
        delay: &mut DELAY,
    ) -> Result<(), ErrorKind<SPI, BUSY, DC, RST>> {
        self.interface.wait_until_idle(delay)
    }

    fn send_resolution(&mut self, spi: &mut SPI) -> Result<(), ErrorKind<SPI, BUSY, DC, RST>> {
        let w = self.geometry.width();
        let h = self.geometry.height();

        self.cmd_with_data(
            spi,
            Command::ResolutionSetting,
            &[(w & 0xFF) as u8, (h >> 8) as u8, (h & 0xFF) as u8],
        )
    }

    fn check_len(&self, buffer: &[u8]) -> Result<(), ErrorKind<SPI, BUSY, DC, RST>> {
        let expected = self.geometry.buffer_len();
        if buffer.len() == expected {
            Ok(())
        } else {
            Err(ErrorKind::BufferSize {
                expected,
                actual: buffer.len(),
            })
        }
    }

    // 0x10 black, 0x92, 0x13 red, 0x92, 0x12 and wait for the refresh
    fn send_planes<DELAY: DelayNs>(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
        black: Plane<'_>,
        chromatic: Plane<'_>,
    ) -> Result<(), ErrorKind<SPI, BUSY, DC, RST>> {
        for plane in [black, chromatic] {
            if let Plane::Buffer(buffer) = plane {
                self.check_len(buffer)?;
            }
        }

        let len = self.geometry.buffer_len();
        for (start, plane) in [
            (Command::DataStartTransmission1, black),
            (Command::DataStartTransmission2, chromatic),
        ] {
            log::debug!("sending plane {:#04x}", start as u8);
            self.command(spi, start)?;
            match plane {
                Plane::Buffer(buffer) => self.interface.data(spi, buffer)?,
                Plane::Fill(color) => {
                    self.interface
                        .data_x_times(spi, color.get_byte_value(), len)?
                }
            }
            self.command(spi, Command::DataStop)?;
        }

        log::debug!("refresh");
        self.command(spi, Command::DisplayRefresh)?;
        self.wait_until_idle(delay)
    }
}

impl<SPI, BUSY, DC, RST, DELAY> BiColorDisplay<SPI, DELAY> for Epd2in13bc<SPI, BUSY, DC, RST>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    type Error = ErrorKind<SPI, BUSY, DC, RST>;

    fn init(&mut self, spi: &mut SPI, delay: &mut DELAY) -> Result<(), Self::Error> {
        self.reset(delay)?;

        log::debug!("booster soft start");
        self.cmd_with_data(spi, Command::BoosterSoftStart, &BOOSTER_SOFT_START)?;

        log::debug!("power on");
        self.command(spi, Command::PowerOn)?;
        self.wait_until_idle(delay)?;

        log::debug!("panel setting");
        self.cmd_with_data(spi, Command::PanelSetting, &[PANEL_SETTING])?;

        log::debug!("vcom and data interval setting");
        self.cmd_with_data(
            spi,
            Command::VcomAndDataIntervalSetting,
            &[VCOM_AND_DATA_INTERVAL],
        )?;

        log::debug!("resolution setting {}", self.geometry);
        self.send_resolution(spi)?;

        delay.delay_ms(INIT_SETTLE_MS);
        log::debug!("init done");
        Ok(())
    }

    fn sleep(&mut self, spi: &mut SPI, delay: &mut DELAY) -> Result<(), Self::Error> {
        self.command(spi, Command::PowerOff)?;
        self.wait_until_idle(delay)?;

        self.cmd_with_data(spi, Command::DeepSleep, &[DEEP_SLEEP_CHECK_CODE])
    }

    fn wake_up(&mut self, spi: &mut SPI, delay: &mut DELAY) -> Result<(), Self::Error> {
        self.init(spi, delay)
    }

    fn geometry(&self) -> PanelGeometry {
        self.geometry
    }

    fn display_black(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
        black: &[u8],
    ) -> Result<(), Self::Error> {
        // black-only: the red plane is always blanked
        self.send_planes(
            spi,
            delay,
            Plane::Buffer(black),
            Plane::Fill(Color::White),
        )
    }

    fn display(
        &mut self,
        spi: &mut SPI,
        delay: &mut DELAY,
        black: &[u8],
        chromatic: &[u8],
    ) -> Result<(), Self::Error> {
        self.send_planes(
            spi,
            delay,
            Plane::Buffer(black),
            Plane::Buffer(chromatic),
        )
    }

    fn clear(&mut self, spi: &mut SPI, delay: &mut DELAY) -> Result<(), Self::Error> {
        log::debug!("clear");
        self.send_planes(
            spi,
            delay,
            Plane::Fill(Color::White),
            Plane::Fill(Color::White),
        )
    }

    fn is_busy(&mut self) -> bool {
        self.interface.is_busy()
    }
}

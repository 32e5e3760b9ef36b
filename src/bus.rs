//! Linux host side of the display connection
//!
//! The panel hangs off `/dev/spidevX.Y` with three sysfs GPIO lines next to it.
//! By default spidev drives its own chip select (CE0 is BCM8 on a Raspberry Pi,
//! and the spi0 driver keeps that line claimed, so it cannot be exported).
//! With `cs_pin` set, chip select moves to that sysfs line instead and the
//! kernel's chip select is switched off.

use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use embedded_hal::{
    delay::DelayNs,
    digital::{self, InputPin, OutputPin},
    spi::{self, SpiBus},
};
use embedded_hal_bus::spi::ExclusiveDevice;
use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use sysfs_gpio::{Direction, Pin};

use crate::epd2in13bc::{DriverSettings, Epd2in13bc};

/// SPI clock the panel is driven with
pub const DEFAULT_SPEED_HZ: u32 = 2_000_000;

const EXPORT_POLLS: u32 = 100;
const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// SPI device on top of the spidev bus and its chip select
pub type LinuxSpi = ExclusiveDevice<SpidevBus, ChipSelect, Delay>;

/// Driver wired to the Linux bus
pub type LinuxEpd = Epd2in13bc<LinuxSpi, SysfsPin, SysfsPin, SysfsPin>;

/// Where the panel is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// spidev character device
    pub device: PathBuf,
    pub speed_hz: u32,
    /// BCM numbers of the control lines
    pub reset_pin: u64,
    pub dc_pin: u64,
    /// `None` leaves chip select to spidev
    pub cs_pin: Option<u64>,
    pub busy_pin: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig {
            device: PathBuf::from("/dev/spidev0.0"),
            speed_hz: DEFAULT_SPEED_HZ,
            reset_pin: 17,
            dc_pin: 25,
            cs_pin: None,
            busy_pin: 24,
        }
    }
}

/// The bus could not be brought up
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("failed to open SPI device {}", path.display())]
    Spi {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to set up GPIO {pin}")]
    Gpio {
        pin: u64,
        #[source]
        source: sysfs_gpio::Error,
    },
}

/// A sysfs GPIO read or write failed
#[derive(Debug, thiserror::Error)]
#[error("GPIO {pin} access failed")]
pub struct GpioError {
    pin: u64,
    #[source]
    source: sysfs_gpio::Error,
}

impl digital::Error for GpioError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

/// A spidev transfer failed
#[derive(Debug, thiserror::Error)]
#[error("SPI transfer failed")]
pub struct SpiError(#[from] io::Error);

impl spi::Error for SpiError {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

/// An exported sysfs GPIO line
#[derive(Debug)]
pub struct SysfsPin(Pin);

impl SysfsPin {
    /// Exports the line and sets its direction
    pub fn export(number: u64, direction: Direction) -> Result<Self, BusError> {
        let pin = Pin::new(number);
        let gpio_error = |source| BusError::Gpio {
            pin: number,
            source,
        };
        pin.export().map_err(gpio_error)?;
        // the sysfs directory shows up asynchronously after the export
        for _ in 0..EXPORT_POLLS {
            if pin.is_exported() {
                break;
            }
            thread::sleep(EXPORT_POLL_INTERVAL);
        }
        pin.set_direction(direction).map_err(gpio_error)?;
        log::debug!("exported GPIO {number} as {direction:?}");
        Ok(SysfsPin(pin))
    }

    pub fn number(&self) -> u64 {
        self.0.get_pin_num()
    }

    fn error(&self, source: sysfs_gpio::Error) -> GpioError {
        GpioError {
            pin: self.number(),
            source,
        }
    }
}

impl digital::ErrorType for SysfsPin {
    type Error = GpioError;
}

impl OutputPin for SysfsPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_value(0).map_err(|e| self.error(e))
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_value(1).map_err(|e| self.error(e))
    }
}

impl InputPin for SysfsPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0
            .get_value()
            .map(|value| value != 0)
            .map_err(|e| self.error(e))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Chip select of the panel
#[derive(Debug)]
pub enum ChipSelect {
    /// spidev toggles its own CE line around every transfer
    Kernel,
    /// An exported sysfs line
    Gpio(SysfsPin),
}

impl digital::ErrorType for ChipSelect {
    type Error = GpioError;
}

impl OutputPin for ChipSelect {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        match self {
            ChipSelect::Kernel => Ok(()),
            ChipSelect::Gpio(pin) => pin.set_low(),
        }
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        match self {
            ChipSelect::Kernel => Ok(()),
            ChipSelect::Gpio(pin) => pin.set_high(),
        }
    }
}

/// spidev as an [SpiBus]
#[derive(Debug)]
pub struct SpidevBus(Spidev);

impl SpidevBus {
    /// Opens the device in mode 0 with 8 bits per word
    pub fn open(config: &BusConfig) -> Result<Self, BusError> {
        let spi_error = |source| BusError::Spi {
            path: config.device.clone(),
            source,
        };
        let mut spi = Spidev::open(&config.device).map_err(spi_error)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(config.speed_hz)
            .mode(spi_mode(config))
            .build();
        spi.configure(&options).map_err(spi_error)?;
        Ok(SpidevBus(spi))
    }
}

// kernel chip select only when no GPIO takes over
fn spi_mode(config: &BusConfig) -> SpiModeFlags {
    match config.cs_pin {
        Some(_) => SpiModeFlags::SPI_MODE_0 | SpiModeFlags::SPI_NO_CS,
        None => SpiModeFlags::SPI_MODE_0,
    }
}

impl spi::ErrorType for SpidevBus {
    type Error = SpiError;
}

impl SpiBus<u8> for SpidevBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let mut transfer = SpidevTransfer::read(words);
        self.0.transfer(&mut transfer)?;
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.0.write_all(words)?;
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        let common = read.len().min(write.len());
        let (read_common, read_rest) = read.split_at_mut(common);
        let (write_common, write_rest) = write.split_at(common);
        let mut transfer = SpidevTransfer::read_write(write_common, read_common);
        self.0.transfer(&mut transfer)?;
        if !write_rest.is_empty() {
            self.write(write_rest)?;
        }
        if !read_rest.is_empty() {
            self.read(read_rest)?;
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let tx = words.to_vec();
        let mut transfer = SpidevTransfer::read_write(&tx, words);
        self.0.transfer(&mut transfer)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush()?;
        Ok(())
    }
}

/// Sleeping delay for the host
#[derive(Debug, Default, Clone, Copy)]
pub struct Delay;

impl DelayNs for Delay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms.into()));
    }
}

/// An opened panel connection: the driver plus the SPI device it talks through
pub struct LinuxBus {
    pub epd: LinuxEpd,
    pub spi: LinuxSpi,
    pub delay: Delay,
    lines: Vec<u64>,
}

impl LinuxBus {
    /// Opens spidev and exports the control lines
    ///
    /// Lines exported before a failure are unexported again.
    pub fn open(config: &BusConfig, settings: DriverSettings) -> Result<Self, BusError> {
        let mut lines = Vec::with_capacity(4);
        match Self::connect(config, settings, &mut lines) {
            Ok((epd, spi)) => {
                log::info!(
                    "opened {} at {}Hz",
                    config.device.display(),
                    config.speed_hz
                );
                Ok(LinuxBus {
                    epd,
                    spi,
                    delay: Delay,
                    lines,
                })
            }
            Err(e) => {
                unexport(&lines);
                Err(e)
            }
        }
    }

    fn connect(
        config: &BusConfig,
        settings: DriverSettings,
        lines: &mut Vec<u64>,
    ) -> Result<(LinuxEpd, LinuxSpi), BusError> {
        let mut export = |number, direction| {
            let pin = SysfsPin::export(number, direction)?;
            lines.push(number);
            Ok::<_, BusError>(pin)
        };
        let rst = export(config.reset_pin, Direction::High)?;
        let dc = export(config.dc_pin, Direction::Low)?;
        let busy = export(config.busy_pin, Direction::In)?;
        let cs = match config.cs_pin {
            Some(number) => ChipSelect::Gpio(export(number, Direction::High)?),
            None => ChipSelect::Kernel,
        };

        let bus = SpidevBus::open(config)?;
        let spi = ExclusiveDevice::new(bus, cs, Delay).map_err(|e| BusError::Gpio {
            pin: e.pin,
            source: e.source,
        })?;
        Ok((Epd2in13bc::new(busy, dc, rst, settings), spi))
    }

    /// Releases the GPIO lines, the spidev handle is closed on drop
    pub fn close(self) -> Result<(), BusError> {
        let LinuxBus { epd, spi, lines, .. } = self;
        drop(spi);
        drop(epd.release());
        for &pin in &lines {
            Pin::new(pin)
                .unexport()
                .map_err(|source| BusError::Gpio { pin, source })?;
        }
        log::debug!("unexported GPIO {lines:?}");
        Ok(())
    }
}

fn unexport(lines: &[u64]) {
    for &pin in lines {
        if let Err(e) = Pin::new(pin).unexport() {
            log::warn!("failed to unexport GPIO {pin}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_wiring() {
        let config = BusConfig::default();
        assert_eq!(config.device, PathBuf::from("/dev/spidev0.0"));
        assert_eq!(config.speed_hz, 2_000_000);
        assert_eq!(
            (
                config.reset_pin,
                config.dc_pin,
                config.cs_pin,
                config.busy_pin
            ),
            (17, 25, None, 24)
        );
    }

    #[test]
    fn kernel_chip_select_by_default() {
        let mut config = BusConfig::default();
        assert_eq!(spi_mode(&config), SpiModeFlags::SPI_MODE_0);

        config.cs_pin = Some(26);
        assert_eq!(
            spi_mode(&config),
            SpiModeFlags::SPI_MODE_0 | SpiModeFlags::SPI_NO_CS
        );

        let mut cs = ChipSelect::Kernel;
        assert!(cs.set_low().is_ok());
        assert!(cs.set_high().is_ok());
    }

    #[test]
    fn missing_device_is_reported() {
        let config = BusConfig {
            device: PathBuf::from("/nonexistent/spidev9.9"),
            ..BusConfig::default()
        };
        match SpidevBus::open(&config) {
            Err(BusError::Spi { path, .. }) => assert_eq!(path, config.device),
            other => panic!("unexpected result {other:?}"),
        }
    }
}

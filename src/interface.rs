use crate::{error::ErrorKind, traits::Command};
use core::marker::PhantomData;
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};

const MIN_POLL_MS: u32 = 1;

/// How long the reset line is held in each of its three phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResetTiming {
    pub initial_ms: u32,
    pub low_ms: u32,
    pub settle_ms: u32,
}

/// The Connection Interface of the Waveshare EPD-Devices
///
/// Every byte is its own SPI transaction, so chip select is asserted and
/// released around each of them.
pub(crate) struct DisplayInterface<SPI, BUSY, DC, RST> {
    /// SPI
    _spi: PhantomData<SPI>,
    /// Low for busy, Wait until display is ready!
    busy: BUSY,
    /// Data/Command Control Pin (High for data, Low for command)
    dc: DC,
    /// Pin for Resetting
    rst: RST,
    /// number of ms the idle loop should sleep on
    poll_ms: u32,
    /// give up waiting for the busy line after this many ms
    timeout_ms: u32,
}

impl<SPI, BUSY, DC, RST> DisplayInterface<SPI, BUSY, DC, RST>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
{
    /// Creates a new `DisplayInterface` struct
    ///
    /// A poll interval of 0 is raised to 1ms, the wait would never reach
    /// `timeout_ms` otherwise.
    pub fn new(busy: BUSY, dc: DC, rst: RST, poll_ms: u32, timeout_ms: u32) -> Self {
        DisplayInterface {
            _spi: PhantomData,
            busy,
            dc,
            rst,
            poll_ms: poll_ms.max(MIN_POLL_MS),
            timeout_ms,
        }
    }

    /// Gives back the pins
    pub(crate) fn release(self) -> (BUSY, DC, RST) {
        (self.busy, self.dc, self.rst)
    }

    /// Sends one byte, either as command (dc low) or as data (dc high)
    pub(crate) fn transfer_byte(
        &mut self,
        spi: &mut SPI,
        is_command: bool,
        value: u8,
    ) -> Result<(), ErrorKind<SPI, BUSY, DC, RST>> {
        if is_command {
            self.dc.set_low().map_err(ErrorKind::DcError)?;
        } else {
            self.dc.set_high().map_err(ErrorKind::DcError)?;
        }
        spi.write(&[value]).map_err(ErrorKind::SpiError)
    }

    /// Basic function for sending [Commands](Command).
    ///
    /// Enables direct interaction with the device with the help of [data()](DisplayInterface::data())
    pub(crate) fn cmd<T: Command>(
        &mut self,
        spi: &mut SPI,
        command: T,
    ) -> Result<(), ErrorKind<SPI, BUSY, DC, RST>> {
        self.transfer_byte(spi, true, command.address())
    }

    /// Basic function for sending an array of u8-values of data over spi
    pub(crate) fn data(
        &mut self,
        spi: &mut SPI,
        data: &[u8],
    ) -> Result<(), ErrorKind<SPI, BUSY, DC, RST>> {
        for val in data.iter().copied() {
            self.transfer_byte(spi, false, val)?;
        }
        Ok(())
    }

    /// Basic function for sending [Commands](Command) and the data belonging to it.
    pub(crate) fn cmd_with_data<T: Command>(
        &mut self,
        spi: &mut SPI,
        command: T,
        data: &[u8],
    ) -> Result<(), ErrorKind<SPI, BUSY, DC, RST>> {
        self.cmd(spi, command)?;
        self.data(spi, data)
    }

    /// Basic function for sending the same byte of data (one u8) multiple times over spi
    pub(crate) fn data_x_times(
        &mut self,
        spi: &mut SPI,
        val: u8,
        repetitions: usize,
    ) -> Result<(), ErrorKind<SPI, BUSY, DC, RST>> {
        for _ in 0..repetitions {
            self.transfer_byte(spi, false, val)?;
        }
        Ok(())
    }

    /// Waits until device isn't busy anymore (busy == HIGH)
    ///
    /// The line is polled every `poll_ms`. After `timeout_ms` without a
    /// release the wait ends with [ErrorKind::DeviceTimeout].
    pub(crate) fn wait_until_idle<DELAY: DelayNs>(
        &mut self,
        delay: &mut DELAY,
    ) -> Result<(), ErrorKind<SPI, BUSY, DC, RST>> {
        let mut waited_ms = 0;
        log::trace!("e-Paper busy");
        while self.busy.is_low().map_err(ErrorKind::BusyError)? {
            if waited_ms >= self.timeout_ms {
                log::warn!("e-Paper still busy after {waited_ms}ms, giving up");
                return Err(ErrorKind::DeviceTimeout { waited_ms });
            }
            delay.delay_ms(self.poll_ms);
            waited_ms = waited_ms.saturating_add(self.poll_ms);
        }
        log::trace!("e-Paper busy release after {waited_ms}ms");
        Ok(())
    }

    /// Checks if device is still busy
    ///
    /// A failing read counts as not busy.
    pub(crate) fn is_busy(&mut self) -> bool {
        self.busy.is_low().unwrap_or(false)
    }

    /// Drives the reset line
    pub(crate) fn set_reset(&mut self, high: bool) -> Result<(), ErrorKind<SPI, BUSY, DC, RST>> {
        if high {
            self.rst.set_high().map_err(ErrorKind::RstError)
        } else {
            self.rst.set_low().map_err(ErrorKind::RstError)
        }
    }

    /// Resets the device.
    ///
    /// Often used to awake the module from deep sleep. See [Epd2in13bc::sleep()](crate::epd2in13bc::Epd2in13bc)
    pub(crate) fn reset<DELAY: DelayNs>(
        &mut self,
        delay: &mut DELAY,
        timing: ResetTiming,
    ) -> Result<(), ErrorKind<SPI, BUSY, DC, RST>> {
        self.set_reset(true)?;
        delay.delay_ms(timing.initial_ms);

        self.set_reset(false)?;
        delay.delay_ms(timing.low_ms);

        self.set_reset(true)?;
        delay.delay_ms(timing.settle_ms);
        Ok(())
    }
}

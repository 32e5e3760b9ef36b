use core::fmt::{Debug, Display, Formatter};

use embedded_hal::{digital, spi};

/// Epd error type
pub enum ErrorKind<SPI, BUSY, DC, RST>
where
    SPI: spi::ErrorType,
    BUSY: digital::ErrorType,
    DC: digital::ErrorType,
    RST: digital::ErrorType,
{
    /// Encountered an SPI error
    SpiError(SPI::Error),

    /// Encountered an error on Busy GPIO
    BusyError(BUSY::Error),

    /// Encountered an error on DC GPIO
    DcError(DC::Error),

    /// Encountered an error on RST GPIO
    RstError(RST::Error),

    /// The busy line did not go high in time
    DeviceTimeout {
        /// time spent polling the busy line
        waited_ms: u32,
    },

    /// A bitplane does not match the panel size
    BufferSize {
        /// `width * height / 8` of the panel
        expected: usize,
        /// length of the buffer handed in
        actual: usize,
    },
}

impl<SPI, BUSY, DC, RST> Display for ErrorKind<SPI, BUSY, DC, RST>
where
    SPI: spi::ErrorType,
    BUSY: digital::ErrorType,
    DC: digital::ErrorType,
    RST: digital::ErrorType,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SpiError(err) => write!(f, "SPI error: {err:?}"),
            Self::BusyError(err) => write!(f, "busy pin error: {err:?}"),
            Self::DcError(err) => write!(f, "dc pin error: {err:?}"),
            Self::RstError(err) => write!(f, "reset pin error: {err:?}"),
            Self::DeviceTimeout { waited_ms } => {
                write!(f, "display still busy after {waited_ms}ms")
            }
            Self::BufferSize { expected, actual } => write!(
                f,
                "bitplane has {actual} bytes, the panel needs {expected}"
            ),
        }
    }
}

impl<SPI, BUSY, DC, RST> Debug for ErrorKind<SPI, BUSY, DC, RST>
where
    SPI: spi::ErrorType,
    BUSY: digital::ErrorType,
    DC: digital::ErrorType,
    RST: digital::ErrorType,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SpiError(err) => f.debug_tuple("SpiError").field(err).finish(),
            Self::BusyError(err) => f.debug_tuple("BusyError").field(err).finish(),
            Self::DcError(err) => f.debug_tuple("DcError").field(err).finish(),
            Self::RstError(err) => f.debug_tuple("RstError").field(err).finish(),
            Self::DeviceTimeout { waited_ms } => f
                .debug_struct("DeviceTimeout")
                .field("waited_ms", waited_ms)
                .finish(),
            Self::BufferSize { expected, actual } => f
                .debug_struct("BufferSize")
                .field("expected", expected)
                .field("actual", actual)
                .finish(),
        }
    }
}

#[cfg(feature = "std")]
impl<SPI, BUSY, DC, RST> std::error::Error for ErrorKind<SPI, BUSY, DC, RST>
where
    SPI: spi::ErrorType,
    BUSY: digital::ErrorType,
    DC: digital::ErrorType,
    RST: digital::ErrorType,
{
}

impl<SPI, BUSY, DC, RST> ErrorKind<SPI, BUSY, DC, RST>
where
    SPI: spi::ErrorType,
    BUSY: digital::ErrorType,
    DC: digital::ErrorType,
    RST: digital::ErrorType,
{
    /// True if the display stopped answering on the busy line
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::DeviceTimeout { .. })
    }
}

//! Case statistics on a Waveshare 2.13" (B/C) E-Ink Display
//!
//! The driver part of this crate was built using [`embedded-hal`] traits and works
//! without the standard library. The application part (fetching, rendering, the
//! refresh loop) needs the `app` feature.
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal/1.0.0
//!
//! # Requirements
//!
//! ### SPI
//!
//! - MISO is not connected/available
//! - SPI_MODE_0 is used (CPHL = 0, CPOL = 0)
//! - 8 bits per word, MSB first
//! - 2Mhz is used by the binary, the controller handles more
//!
//! ### Other....
//!
//! - Buffersize: every bitplane needs to be of the size `width * height / 8`,
//!   see [PanelGeometry::buffer_len](geometry::PanelGeometry::buffer_len)
//! - The busy line is low while the controller is working
//!
//! # Examples
//!
//! ```ignore
//! use epd_stats::{epd2in13bc::*, framebuffer::FrameBuffer, packer::pack, prelude::*};
//!
//! let mut epd = Epd2in13bc::new(busy, dc, rst, DriverSettings::default());
//! epd.init(&mut spi, &mut delay)?;
//!
//! // a landscape frame gets rotated into panel space
//! let frame = FrameBuffer::filled(212, 104, WHITE_RGBA);
//! let black = pack(&frame, GEOMETRY)?;
//!
//! epd.display_black(&mut spi, &mut delay, black.as_bytes())?;
//! epd.sleep(&mut spi, &mut delay)?;
//! ```
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "graphics")]
pub mod graphics;

mod traits;

pub mod color;
pub mod error;
pub mod framebuffer;
pub mod geometry;
pub mod packer;

/// Interface for the physical connection between display and the controlling device
mod interface;

pub mod epd2in13bc;

#[cfg(feature = "linux-dev")]
pub mod bus;

#[cfg(feature = "app")]
pub mod app;
#[cfg(feature = "app")]
pub mod config;
#[cfg(feature = "app")]
pub mod render;
#[cfg(feature = "app")]
pub mod stats;

pub mod prelude {
    pub use crate::color::Color;
    pub use crate::error::ErrorKind;
    pub use crate::framebuffer::FrameBuffer;
    pub use crate::geometry::{Orientation, PanelGeometry};
    pub use crate::packer::{pack, PackError, PackedBitmap};
    pub use crate::traits::BiColorDisplay;
    pub use crate::SPI_MODE;
}

use embedded_hal::spi::{Mode, Phase, Polarity};

/// SPI mode -
/// For more infos see [Requirements: SPI](index.html#spi)
pub const SPI_MODE: Mode = Mode {
    phase: Phase::CaptureOnFirstTransition,
    polarity: Polarity::IdleLow,
};

//! Error types for LIN master operations.
//!
//! This module defines the [`Error`] enum. Conditions on the bus itself
//! (no response, checksum mismatch, resynchronization, overflow) are not
//! errors: they are reported through [`LinFrame`](crate::LinFrame) flags and
//! [`EchoStatus`](crate::EchoStatus). `Error` covers contract violations by
//! the caller and failures of the underlying transport.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "std")]
//! # {
//! use lin_master::{Error, LinMaster, Result, SimulatedBus};
//!
//! fn read_sensor(master: &mut LinMaster<SimulatedBus>) -> Result<Option<u8>> {
//!     match master.request_frame(0x22) {
//!         Ok(frame) if frame.checksum_valid() => Ok(frame.data().first().copied()),
//!         Ok(_) => Ok(None),
//!         Err(Error::IOError(e)) => {
//!             eprintln!("Transport failure: {}", e);
//!             Err(Error::IOError(e))
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! # }
//! ```

use core::fmt;

#[cfg(feature = "alloc")]
use alloc::string::String;

/// Errors that can occur during LIN master operations.
#[derive(Debug)]
pub enum Error {
    /// The frame identifier does not fit in 6 bits (0-63).
    InvalidFrameId(u8),

    /// More data bytes were supplied than a LIN frame can carry.
    PayloadTooLong {
        /// Number of bytes supplied
        actual: usize,
        /// Maximum number of data bytes per frame
        max: usize,
    },

    /// The configured baud rate is outside the LIN range.
    InvalidBaudRate(u32),

    /// The session configuration could not be serialized or parsed.
    #[cfg(feature = "alloc")]
    ConfigError(String),

    /// An I/O error occurred on the serial transport.
    ///
    /// Only available with the `std` feature.
    #[cfg(feature = "std")]
    IOError(std::io::Error),

    /// The transport failed (no_std version).
    ///
    /// Only available without the `std` feature.
    #[cfg(not(feature = "std"))]
    TransportError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidFrameId(id) => {
                write!(f, "Invalid LIN frame identifier {id:#04x}: expected 0x00..=0x3F")
            }
            Error::PayloadTooLong { actual, max } => {
                write!(f, "LIN payload too long: {actual} bytes, at most {max} allowed")
            }
            Error::InvalidBaudRate(baud) => {
                write!(f, "Invalid LIN baud rate {baud}: expected 1000..=20000 bit/s")
            }
            #[cfg(feature = "alloc")]
            Error::ConfigError(s) => write!(f, "Configuration error: {s}"),
            #[cfg(feature = "std")]
            Error::IOError(e) => write!(f, "I/O error: {e}"),
            #[cfg(not(feature = "std"))]
            Error::TransportError => write!(f, "Transport error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IOError(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IOError(err)
    }
}

#[cfg(feature = "serialport")]
impl From<serialport::Error> for Error {
    fn from(err: serialport::Error) -> Self {
        Error::IOError(err.into())
    }
}

/// A specialized Result type for LIN master operations.
///
/// This is defined as `core::result::Result<T, Error>` for convenience.
pub type Result<T> = core::result::Result<T, Error>;

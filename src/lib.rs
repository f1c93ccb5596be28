#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![forbid(unsafe_code)]

//! # lin-master
//!
//! A Rust library implementing the master side of the LIN (Local
//! Interconnect Network) bus over any half-duplex serial port.
//!
//! LIN is a low-cost, single-wire serial network used in automotive
//! applications for communication between sensors, actuators, and ECUs.
//! One master starts every frame with a header; the addressed slave (or the
//! master itself) fills in the response.
//!
//! ## Features
//!
//! - **Framing**: break generation at half baud rate, sync byte, protected
//!   identifiers with parity bits
//! - **Checksums**: classic (LIN 1.x) and enhanced (LIN 2.x) with automatic
//!   fallback to classic for diagnostic IDs 0x3C-0x3F
//! - **Receiving**: a resynchronizing state machine bounded by a timeout and
//!   an inter-byte gap, with drain-to-idle of excess bytes
//! - **Sending**: frames with self-echo verification
//! - **Simulation**: an in-memory bus with scripted slaves for testing
//!   without hardware
//!
//! ## Quick Start
//!
//! ```no_run
//! # #[cfg(feature = "serialport")]
//! # fn main() -> lin_master::Result<()> {
//! use lin_master::{LinConfig, LinMaster, SerialTransport};
//!
//! let config = LinConfig::default();
//! let port = SerialTransport::open("/dev/ttyUSB0", config.baud_rate)?;
//! let mut master = LinMaster::new(port, config)?;
//!
//! let frame = master.request_frame(0x22)?;
//! if frame.checksum_valid() {
//!     println!("0x22: {:02X?}", frame.data());
//! }
//!
//! master.send_frame(0x10, &[0x01, 0x02, 0x03])?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "serialport"))]
//! # fn main() {}
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`frame`] | PID, checksum and frame types |
//! | [`parser`] | Receive state machine |
//! | [`master`] | The [`LinMaster`] session |
//! | [`transport`] | The [`Transport`] trait and serial port binding |
//! | [`config`] | Session configuration |
//! | [`error`] | Error types and [`Result`] alias |
//!
//! ## Error Handling
//!
//! Bus conditions (no response, bad checksum, noise, overflow) are reported
//! through [`LinFlags`] on the returned [`LinFrame`]. [`Result<T>`] errors
//! are reserved for invalid arguments and transport failures.

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod config;
pub mod error;
pub mod frame;
pub mod master;
pub mod parser;
pub mod transport;

#[cfg(feature = "alloc")]
pub mod sim;

// Re-export commonly used types at the crate root
pub use config::LinConfig;
pub use error::{Error, Result};
pub use frame::{
    ChecksumType, LinFlags, LinFrame, MAX_LIN_DATA_LEN, MAX_LIN_ID, checksum, classic_checksum,
    enhanced_checksum, is_valid_protected_id, protected_id, verify,
};
pub use master::{EchoStatus, LinMaster};
pub use parser::{ParserState, ReceiveParser, receive};
#[cfg(feature = "alloc")]
pub use sim::{BusEvent, SimulatedBus};
#[cfg(feature = "serialport")]
pub use transport::SerialTransport;
pub use transport::Transport;

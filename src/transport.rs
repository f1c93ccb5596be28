//! Abstract serial transport used by the LIN master.
//!
//! This module provides the [`Transport`] trait, which abstracts away the
//! UART the master drives. The master only ever talks to the bus through
//! these operations, so the same protocol code runs against a hardware
//! port, a no_std HAL binding or the in-memory
//! [`SimulatedBus`](crate::SimulatedBus).

use core::time::Duration;

use crate::Result;

/// Byte-level operations the LIN master needs from a serial port.
///
/// Implementations are expected to be half-duplex and self-wired: every
/// byte written also shows up on the receive side.
pub trait Transport {
    /// Queue one byte for transmission.
    fn write_byte(&mut self, byte: u8) -> Result<()>;

    /// Queue several bytes for transmission.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    /// Read one received byte, or `None` if nothing is pending.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Whether at least one received byte is pending.
    fn bytes_available(&mut self) -> Result<bool>;

    /// Change the line rate. Takes effect for the next transmitted byte.
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()>;

    /// Block until all queued output has left the transmitter.
    fn flush(&mut self) -> Result<()>;

    /// Monotonic time since an arbitrary, fixed origin.
    fn now(&self) -> Duration;

    /// Block the caller for `duration`.
    fn sleep(&mut self, duration: Duration);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        (**self).write_byte(byte)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(bytes)
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn bytes_available(&mut self) -> Result<bool> {
        (**self).bytes_available()
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        (**self).set_baud_rate(baud_rate)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[cfg(feature = "serialport")]
mod serial_impl {
    use super::Transport;
    use crate::Result;
    use core::time::Duration;
    use serialport::{ClearBuffer, SerialPort};
    use std::io::{Read, Write};
    use std::time::Instant;

    /// A [`Transport`] backed by an operating system serial port.
    ///
    /// The port must be wired to a LIN transceiver whose receive line
    /// echoes the transmit line.
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
        epoch: Instant,
    }

    impl SerialTransport {
        /// Open `port_name` at `baud_rate`, 8N1.
        pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
            let port = serialport::new(port_name, baud_rate)
                .data_bits(serialport::DataBits::Eight)
                .parity(serialport::Parity::None)
                .stop_bits(serialport::StopBits::One)
                .timeout(Duration::from_millis(10))
                .open()?;
            log::info!("Opened {port_name} at {baud_rate} baud");
            Ok(Self::from_port(port))
        }

        /// Wrap an already configured port.
        pub fn from_port(port: Box<dyn SerialPort>) -> Self {
            Self {
                port,
                epoch: Instant::now(),
            }
        }

        /// Discard anything waiting in the receive buffer.
        pub fn clear_input(&mut self) -> Result<()> {
            self.port.clear(ClearBuffer::Input)?;
            Ok(())
        }

        /// Consume the transport and return the underlying port.
        pub fn into_inner(self) -> Box<dyn SerialPort> {
            self.port
        }
    }

    impl Transport for SerialTransport {
        fn write_byte(&mut self, byte: u8) -> Result<()> {
            self.port.write_all(&[byte])?;
            Ok(())
        }

        fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
            self.port.write_all(bytes)?;
            Ok(())
        }

        fn read_byte(&mut self) -> Result<Option<u8>> {
            if self.port.bytes_to_read()? == 0 {
                return Ok(None);
            }
            let mut byte = [0u8; 1];
            match self.port.read(&mut byte)? {
                0 => Ok(None),
                _ => Ok(Some(byte[0])),
            }
        }

        fn bytes_available(&mut self) -> Result<bool> {
            Ok(self.port.bytes_to_read()? > 0)
        }

        fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
            self.port.set_baud_rate(baud_rate)?;
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            // tcdrain on unix: returns once the shift register is empty
            self.port.flush()?;
            Ok(())
        }

        fn now(&self) -> Duration {
            self.epoch.elapsed()
        }

        fn sleep(&mut self, duration: Duration) {
            std::thread::sleep(duration);
        }
    }
}

#[cfg(feature = "serialport")]
pub use serial_impl::SerialTransport;

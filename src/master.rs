//! LIN master session.
//!
//! [`LinMaster`] owns a [`Transport`] and runs one transaction at a time:
//!
//! ```text
//! Idle -> Breaking -> SyncAndId -> Reading | Writing -> Idle
//! ```
//!
//! Every transaction method takes `&mut self`, so the transport is held for
//! the whole break/sync/PID/data sequence with nothing interleaved.
//!
//! # Example
//!
//! ```
//! # #[cfg(feature = "alloc")]
//! # fn main() -> lin_master::Result<()> {
//! use lin_master::{EchoStatus, LinConfig, LinMaster, SimulatedBus};
//!
//! let mut bus = SimulatedBus::new(19_200);
//! bus.add_slave_response(0x22, &[0x01, 0x02, 0x03]);
//!
//! let mut master = LinMaster::new(bus, LinConfig::default())?;
//!
//! let frame = master.request_frame(0x22)?;
//! assert!(frame.checksum_valid());
//! assert_eq!(frame.data(), &[0x01, 0x02, 0x03]);
//!
//! let echo = master.send_frame(0x10, &[0xAA, 0x55])?;
//! assert_eq!(echo, EchoStatus::Matched);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "alloc"))]
//! # fn main() {}
//! ```

use crate::config::LinConfig;
use crate::frame::{
    BREAK_BYTE, ChecksumType, LinFrame, MAX_LIN_DATA_LEN, MAX_LIN_ID, SYNC_BYTE, checksum,
    protected_id,
};
use crate::parser::receive;
use crate::transport::Transport;
use crate::{Error, Result};

/// Outcome of comparing a sent frame with its echo on the receive line.
///
/// Purely diagnostic: a send never fails because of its echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoStatus {
    /// The echoed frame carries the checksum that was sent.
    Matched,
    /// The frame did not come back (no transceiver loopback, or lost).
    Missing,
    /// The echoed frame disagrees with what was sent.
    Mismatch {
        /// Checksum the master transmitted.
        sent: u8,
        /// Checksum byte read back.
        echoed: u8,
        /// Checksum recomputed from the echoed PID and data.
        recomputed: u8,
    },
}

impl EchoStatus {
    /// Whether the echo confirmed the transmission.
    pub fn is_matched(self) -> bool {
        self == EchoStatus::Matched
    }
}

/// A LIN master node driving one bus through a [`Transport`].
pub struct LinMaster<T: Transport> {
    transport: T,
    config: LinConfig,
}

impl<T: Transport> LinMaster<T> {
    /// Create a master after validating `config`.
    ///
    /// The transport is expected to already run at `config.baud_rate`.
    pub fn new(transport: T, config: LinConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { transport, config })
    }

    /// The session configuration.
    pub fn config(&self) -> &LinConfig {
        &self.config
    }

    /// Get a reference to the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the transport.
    ///
    /// Only use this between transactions.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the master and return the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Request a frame from a slave.
    ///
    /// Sends break, sync and PID, then receives the slave's response. A
    /// missing response or a bad checksum is reported through the returned
    /// frame's flags, never as an error.
    pub fn request_frame(&mut self, frame_id: u8) -> Result<LinFrame> {
        let pid = checked_protected_id(frame_id)?;
        log::trace!("Request {frame_id:#04x} ({pid:#04x})");

        self.write_header(pid)?;
        self.transport.flush()?;

        log::trace!("Reading response for {frame_id:#04x}");
        let frame = receive(
            &mut self.transport,
            self.config.timeout,
            self.config.frame_gap(),
        )?;
        if !frame.is_empty() && !frame.checksum_valid() {
            log::warn!("Checksum failed for frame {frame_id:#04x}");
        }
        Ok(frame)
    }

    /// Listen for the next frame on the bus without sending a header.
    pub fn listen(&mut self) -> Result<LinFrame> {
        self.transport.flush()?;
        receive(
            &mut self.transport,
            self.config.timeout,
            self.config.frame_gap(),
        )
    }

    /// Send a frame with the checksum LIN 2.x selects for `frame_id`:
    /// enhanced below 0x3C, classic from 0x3C up.
    pub fn send_frame(&mut self, frame_id: u8, data: &[u8]) -> Result<EchoStatus> {
        self.send(frame_id, data, ChecksumType::for_frame_id(frame_id))
    }

    /// Send a frame with a classic (LIN 1.x) checksum regardless of its ID.
    pub fn send_frame_classic(&mut self, frame_id: u8, data: &[u8]) -> Result<EchoStatus> {
        self.send(frame_id, data, ChecksumType::Classic)
    }

    /// Generate a LIN break.
    ///
    /// The zero byte is sent at half the nominal rate, which stretches its
    /// low period past the 13 bit times a break requires. Output is flushed
    /// before and after so no other byte is sent at the wrong rate. The
    /// nominal rate is restored even if sending the break fails.
    pub fn write_break(&mut self) -> Result<()> {
        self.transport.flush()?;
        self.transport.set_baud_rate(self.config.break_baud_rate())?;
        let sent = self
            .transport
            .write_byte(BREAK_BYTE)
            .and_then(|()| self.transport.flush());
        self.transport.set_baud_rate(self.config.baud_rate)?;
        sent
    }

    fn write_header(&mut self, pid: u8) -> Result<()> {
        log::trace!("Breaking");
        self.write_break()?;
        log::trace!("Sync and PID {pid:#04x}");
        self.transport.write_bytes(&[SYNC_BYTE, pid])
    }

    fn send(&mut self, frame_id: u8, data: &[u8], kind: ChecksumType) -> Result<EchoStatus> {
        let pid = checked_protected_id(frame_id)?;
        if data.len() > MAX_LIN_DATA_LEN {
            return Err(Error::PayloadTooLong {
                actual: data.len(),
                max: MAX_LIN_DATA_LEN,
            });
        }
        let frame = LinFrame::with_checksum(frame_id, data, kind);

        log::trace!("Breaking");
        self.write_break()?;
        log::trace!("Writing frame {pid:#04x} with {} data bytes", frame.len());
        let (bytes, len) = frame.to_wire_bytes();
        self.transport.write_bytes(&bytes[..len])?;
        self.transport.flush()?;

        self.check_echo(&frame, kind)
    }

    fn check_echo(&mut self, frame: &LinFrame, kind: ChecksumType) -> Result<EchoStatus> {
        let (frame_id, pid, sent) = (frame.id, frame.pid, frame.checksum);
        let echo = receive(
            &mut self.transport,
            self.config.echo_timeout,
            self.config.frame_gap(),
        )?;

        if echo.flags.has_no_response() || echo.flags.has_sync_error() {
            log::warn!("No echo for frame {frame_id:#04x} ({pid:#04x})");
            return Ok(EchoStatus::Missing);
        }

        let recomputed = checksum(kind.seed(echo.pid), echo.data());
        if echo.pid == pid
            && echo.data() == frame.data()
            && echo.checksum == sent
            && recomputed == sent
        {
            return Ok(EchoStatus::Matched);
        }

        log::warn!(
            "Echo mismatch for frame {frame_id:#04x}: {:02X}|{:02X}|{:02X?}|{:02X} != checksum calc {recomputed:02X}, TX {sent:02X}",
            SYNC_BYTE,
            echo.pid,
            echo.data(),
            echo.checksum
        );
        Ok(EchoStatus::Mismatch {
            sent,
            echoed: echo.checksum,
            recomputed,
        })
    }
}

fn checked_protected_id(frame_id: u8) -> Result<u8> {
    if frame_id > MAX_LIN_ID {
        return Err(Error::InvalidFrameId(frame_id));
    }
    Ok(protected_id(frame_id))
}

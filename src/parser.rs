//! Byte-driven receive state machine.
//!
//! [`ReceiveParser`] consumes bytes one at a time and assembles a frame:
//!
//! ```text
//! SeekBreak -> SeekSync -> SeekIdentifier -> CollectingData(n) -> Complete
//!     \___________\______________________________________________ TimedOut
//! ```
//!
//! The parser itself knows nothing about time. [`receive`] drives it from a
//! [`Transport`], ending data collection after an inter-byte gap and header
//! search after the overall timeout, then drains whatever is left on the
//! line.

use core::time::Duration;

use crate::Result;
use crate::frame::{
    BREAK_BYTE, ChecksumType, LinFlags, LinFrame, MAX_LIN_DATA_LEN, MAX_LIN_FRAME_LEN, SYNC_BYTE,
    frame_id_of, is_valid_protected_id, verify,
};
use crate::transport::Transport;

/// Sleep between polls while waiting for a header byte.
pub const POLL_INTERVAL: Duration = Duration::from_micros(500);

/// Receive state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Waiting for the break byte (0x00).
    SeekBreak,
    /// Break seen, waiting for the sync byte (0x55).
    SeekSync,
    /// Sync seen, the next byte is the protected identifier.
    SeekIdentifier,
    /// Collecting data and checksum; holds the number of bytes collected.
    CollectingData(u8),
    /// A frame has been assembled.
    Complete,
    /// No header was found before the timeout.
    TimedOut,
}

/// Assembles one frame from a byte stream.
///
/// A parser is created per transaction and consumed by [`finish`](Self::finish).
#[derive(Debug, Clone)]
pub struct ReceiveParser {
    state: ParserState,
    pid: Option<u8>,
    buffer: [u8; MAX_LIN_FRAME_LEN],
    collected: u8,
    bytes_seen: usize,
    discarded: usize,
    overflow: usize,
}

impl ReceiveParser {
    /// Create a parser in [`ParserState::SeekBreak`].
    pub fn new() -> Self {
        Self {
            state: ParserState::SeekBreak,
            pid: None,
            buffer: [0u8; MAX_LIN_FRAME_LEN],
            collected: 0,
            bytes_seen: 0,
            discarded: 0,
            overflow: 0,
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Whether the parser reached [`ParserState::Complete`] or
    /// [`ParserState::TimedOut`].
    #[inline]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, ParserState::Complete | ParserState::TimedOut)
    }

    /// Whether the header has been seen and data is being collected.
    #[inline]
    pub fn is_collecting(&self) -> bool {
        matches!(self.state, ParserState::CollectingData(_))
    }

    /// Captured protected identifier, if the header got that far.
    #[inline]
    pub fn protected_id(&self) -> Option<u8> {
        self.pid
    }

    /// Bytes thrown away while searching for a header.
    #[inline]
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Bytes thrown away after the frame was complete.
    #[inline]
    pub fn overflow(&self) -> usize {
        self.overflow
    }

    /// Feed one byte and return the new state.
    pub fn push(&mut self, byte: u8) -> ParserState {
        self.bytes_seen += 1;
        self.state = match self.state {
            ParserState::SeekBreak => {
                if byte == BREAK_BYTE {
                    ParserState::SeekSync
                } else {
                    self.discard(byte);
                    ParserState::SeekBreak
                }
            }
            ParserState::SeekSync => match byte {
                SYNC_BYTE => ParserState::SeekIdentifier,
                // Another break attempt
                BREAK_BYTE => ParserState::SeekSync,
                _ => {
                    self.discard(byte);
                    ParserState::SeekBreak
                }
            },
            ParserState::SeekIdentifier => {
                self.pid = Some(byte);
                ParserState::CollectingData(0)
            }
            ParserState::CollectingData(n) => {
                self.buffer[n as usize] = byte;
                self.collected = n + 1;
                if self.collected as usize >= MAX_LIN_FRAME_LEN {
                    ParserState::Complete
                } else {
                    ParserState::CollectingData(self.collected)
                }
            }
            ParserState::Complete => {
                self.overflow += 1;
                ParserState::Complete
            }
            ParserState::TimedOut => {
                self.discarded += 1;
                ParserState::TimedOut
            }
        };
        self.state
    }

    /// The line went idle for an inter-byte gap.
    ///
    /// Ends data collection; has no effect while searching for a header.
    pub fn end_of_frame(&mut self) {
        if self.is_collecting() {
            self.state = ParserState::Complete;
        }
    }

    /// The overall timeout elapsed.
    ///
    /// A frame already being collected is kept; a header search is abandoned.
    pub fn expire(&mut self) {
        match self.state {
            ParserState::CollectingData(_) => self.state = ParserState::Complete,
            ParserState::Complete | ParserState::TimedOut => {}
            _ => self.state = ParserState::TimedOut,
        }
    }

    /// Consume the parser and build the received frame.
    ///
    /// The checksum is verified against the captured PID; the reported
    /// identifier is masked to 6 bits.
    pub fn finish(self) -> LinFrame {
        let pid = self.pid.unwrap_or(0);
        match self.state {
            ParserState::Complete if self.collected > 0 => self.assemble(pid),
            ParserState::Complete => LinFrame::empty(pid, self.status_flags(pid)),
            _ => {
                let cause = if self.bytes_seen == 0 {
                    LinFlags::NO_RESPONSE
                } else {
                    LinFlags::SYNC_ERROR
                };
                LinFrame::empty(pid, LinFlags::default().with(cause, true))
            }
        }
    }

    fn assemble(&self, pid: u8) -> LinFrame {
        let data_len = (self.collected - 1) as usize;
        let mut data = [0u8; MAX_LIN_DATA_LEN];
        data[..data_len].copy_from_slice(&self.buffer[..data_len]);
        let checksum = self.buffer[data_len];
        let valid = verify(pid, &data[..data_len], checksum);

        let flags = self
            .status_flags(pid)
            .with(LinFlags::NO_RESPONSE, false)
            .with(LinFlags::CHECKSUM_ERROR, !valid)
            .with_enhanced_checksum(ChecksumType::for_frame_id(pid) == ChecksumType::Enhanced);

        LinFrame {
            id: frame_id_of(pid),
            pid,
            data,
            data_len: data_len as u8,
            flags,
            checksum,
        }
    }

    fn status_flags(&self, pid: u8) -> LinFlags {
        LinFlags::default()
            .with(LinFlags::NO_RESPONSE, true)
            .with(LinFlags::PARITY_ERROR, !is_valid_protected_id(pid))
            .with(LinFlags::OVERFLOW, self.overflow > 0)
    }

    fn discard(&mut self, byte: u8) {
        self.discarded += 1;
        log::trace!("Discarding {byte:#04x} while seeking header");
    }
}

impl Default for ReceiveParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive one frame from `transport`.
///
/// Waits up to `timeout` for a break/sync/PID header, then collects data
/// until nine bytes arrived or the line stays idle for `gap`. Bytes that
/// keep coming after a full frame are read and dropped until the line is
/// idle, so they cannot leak into the next transaction.
///
/// Bus conditions never produce an `Err`; they are reported in the frame's
/// [`LinFlags`]. Only transport failures are propagated.
pub fn receive<T: Transport + ?Sized>(
    transport: &mut T,
    timeout: Duration,
    gap: Duration,
) -> Result<LinFrame> {
    let mut parser = ReceiveParser::new();
    let deadline = transport.now() + timeout;

    while !parser.is_finished() {
        if !parser.is_collecting() && transport.now() >= deadline {
            parser.expire();
            break;
        }
        match transport.read_byte()? {
            Some(byte) => {
                parser.push(byte);
            }
            None if parser.is_collecting() => {
                transport.sleep(gap);
                if !transport.bytes_available()? {
                    parser.end_of_frame();
                }
            }
            None => transport.sleep(POLL_INTERVAL),
        }
    }

    drain_to_idle(transport, &mut parser, gap, deadline)?;

    if parser.discarded() > 0 {
        log::trace!("Discarded {} bytes during resync", parser.discarded());
    }
    if parser.overflow() > 0 {
        log::warn!("Discarded {} bytes after a complete frame", parser.overflow());
    }

    let timed_out = parser.state() == ParserState::TimedOut;
    let frame = parser.finish();
    if timed_out {
        if frame.flags.has_sync_error() {
            log::debug!("No valid 0x00 0x55 PID header detected");
        } else {
            log::debug!("Receive timed out after {timeout:?}");
        }
    } else if frame.flags.has_no_response() {
        log::debug!("No response for {:#04x} ({:#04x})", frame.id, frame.pid);
    } else {
        log::debug!(
            "00 55 {:02X} ({:02X}) {:02X?} |{:02X}",
            frame.id,
            frame.pid,
            frame.data(),
            frame.checksum
        );
        if !frame.checksum_valid() {
            log::debug!("Checksum failed for frame {:#04x}", frame.id);
        }
    }
    Ok(frame)
}

fn drain_to_idle<T: Transport + ?Sized>(
    transport: &mut T,
    parser: &mut ReceiveParser,
    gap: Duration,
    deadline: Duration,
) -> Result<()> {
    loop {
        while let Some(byte) = transport.read_byte()? {
            parser.push(byte);
        }
        if transport.now() >= deadline {
            return Ok(());
        }
        transport.sleep(gap);
        if !transport.bytes_available()? {
            return Ok(());
        }
    }
}

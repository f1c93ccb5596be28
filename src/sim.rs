//! In-memory LIN bus for running the master without hardware.
//!
//! [`SimulatedBus`] implements [`Transport`] on a virtual clock. Written
//! bytes take ten bit times at the current rate and, like on a real
//! single-wire bus, come back on the receive side. Scripted slaves answer
//! headers addressed to them, and arbitrary noise can be injected.
//!
//! ```
//! use lin_master::{LinConfig, LinMaster, SimulatedBus};
//!
//! let mut bus = SimulatedBus::new(19_200);
//! bus.add_slave_response(0x22, &[0xAB, 0x84, 0x1E, 0xF4, 0x2E, 0x84, 0x7A, 0x55]);
//! bus.inject(&[0x12, 0x34]);
//!
//! let mut master = LinMaster::new(bus, LinConfig::default()).unwrap();
//! let frame = master.request_frame(0x22).unwrap();
//! assert!(frame.checksum_valid());
//! assert_eq!(frame.len(), 8);
//! ```

use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;
use core::time::Duration;

use crate::Result;
use crate::frame::{BREAK_BYTE, ChecksumType, SYNC_BYTE, checksum, frame_id_of, protected_id};
use crate::transport::Transport;

/// Operations the master performed on a [`SimulatedBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    /// A byte was transmitted at the given rate.
    Write {
        /// Transmitted byte
        byte: u8,
        /// Rate in effect for this byte
        baud_rate: u32,
    },
    /// The line rate was changed.
    SetBaudRate(u32),
    /// Output was flushed.
    Flush,
}

/// Where a slave watching the bus is in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderWatch {
    Idle,
    Break,
    Sync,
}

/// A simulated half-duplex LIN bus with a virtual clock.
pub struct SimulatedBus {
    nominal_baud: u32,
    baud_rate: u32,
    now: Duration,
    tx_busy_until: Duration,
    rx: VecDeque<(Duration, u8)>,
    echo: bool,
    echo_fault: Option<(usize, u8)>,
    echoed_since_break: usize,
    response_delay: Duration,
    slaves: BTreeMap<u8, Vec<u8>>,
    watch: HeaderWatch,
    events: Vec<BusEvent>,
}

impl SimulatedBus {
    /// Create a bus running at `baud_rate` with loopback echo enabled.
    pub fn new(baud_rate: u32) -> Self {
        Self {
            nominal_baud: baud_rate,
            baud_rate,
            now: Duration::ZERO,
            tx_busy_until: Duration::ZERO,
            rx: VecDeque::new(),
            echo: true,
            echo_fault: None,
            echoed_since_break: 0,
            response_delay: Duration::ZERO,
            slaves: BTreeMap::new(),
            watch: HeaderWatch::Idle,
            events: Vec::new(),
        }
    }

    /// Enable or disable the transceiver loopback.
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    /// Flip bits of an echoed byte: `index` counts from the break (0).
    pub fn set_echo_fault(&mut self, index: usize, xor_mask: u8) {
        self.echo_fault = Some((index, xor_mask));
    }

    /// Remove an echo fault set with [`set_echo_fault`](Self::set_echo_fault).
    pub fn clear_echo_fault(&mut self) {
        self.echo_fault = None;
    }

    /// Extra delay between the end of a header and a slave's response.
    pub fn set_response_delay(&mut self, delay: Duration) {
        self.response_delay = delay;
    }

    /// Register a slave publishing `data` under `frame_id`.
    ///
    /// The checksum is appended the way LIN 2.x selects it for the ID.
    pub fn add_slave_response(&mut self, frame_id: u8, data: &[u8]) {
        let seed = ChecksumType::for_frame_id(frame_id).seed(protected_id(frame_id));
        let mut bytes = data.to_vec();
        bytes.push(checksum(seed, data));
        self.slaves.insert(frame_id_of(frame_id), bytes);
    }

    /// Register a slave answering `frame_id` with exactly `bytes`.
    pub fn add_raw_response(&mut self, frame_id: u8, bytes: &[u8]) {
        self.slaves.insert(frame_id_of(frame_id), bytes.to_vec());
    }

    /// Remove the slave answering `frame_id`.
    pub fn remove_slave(&mut self, frame_id: u8) {
        self.slaves.remove(&frame_id_of(frame_id));
    }

    /// Put bytes on the receive line now.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.inject_after(Duration::ZERO, bytes);
    }

    /// Put bytes on the receive line after `delay`, one byte time apart.
    pub fn inject_after(&mut self, delay: Duration, bytes: &[u8]) {
        let byte_time = self.byte_time(self.nominal_baud);
        let mut at = self.now + delay;
        for &byte in bytes {
            self.schedule(at, byte);
            at += byte_time;
        }
    }

    /// Operations performed so far.
    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    /// Forget recorded operations.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// All bytes written so far, in order.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BusEvent::Write { byte, .. } => Some(*byte),
                _ => None,
            })
            .collect()
    }

    /// Number of received bytes not yet read, including future ones.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Current rate of the line.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn byte_time(&self, baud_rate: u32) -> Duration {
        // start + 8 data + stop
        Duration::from_nanos(10 * 1_000_000_000 / u64::from(baud_rate.max(1)))
    }

    fn schedule(&mut self, at: Duration, byte: u8) {
        let pos = self.rx.iter().position(|&(t, _)| t > at).unwrap_or(self.rx.len());
        self.rx.insert(pos, (at, byte));
    }

    fn watch_header(&mut self, byte: u8, is_break: bool, end: Duration) {
        self.watch = match (self.watch, byte) {
            _ if is_break => HeaderWatch::Break,
            (HeaderWatch::Break, SYNC_BYTE) => HeaderWatch::Sync,
            (HeaderWatch::Sync, pid) => {
                if let Some(response) = self.slaves.get(&frame_id_of(pid)).cloned() {
                    self.inject_after(end - self.now + self.response_delay, &response);
                }
                HeaderWatch::Idle
            }
            _ => HeaderWatch::Idle,
        };
    }
}

impl Transport for SimulatedBus {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.events.push(BusEvent::Write {
            byte,
            baud_rate: self.baud_rate,
        });
        let start = self.tx_busy_until.max(self.now);
        let end = start + self.byte_time(self.baud_rate);
        self.tx_busy_until = end;

        let is_break = byte == BREAK_BYTE && self.baud_rate < self.nominal_baud;
        if is_break {
            self.echoed_since_break = 0;
        }
        if self.echo {
            let echoed = match self.echo_fault {
                Some((index, mask)) if index == self.echoed_since_break => byte ^ mask,
                _ => byte,
            };
            self.echoed_since_break += 1;
            self.schedule(end, echoed);
        }

        // Slaves answer after the echo of their PID
        self.watch_header(byte, is_break, end);
        Ok(())
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        match self.rx.front() {
            Some(&(at, byte)) if at <= self.now => {
                self.rx.pop_front();
                Ok(Some(byte))
            }
            _ => Ok(None),
        }
    }

    fn bytes_available(&mut self) -> Result<bool> {
        Ok(matches!(self.rx.front(), Some(&(at, _)) if at <= self.now))
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        self.events.push(BusEvent::SetBaudRate(baud_rate));
        self.baud_rate = baud_rate;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.events.push(BusEvent::Flush);
        self.now = self.now.max(self.tx_busy_until);
        Ok(())
    }

    fn now(&self) -> Duration {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.now += duration;
    }
}

//! LIN frame codec: protected identifiers, checksums and the frame value.
//!
//! Everything in this module is pure. The master uses it to build outgoing
//! headers and checksums, and the receive parser uses it to validate what
//! came back from the bus.
//!
//! # Wire format
//!
//! ```text
//! Break | Sync (0x55) | PID | Data (0-8 bytes) | Checksum
//! ```
//!
//! The PID carries the 6-bit frame identifier in bits 0-5 and two parity
//! bits in bits 6 and 7.

/// Maximum LIN frame data size (8 bytes).
pub const MAX_LIN_DATA_LEN: usize = 8;

/// Maximum number of significant bytes after the PID: 8 data + 1 checksum.
pub const MAX_LIN_FRAME_LEN: usize = MAX_LIN_DATA_LEN + 1;

/// LIN frame ID range (0-63, 6 bits).
pub const MAX_LIN_ID: u8 = 63;

/// Byte sent at half baud rate to produce the break.
pub const BREAK_BYTE: u8 = 0x00;

/// Sync field following the break.
pub const SYNC_BYTE: u8 = 0x55;

/// First frame ID that always uses the classic checksum
/// (0x3C master request, 0x3D slave response, 0x3E/0x3F reserved).
pub const FIRST_CLASSIC_ID: u8 = 0x3C;

/// Compute the protected identifier for a frame ID.
///
/// Bits above the 6-bit identifier are ignored.
///
/// ```
/// use lin_master::protected_id;
///
/// assert_eq!(protected_id(0x22), 0xE2);
/// assert_eq!(protected_id(0x3C), 0x3C);
/// ```
pub const fn protected_id(frame_id: u8) -> u8 {
    let id = frame_id & MAX_LIN_ID;
    let p0 = (id ^ (id >> 1) ^ (id >> 2) ^ (id >> 4)) & 0x01;
    let p1 = !((id >> 1) ^ (id >> 3) ^ (id >> 4) ^ (id >> 5)) & 0x01;
    (p1 << 7) | (p0 << 6) | id
}

/// Extract the frame ID from a protected identifier.
#[inline]
pub const fn frame_id_of(pid: u8) -> u8 {
    pid & MAX_LIN_ID
}

/// Check that both parity bits of a received PID are consistent.
pub const fn is_valid_protected_id(pid: u8) -> bool {
    protected_id(frame_id_of(pid)) == pid
}

/// Compute a LIN checksum over `data`, seeded with `seed`.
///
/// Pass the protected ID as seed for an enhanced checksum, or 0 for a
/// classic one. Seeds whose identifier bits select a diagnostic or reserved
/// frame (0x3C and above) are forced to 0.
///
/// The sum is carried in 16 bits; carries are folded back into the low byte
/// and the result is inverted.
pub fn checksum(seed: u8, data: &[u8]) -> u8 {
    let mut sum: u16 = if frame_id_of(seed) >= FIRST_CLASSIC_ID {
        0
    } else {
        seed as u16
    };
    for &byte in data {
        sum += byte as u16;
    }
    while sum >> 8 != 0 {
        sum = (sum & 0xFF) + (sum >> 8);
    }
    !(sum as u8)
}

/// Verify a received checksum byte against `data`.
///
/// `seed` follows the same rules as [`checksum`].
pub fn verify(seed: u8, data: &[u8], checksum_byte: u8) -> bool {
    checksum_byte.wrapping_add(0xFF - checksum(seed, data)) == 0xFF
}

/// Classic checksum (LIN 1.x) - sum of data bytes only.
#[inline]
pub fn classic_checksum(data: &[u8]) -> u8 {
    checksum(0, data)
}

/// Enhanced checksum (LIN 2.x) for `frame_id`.
///
/// Falls back to the classic checksum for IDs 0x3C and above.
#[inline]
pub fn enhanced_checksum(frame_id: u8, data: &[u8]) -> u8 {
    checksum(protected_id(frame_id), data)
}

/// LIN checksum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ChecksumType {
    /// Classic checksum (LIN 1.x) - sum of data bytes only.
    #[default]
    Classic = 0,
    /// Enhanced checksum (LIN 2.x) - sum of PID and data bytes.
    Enhanced = 1,
}

impl ChecksumType {
    /// The checksum type LIN 2.x mandates for a frame ID.
    pub fn for_frame_id(frame_id: u8) -> Self {
        if frame_id_of(frame_id) >= FIRST_CLASSIC_ID {
            Self::Classic
        } else {
            Self::Enhanced
        }
    }

    /// Seed to pass to [`checksum`] for a frame with the given PID.
    #[inline]
    pub fn seed(self, pid: u8) -> u8 {
        match self {
            Self::Classic => 0,
            Self::Enhanced => pid,
        }
    }
}

/// Status flags attached to a [`LinFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinFlags(u8);

impl LinFlags {
    /// Bit 1: Checksum missing or invalid.
    pub const CHECKSUM_ERROR: u8 = 0x02;
    /// Bit 2: No response (nothing arrived, or only the header).
    pub const NO_RESPONSE: u8 = 0x04;
    /// Bit 3: Bytes arrived but no break/sync/PID header was found.
    pub const SYNC_ERROR: u8 = 0x08;
    /// Bit 4: Bytes beyond the checksum were discarded.
    pub const OVERFLOW: u8 = 0x10;
    /// Bit 5: PID parity bits do not match the identifier.
    pub const PARITY_ERROR: u8 = 0x20;
    /// Bit 7: Enhanced checksum used (LIN 2.x).
    pub const ENHANCED_CHECKSUM: u8 = 0x80;

    /// Check if the checksum is missing or invalid.
    pub fn has_checksum_error(self) -> bool {
        self.0 & Self::CHECKSUM_ERROR != 0
    }

    /// Check if the slave didn't respond.
    pub fn has_no_response(self) -> bool {
        self.0 & Self::NO_RESPONSE != 0
    }

    /// Check if no header could be synchronized.
    pub fn has_sync_error(self) -> bool {
        self.0 & Self::SYNC_ERROR != 0
    }

    /// Check if excess bytes were discarded.
    pub fn has_overflow(self) -> bool {
        self.0 & Self::OVERFLOW != 0
    }

    /// Check if the PID parity was wrong.
    pub fn has_parity_error(self) -> bool {
        self.0 & Self::PARITY_ERROR != 0
    }

    /// Check if enhanced (LIN 2.x) checksum is used.
    pub fn uses_enhanced_checksum(self) -> bool {
        self.0 & Self::ENHANCED_CHECKSUM != 0
    }

    /// Check if any error occurred.
    pub fn has_error(self) -> bool {
        self.0
            & (Self::CHECKSUM_ERROR
                | Self::NO_RESPONSE
                | Self::SYNC_ERROR
                | Self::OVERFLOW
                | Self::PARITY_ERROR)
            != 0
    }

    /// Set or clear the given flag bits.
    pub fn with(self, bits: u8, set: bool) -> Self {
        if set {
            Self(self.0 | bits)
        } else {
            Self(self.0 & !bits)
        }
    }

    /// Set the enhanced checksum flag.
    pub fn with_enhanced_checksum(self, enhanced: bool) -> Self {
        self.with(Self::ENHANCED_CHECKSUM, enhanced)
    }
}

/// A LIN frame as seen on the bus.
///
/// Received frames come out of [`ReceiveParser`](crate::ReceiveParser);
/// outgoing frames are built with [`LinFrame::with_enhanced_checksum`] or
/// [`LinFrame::with_classic_checksum`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinFrame {
    /// LIN frame ID (0-63, 6 bits).
    pub id: u8,
    /// Protected identifier as sent or received, parity bits included.
    pub pid: u8,
    /// Frame data (up to 8 bytes).
    pub data: [u8; MAX_LIN_DATA_LEN],
    /// Actual data length.
    pub data_len: u8,
    /// Frame flags.
    pub flags: LinFlags,
    /// Checksum byte.
    pub checksum: u8,
}

impl LinFrame {
    /// Create a new LIN frame.
    ///
    /// # Arguments
    /// * `id` - Frame ID (masked to 0-63)
    /// * `data` - Frame data (truncated to 8 bytes)
    pub fn new(id: u8, data: &[u8]) -> Self {
        let mut frame_data = [0u8; MAX_LIN_DATA_LEN];
        let len = data.len().min(MAX_LIN_DATA_LEN);
        frame_data[..len].copy_from_slice(&data[..len]);

        Self {
            id: frame_id_of(id),
            pid: protected_id(id),
            data: frame_data,
            data_len: len as u8,
            flags: LinFlags::default(),
            checksum: 0,
        }
    }

    /// Create an outgoing frame and compute its checksum with `kind`.
    pub fn with_checksum(id: u8, data: &[u8], kind: ChecksumType) -> Self {
        let mut frame = Self::new(id, data);
        frame.checksum = checksum(kind.seed(frame.pid), frame.data());
        // Seeds from 0x3C up are forced to 0, so those IDs are classic either way
        let enhanced = kind == ChecksumType::Enhanced && frame.id < FIRST_CLASSIC_ID;
        frame.flags = frame.flags.with_enhanced_checksum(enhanced);
        frame
    }

    /// Create a frame with a classic (LIN 1.x) checksum.
    pub fn with_classic_checksum(id: u8, data: &[u8]) -> Self {
        Self::with_checksum(id, data, ChecksumType::Classic)
    }

    /// Create a frame with the checksum LIN 2.x selects for its ID.
    ///
    /// IDs 0x3C and above get a classic checksum and no enhanced flag.
    pub fn with_enhanced_checksum(id: u8, data: &[u8]) -> Self {
        Self::with_checksum(id, data, ChecksumType::for_frame_id(id))
    }

    /// An empty received frame for a transaction that produced no data.
    pub(crate) fn empty(pid: u8, flags: LinFlags) -> Self {
        Self {
            id: frame_id_of(pid),
            pid,
            data: [0u8; MAX_LIN_DATA_LEN],
            data_len: 0,
            flags: flags.with(LinFlags::CHECKSUM_ERROR, true),
            checksum: 0,
        }
    }

    /// Get the data slice.
    pub fn data(&self) -> &[u8] {
        &self.data[..self.data_len as usize]
    }

    /// Number of data bytes.
    pub fn len(&self) -> usize {
        self.data_len as usize
    }

    /// Whether the frame carries no data.
    pub fn is_empty(&self) -> bool {
        self.data_len == 0
    }

    /// Whether the checksum byte validated against the data.
    pub fn checksum_valid(&self) -> bool {
        !self.flags.has_checksum_error()
    }

    /// Serialize the frame the way it appears on the wire after the break:
    /// sync, PID, data and checksum.
    pub fn to_wire_bytes(&self) -> ([u8; MAX_LIN_FRAME_LEN + 2], usize) {
        let mut bytes = [0u8; MAX_LIN_FRAME_LEN + 2];
        bytes[0] = SYNC_BYTE;
        bytes[1] = self.pid;
        let len = self.len();
        bytes[2..2 + len].copy_from_slice(self.data());
        bytes[2 + len] = self.checksum;
        (bytes, len + 3)
    }
}

impl Default for LinFrame {
    fn default() -> Self {
        Self::new(0, &[])
    }
}

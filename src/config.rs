//! Session configuration for [`LinMaster`](crate::LinMaster).
//!
//! A [`LinConfig`] is handed to the master once, validated, and stays fixed
//! for the master's lifetime.
//!
//! ```
//! use core::time::Duration;
//! use lin_master::LinConfig;
//!
//! let config = LinConfig::new(9600).with_timeout(Duration::from_millis(200));
//! assert_eq!(config.break_baud_rate(), 4800);
//! assert!(config.validate().is_ok());
//! ```

use core::time::Duration;

use crate::{Error, Result};

/// Default LIN baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 19_200;

/// Lowest baud rate allowed by LIN 2.x.
pub const MIN_BAUD_RATE: u32 = 1_000;

/// Highest baud rate allowed by LIN 2.x.
pub const MAX_BAUD_RATE: u32 = 20_000;

/// Default wait for a response header.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Default idle time that ends a frame.
pub const DEFAULT_INTER_BYTE_GAP: Duration = Duration::from_millis(2);

/// Default wait for the transmitted frame to come back on the receive line.
pub const DEFAULT_ECHO_TIMEOUT: Duration = Duration::from_millis(10);

/// LIN master session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinConfig {
    /// Nominal bus rate in bit/s.
    pub baud_rate: u32,
    /// Upper bound on waiting for a frame header.
    pub timeout: Duration,
    /// Idle time after which a frame being collected is complete.
    ///
    /// Raised to two byte times at low rates, see
    /// [`frame_gap`](Self::frame_gap).
    pub inter_byte_gap: Duration,
    /// Upper bound on waiting for the echo of a sent frame.
    pub echo_timeout: Duration,
}

impl LinConfig {
    /// Create a configuration with default timings.
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }

    /// Set the receive timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the inter-byte gap.
    pub fn with_inter_byte_gap(mut self, gap: Duration) -> Self {
        self.inter_byte_gap = gap;
        self
    }

    /// Set the echo timeout.
    pub fn with_echo_timeout(mut self, timeout: Duration) -> Self {
        self.echo_timeout = timeout;
        self
    }

    /// Rate used while sending the break byte.
    #[inline]
    pub fn break_baud_rate(&self) -> u32 {
        self.baud_rate >> 1
    }

    /// Time one byte (start, 8 data, stop bits) occupies on the line.
    pub fn byte_time(&self) -> Duration {
        Duration::from_nanos(10 * 1_000_000_000 / u64::from(self.baud_rate.max(1)))
    }

    /// Idle time that ends a frame: `inter_byte_gap`, but never shorter than
    /// two byte times at the configured rate.
    pub fn frame_gap(&self) -> Duration {
        self.inter_byte_gap.max(self.byte_time() * 2)
    }

    /// Check the configuration against the LIN physical layer limits.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_BAUD_RATE..=MAX_BAUD_RATE).contains(&self.baud_rate) {
            return Err(Error::InvalidBaudRate(self.baud_rate));
        }
        Ok(())
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// Requires the `serde_json` feature.
    #[cfg(feature = "serde_json")]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LinConfig = serde_json::from_str(json).map_err(|e| {
            Error::ConfigError(alloc::format!("JSON deserialization failed: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty-printed JSON.
    ///
    /// Requires the `serde_json` feature.
    #[cfg(feature = "serde_json")]
    pub fn to_json(&self) -> Result<alloc::string::String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::ConfigError(alloc::format!("JSON serialization failed: {}", e))
        })
    }

    /// Load a configuration from a JSON file.
    ///
    /// Requires the `serde_json` feature.
    #[cfg(feature = "serde_json")]
    pub fn load_from_file(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(Error::IOError)?;
        Self::from_json(&json)
    }

    /// Save the configuration to a JSON file.
    ///
    /// Requires the `serde_json` feature.
    #[cfg(feature = "serde_json")]
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(Error::IOError)?;
        Ok(())
    }
}

impl Default for LinConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
            inter_byte_gap: DEFAULT_INTER_BYTE_GAP,
            echo_timeout: DEFAULT_ECHO_TIMEOUT,
        }
    }
}

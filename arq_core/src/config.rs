//! Protocol parameters shared by sender and receiver.

use crate::error::ArqError;
use crate::seq::SeqSpace;
use arq_env::CORRUPT_SENTINEL;
use serde::{Deserialize, Serialize};

/// Default window size (packets in flight / receive buffer slots).
pub const DEFAULT_WINDOW: u32 = 10;

/// Default retransmission timeout in time units.
pub const DEFAULT_TIMEOUT: f64 = 20.0;

/// Shortest accepted retransmission timeout. Shorter values stop adding
/// to the clock once simulated time grows.
pub const MIN_TIMEOUT: f64 = 1e-3;

/// Default physical capacity of the sender's message buffer.
pub const DEFAULT_SEND_BUFFER: usize = 10_000;

/// Configuration of one Selective-Repeat link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Maximum number of unacknowledged packets at the sender, and the
    /// number of receive buffer slots
    pub window_size: u32,

    /// Size of the sequence number space
    ///
    /// Defaults to `window_size + 1`. A retransmission that is still in the
    /// channel after the receiver has moved more than one slot past it can
    /// alias a future sequence number unless this is at least
    /// `2 * window_size`.
    pub seq_modulus: u32,

    /// Retransmission timeout in time units
    pub timeout: f64,

    /// Messages the sender can hold (in flight plus waiting)
    pub send_buffer_capacity: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }
}

impl ProtocolConfig {
    /// Default parameters around the given window size.
    pub fn with_window(window_size: u32) -> Self {
        Self {
            window_size,
            seq_modulus: window_size.saturating_add(1),
            timeout: DEFAULT_TIMEOUT,
            send_buffer_capacity: DEFAULT_SEND_BUFFER,
        }
    }

    /// Overrides the sequence number modulus.
    pub fn with_seq_modulus(mut self, modulus: u32) -> Self {
        self.seq_modulus = modulus;
        self
    }

    /// Overrides the retransmission timeout.
    pub fn with_timeout(mut self, timeout: f64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the sender buffer capacity.
    pub fn with_send_buffer(mut self, capacity: usize) -> Self {
        self.send_buffer_capacity = capacity;
        self
    }

    /// Checks that the parameters describe a working link.
    pub fn validate(&self) -> Result<(), ArqError> {
        if self.window_size == 0 {
            return Err(ArqError::config("window size must be at least 1"));
        }
        if self.seq_modulus <= self.window_size {
            return Err(ArqError::config(format!(
                "sequence modulus {} must exceed window size {}",
                self.seq_modulus, self.window_size
            )));
        }
        if self.seq_modulus >= CORRUPT_SENTINEL {
            return Err(ArqError::config(format!(
                "sequence modulus {} collides with the corruption sentinel",
                self.seq_modulus
            )));
        }
        if !(self.timeout.is_finite() && self.timeout >= MIN_TIMEOUT) {
            return Err(ArqError::config(format!(
                "timeout must be at least {}, got {}",
                MIN_TIMEOUT, self.timeout
            )));
        }
        if self.send_buffer_capacity < self.window_size as usize {
            return Err(ArqError::config(format!(
                "send buffer ({}) smaller than the window ({})",
                self.send_buffer_capacity, self.window_size
            )));
        }
        Ok(())
    }

    /// `true` when a retransmission can be mistaken for a newer packet.
    pub fn may_alias(&self) -> bool {
        u64::from(self.seq_modulus) < 2 * u64::from(self.window_size)
    }

    /// The sequence space these parameters describe.
    pub fn seq_space(&self) -> SeqSpace {
        SeqSpace::new(self.window_size, self.seq_modulus)
    }
}

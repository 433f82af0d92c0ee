//! Error types for the protocol core.

use thiserror::Error;

/// Failures of the protocol core.
///
/// Channel-level trouble (bad checksums, stale acks, out-of-window
/// sequence numbers) is not an error: it is reported through the handler
/// outcome enums and recovered by retransmission.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArqError {
    /// The sender's physical buffer cannot take another message.
    #[error("Send buffer full ({capacity} messages pending)")]
    SendBufferFull { capacity: usize },

    /// A ring buffer has no free slot at its tail.
    #[error("Ring buffer full ({capacity} slots)")]
    RingFull { capacity: usize },

    /// A logical ring index outside `[head, head + capacity)`.
    #[error("Ring index {index} outside [{head}, {head} + {capacity})")]
    RingIndexOutOfRange { index: u64, head: u64, capacity: usize },

    /// Protocol parameters that cannot work together.
    #[error("Invalid protocol config: {0}")]
    InvalidConfig(String),
}

impl ArqError {
    /// Creates a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

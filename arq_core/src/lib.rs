//! ARQ Core - Selective-Repeat Reliable Data Transfer
//!
//! This library implements the two protocol entities of a Selective-Repeat
//! ARQ link over a channel that may lose or corrupt packets but never
//! reorders them:
//! 1. **Sender**: buffers application messages, keeps up to `window_size`
//!    checksummed packets in flight, releases them one by one as acks
//!    arrive and retransmits the oldest unacknowledged packet on timeout.
//! 2. **Receiver**: validates checksums, acknowledges every valid packet,
//!    buffers out-of-order arrivals inside its window and delivers the
//!    contiguous prefix to the application.
//!
//! Both entities are plain owned state machines. Every side effect goes
//! through an [`arq_env::ArqContext`] passed into each handler call.

pub mod config;
pub mod error;
pub mod receiver;
pub mod ring;
pub mod sender;
pub mod seq;

// Re-export key types for convenience
pub use config::ProtocolConfig;
pub use error::ArqError;
pub use receiver::{ReceiverStats, SegmentOutcome, SrReceiver};
pub use ring::SlotRing;
pub use sender::{AckOutcome, SenderStats, SrSender};
pub use seq::SeqSpace;

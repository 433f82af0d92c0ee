//! Network layer abstraction for the protocol entities.

use crate::error::EnvError;
use crate::types::{EntityId, Packet};
use serde::{Deserialize, Serialize};

/// Abstraction for the unreliable channel below the protocol.
///
/// # Packet Flow
///
/// ```text
/// Entity A                   Channel                    Entity B
///   |                           |                          |
///   |-- to_network(A, pkt) ---->|                          |
///   |                           |-- [loss/corrupt/delay] ->|
///   |                           |                          |-- on_packet(pkt)
/// ```
///
/// The channel may drop or corrupt a packet but never reorders packets
/// headed for the same destination.
pub trait NetworkLayer {
    /// Hands a packet to the channel on behalf of `from`.
    ///
    /// The channel keeps its own copy; the caller may reuse its buffers.
    /// Acceptance says nothing about delivery.
    fn to_network(&mut self, from: EntityId, packet: Packet);
}

/// How a packet gets mangled when the channel corrupts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorruptionKind {
    /// One payload byte changes value.
    Payload,
    /// `seq_num` is overwritten with the sentinel.
    SeqNum,
    /// `ack_num` is overwritten with the sentinel.
    AckNum,
}

/// Fault injection knobs of a simulated channel.
///
/// Transmission indices are 1-based and counted separately per source
/// entity, so `force_loss(EntityId::A, 3)` drops the third packet A hands
/// to the channel regardless of the random draw.
pub trait FaultController {
    /// Sets the probability that any packet is silently dropped.
    fn set_loss_probability(&mut self, probability: f64) -> Result<(), EnvError>;

    /// Sets the probability that a surviving packet is corrupted.
    fn set_corruption_probability(&mut self, probability: f64) -> Result<(), EnvError>;

    /// Drops the `transmission`-th packet sent by `source`.
    fn force_loss(&mut self, source: EntityId, transmission: u64);

    /// Corrupts the `transmission`-th packet sent by `source`.
    fn force_corruption(&mut self, source: EntityId, transmission: u64, kind: CorruptionKind);
}

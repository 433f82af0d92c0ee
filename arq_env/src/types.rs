//! Common types for the ARQ environment abstraction.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;

/// Size in bytes of every application payload.
pub const PAYLOAD_LEN: usize = 20;

/// Value the channel writes into a header field when it corrupts it.
///
/// It lies outside every sequence space the protocol uses, so a packet
/// carrying it can never be mistaken for a real sequence or ack number.
pub const CORRUPT_SENTINEL: u32 = 999_999;

/// One of the two protocol entities attached to the channel.
///
/// `A` hosts the sender, `B` hosts the receiver. Packets handed to the
/// channel by one entity always arrive at its [`peer`](EntityId::peer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityId {
    A,
    B,
}

impl EntityId {
    /// Returns the entity on the other end of the channel.
    pub fn peer(self) -> Self {
        match self {
            EntityId::A => EntityId::B,
            EntityId::B => EntityId::A,
        }
    }

    /// Dense index for per-entity tables.
    pub fn index(self) -> usize {
        match self {
            EntityId::A => 0,
            EntityId::B => 1,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::A => write!(f, "A"),
            EntityId::B => write!(f, "B"),
        }
    }
}

/// Simulated time in abstract time units.
///
/// Wraps an `f64` but is totally ordered (via [`f64::total_cmp`]) so it can
/// be used as a calendar key.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SimTime(f64);

impl SimTime {
    /// The start of every simulation.
    pub const ZERO: SimTime = SimTime(0.0);

    /// Creates a time from raw units.
    pub fn new(units: f64) -> Self {
        Self(units)
    }

    /// Returns the raw time units.
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Returns the later of two times.
    pub fn max(self, other: SimTime) -> SimTime {
        if other > self {
            other
        } else {
            self
        }
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add<f64> for SimTime {
    type Output = SimTime;

    fn add(self, delay: f64) -> SimTime {
        SimTime(self.0 + delay)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Fixed-size opaque application data.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Payload([u8; PAYLOAD_LEN]);

impl Payload {
    /// An all-zero payload (what acknowledgments carry).
    pub fn zeroed() -> Self {
        Self([0; PAYLOAD_LEN])
    }

    /// A payload with every byte set to `byte`.
    pub fn filled(byte: u8) -> Self {
        Self([byte; PAYLOAD_LEN])
    }

    /// Wraps raw bytes.
    pub fn from_bytes(bytes: [u8; PAYLOAD_LEN]) -> Self {
        Self(bytes)
    }

    /// The payload the application layer generates for its `n`-th message
    /// (0-based): twenty copies of the letter `'a' + n % 26`.
    pub fn for_message(n: u64) -> Self {
        Self::filled(b'a' + (n % 26) as u8)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }

    /// Mutable access, used by the channel to corrupt bytes in flight.
    pub fn as_bytes_mut(&mut self) -> &mut [u8; PAYLOAD_LEN] {
        &mut self.0
    }

    /// Wrapping sum of all bytes.
    pub fn byte_sum(&self) -> u32 {
        self.0.iter().fold(0u32, |acc, b| acc.wrapping_add(u32::from(*b)))
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({:?})", self.to_string())
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// An application data unit handed to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub data: Payload,
}

impl Message {
    /// Wraps a payload.
    pub fn new(data: Payload) -> Self {
        Self { data }
    }

    /// The `n`-th message of a generated run (see [`Payload::for_message`]).
    pub fn generated(n: u64) -> Self {
        Self::new(Payload::for_message(n))
    }
}

/// The wire unit exchanged through the channel.
///
/// The checksum is an ordinary wrapping sum over the numeric header fields
/// and the payload bytes. A packet is valid iff the recomputed sum equals
/// [`checksum`](Packet::checksum) exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub seq_num: u32,
    pub ack_num: u32,
    pub checksum: u32,
    pub payload: Payload,
}

impl Packet {
    /// Builds a checksummed data packet (`ack_num` is zero).
    pub fn data(seq_num: u32, payload: Payload) -> Self {
        Self::sealed(seq_num, 0, payload)
    }

    /// Builds a checksummed acknowledgment for `ack_num`.
    ///
    /// Acks carry the number in both header fields and an empty payload.
    pub fn ack(ack_num: u32) -> Self {
        Self::sealed(ack_num, ack_num, Payload::zeroed())
    }

    fn sealed(seq_num: u32, ack_num: u32, payload: Payload) -> Self {
        let mut packet = Self {
            seq_num,
            ack_num,
            checksum: 0,
            payload,
        };
        packet.checksum = packet.compute_checksum();
        packet
    }

    /// Recomputes the checksum over the current field values.
    pub fn compute_checksum(&self) -> u32 {
        self.seq_num
            .wrapping_add(self.ack_num)
            .wrapping_add(self.payload.byte_sum())
    }

    /// `true` when the carried checksum matches the recomputed one.
    pub fn is_valid(&self) -> bool {
        self.compute_checksum() == self.checksum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_peer_is_involution() {
        assert_eq!(EntityId::A.peer(), EntityId::B);
        assert_eq!(EntityId::B.peer(), EntityId::A);
        assert_eq!(EntityId::A.peer().peer(), EntityId::A);
        assert_ne!(EntityId::A.index(), EntityId::B.index());
    }

    #[test]
    fn test_sim_time_ordering() {
        let early = SimTime::new(1.5);
        let late = early + 2.0;

        assert!(early < late);
        assert_eq!(late, SimTime::new(3.5));
        assert_eq!(early.max(late), late);
        assert_eq!(late.max(early), late);
        assert_eq!(SimTime::ZERO.to_string(), "0.000");
    }

    #[test]
    fn test_generated_payload_letters() {
        assert_eq!(Payload::for_message(0), Payload::filled(b'a'));
        assert_eq!(Payload::for_message(24), Payload::filled(b'y'));
        assert_eq!(Payload::for_message(26), Payload::filled(b'a'));
        assert_eq!(Message::generated(2).data.to_string(), "cccccccccccccccccccc");
    }

    #[test]
    fn test_data_packet_checksum() {
        let packet = Packet::data(3, Payload::filled(b'a'));

        assert_eq!(packet.ack_num, 0);
        assert_eq!(packet.checksum, 3 + 20 * 97);
        assert!(packet.is_valid());
    }

    #[test]
    fn test_ack_packet_layout() {
        let ack = Packet::ack(7);

        assert_eq!(ack.seq_num, 7);
        assert_eq!(ack.ack_num, 7);
        assert_eq!(ack.payload, Payload::zeroed());
        assert_eq!(ack.checksum, 14);
        assert!(ack.is_valid());
    }

    #[test]
    fn test_any_field_change_invalidates() {
        let packet = Packet::data(4, Payload::filled(b'q'));

        let mut seq = packet;
        seq.seq_num = CORRUPT_SENTINEL;
        assert!(!seq.is_valid());

        let mut ack = packet;
        ack.ack_num = CORRUPT_SENTINEL;
        assert!(!ack.is_valid());

        let mut body = packet;
        body.payload.as_bytes_mut()[11] ^= 0x20;
        assert!(!body.is_valid());
    }

    #[test]
    fn test_payload_display_masks_control_bytes() {
        let mut bytes = [b'x'; PAYLOAD_LEN];
        bytes[0] = 0;
        assert_eq!(Payload::from_bytes(bytes).to_string(), ".xxxxxxxxxxxxxxxxxxx");
    }

    #[test]
    fn test_packet_serde_roundtrip() {
        let packet = Packet::data(9, Payload::for_message(5));
        let json = serde_json::to_string(&packet).unwrap();
        let back: Packet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, packet);
    }
}

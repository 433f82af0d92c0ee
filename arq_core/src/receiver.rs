//! Selective-Repeat receive side.
//!
//! [`SrReceiver`] acknowledges every packet with a valid checksum using the
//! packet's own sequence number, buffers in-window payloads by offset from
//! `ack_base` and hands the contiguous run starting at `ack_base` to the
//! application layer in order.

use crate::config::ProtocolConfig;
use crate::error::ArqError;
use crate::ring::SlotRing;
use crate::seq::SeqSpace;
use arq_env::{ArqContext, EntityId, Packet, Payload};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the receiver did with an incoming packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentOutcome {
    /// Checksum mismatch; dropped without an ack.
    Corrupt,

    /// Valid but outside the receive window; acked, payload discarded.
    OutOfWindow { seq_num: u32 },

    /// Stored at `offset` from the old `ack_base`; `delivered` payloads
    /// went to the application as a result.
    Buffered { seq_num: u32, offset: u32, delivered: usize },
}

/// Counters kept by the receiver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverStats {
    /// In-window packets stored into an empty slot
    pub accepted: u64,

    /// In-window packets whose slot was already filled
    pub duplicates: u64,

    /// Valid packets outside the window
    pub out_of_window: u64,

    /// Packets that failed the checksum
    pub corrupt: u64,

    /// Payloads handed to the application
    pub delivered: u64,

    /// Acks sent back
    pub acks_sent: u64,
}

/// Selective-Repeat receiving entity.
#[derive(Debug)]
pub struct SrReceiver {
    entity: EntityId,
    seq: SeqSpace,
    /// Sequence number of the next payload owed to the application
    ack_base: u32,
    /// Receive slots; the ring head is the logical position of `ack_base`
    window: SlotRing<Payload>,
    stats: ReceiverStats,
}

impl SrReceiver {
    pub fn new(entity: EntityId, config: &ProtocolConfig) -> Result<Self, ArqError> {
        config.validate()?;
        Ok(Self {
            entity,
            seq: config.seq_space(),
            ack_base: 0,
            window: SlotRing::with_capacity(config.window_size as usize),
            stats: ReceiverStats::default(),
        })
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Sequence number of the next in-order payload.
    pub fn ack_base(&self) -> u32 {
        self.ack_base
    }

    /// Payloads buffered ahead of a gap.
    pub fn buffered(&self) -> usize {
        (self.window.head()..self.window.tail())
            .filter(|index| self.window.occupied(*index))
            .count()
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Handles a packet arriving from the channel.
    pub fn on_packet<C: ArqContext>(&mut self, ctx: &mut C, packet: Packet) -> Result<SegmentOutcome, ArqError> {
        debug!(entity = %self.entity, seq = packet.seq_num, msg = %packet.payload, "Recv Pkt");

        if !packet.is_valid() {
            self.stats.corrupt += 1;
            debug!(entity = %self.entity, "Checksum failed, dropped the packet");
            return Ok(SegmentOutcome::Corrupt);
        }

        let seq_num = packet.seq_num;
        self.send_ack(ctx, seq_num);

        let Some(offset) = self.seq.in_window(self.ack_base, seq_num) else {
            self.stats.out_of_window += 1;
            debug!(entity = %self.entity, seq = seq_num, base = self.ack_base, "Out of window, payload discarded");
            return Ok(SegmentOutcome::OutOfWindow { seq_num });
        };

        let index = self.window.head() + u64::from(offset);
        if self.window.place(index, packet.payload)?.is_some() {
            self.stats.duplicates += 1;
        } else {
            self.stats.accepted += 1;
        }

        let mut delivered = 0;
        while let Some(payload) = self.window.pop_occupied() {
            debug!(entity = %self.entity, seq = self.ack_base, msg = %payload, "Deliver to layer5");
            ctx.to_application(self.entity, payload);
            self.ack_base = self.seq.advance(self.ack_base, 1);
            delivered += 1;
        }
        self.stats.delivered += delivered as u64;

        Ok(SegmentOutcome::Buffered { seq_num, offset, delivered })
    }

    fn send_ack<C: ArqContext>(&mut self, ctx: &mut C, ack_num: u32) {
        debug!(entity = %self.entity, ack = ack_num, "Send ACK");
        self.stats.acks_sent += 1;
        ctx.to_network(self.entity, Packet::ack(ack_num));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arq_env::RecordingContext;

    fn receiver(window: u32) -> SrReceiver {
        SrReceiver::new(EntityId::B, &ProtocolConfig::with_window(window)).unwrap()
    }

    fn data(seq: u32, byte: u8) -> Packet {
        Packet::data(seq, Payload::filled(byte))
    }

    fn delivered_bytes(ctx: &RecordingContext) -> Vec<u8> {
        ctx.delivered().iter().map(|(_, p)| p.as_bytes()[0]).collect()
    }

    #[test]
    fn test_in_order_packet_delivered_and_acked() {
        let mut ctx = RecordingContext::new();
        let mut rx = receiver(4);

        let outcome = rx.on_packet(&mut ctx, data(0, b'a')).unwrap();

        assert_eq!(outcome, SegmentOutcome::Buffered { seq_num: 0, offset: 0, delivered: 1 });
        assert_eq!(delivered_bytes(&ctx), b"a");
        assert_eq!(ctx.sent(), &[(EntityId::B, Packet::ack(0))]);
        assert_eq!(rx.ack_base(), 1);
    }

    #[test]
    fn test_gap_buffers_then_flushes_in_order() {
        let mut ctx = RecordingContext::new();
        let mut rx = receiver(4);

        rx.on_packet(&mut ctx, data(1, b'b')).unwrap();
        rx.on_packet(&mut ctx, data(2, b'c')).unwrap();
        assert!(ctx.delivered().is_empty());
        assert_eq!(rx.buffered(), 2);

        let outcome = rx.on_packet(&mut ctx, data(0, b'a')).unwrap();
        assert_eq!(outcome, SegmentOutcome::Buffered { seq_num: 0, offset: 0, delivered: 3 });
        assert_eq!(delivered_bytes(&ctx), b"abc");
        assert_eq!(rx.ack_base(), 3);
        assert_eq!(rx.buffered(), 0);

        let acks: Vec<u32> = ctx.sent().iter().map(|(_, p)| p.ack_num).collect();
        assert_eq!(acks, vec![1, 2, 0]);
    }

    #[test]
    fn test_duplicate_in_window_is_idempotent() {
        let mut ctx = RecordingContext::new();
        let mut rx = receiver(4);

        rx.on_packet(&mut ctx, data(2, b'c')).unwrap();
        rx.on_packet(&mut ctx, data(2, b'c')).unwrap();

        assert_eq!(rx.stats().accepted, 1);
        assert_eq!(rx.stats().duplicates, 1);
        assert_eq!(rx.buffered(), 1);
        assert_eq!(ctx.sent().len(), 2);
    }

    #[test]
    fn test_already_delivered_packet_is_acked_not_redelivered() {
        let mut ctx = RecordingContext::new();
        let mut rx = receiver(4);

        rx.on_packet(&mut ctx, data(0, b'a')).unwrap();
        // modulus 5, base 1: seq 0 is the one number outside the window
        let outcome = rx.on_packet(&mut ctx, data(0, b'a')).unwrap();

        assert_eq!(outcome, SegmentOutcome::OutOfWindow { seq_num: 0 });
        assert_eq!(ctx.delivered().len(), 1);
        assert_eq!(ctx.sent().last(), Some(&(EntityId::B, Packet::ack(0))));
    }

    #[test]
    fn test_far_future_packet_is_acked_not_buffered() {
        let mut ctx = RecordingContext::new();
        let config = ProtocolConfig::with_window(4).with_seq_modulus(8);
        let mut rx = SrReceiver::new(EntityId::B, &config).unwrap();
        assert_eq!(rx.entity(), EntityId::B);

        rx.on_packet(&mut ctx, data(0, b'a')).unwrap();
        // base 1, window covers 1..=4
        let outcome = rx.on_packet(&mut ctx, data(5, b'f')).unwrap();

        assert_eq!(outcome, SegmentOutcome::OutOfWindow { seq_num: 5 });
        assert_eq!(ctx.sent().last(), Some(&(EntityId::B, Packet::ack(5))));
        assert_eq!(rx.buffered(), 0);
        assert_eq!(delivered_bytes(&ctx), b"a");
        assert_eq!(rx.ack_base(), 1);
        assert_eq!(rx.stats().out_of_window, 1);
        assert_eq!(rx.stats().acks_sent, 2);
    }

    #[test]
    fn test_corrupt_packet_dropped_without_ack() {
        let mut ctx = RecordingContext::new();
        let mut rx = receiver(4);

        let mut packet = data(0, b'a');
        packet.payload.as_bytes_mut()[3] ^= 0x10;

        assert_eq!(rx.on_packet(&mut ctx, packet).unwrap(), SegmentOutcome::Corrupt);
        assert!(ctx.sent().is_empty());
        assert!(ctx.delivered().is_empty());
        assert_eq!(rx.stats().corrupt, 1);
    }

    #[test]
    fn test_delivery_continues_across_wrap() {
        let mut ctx = RecordingContext::new();
        let mut rx = receiver(2);

        // modulus 3
        for (seq, byte) in [(0, b'a'), (1, b'b'), (2, b'c'), (0, b'd'), (1, b'e')] {
            rx.on_packet(&mut ctx, data(seq, byte)).unwrap();
        }

        assert_eq!(delivered_bytes(&ctx), b"abcde");
        assert_eq!(rx.ack_base(), 2);
        assert_eq!(rx.stats().delivered, 5);
    }
}

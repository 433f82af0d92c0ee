//! Selective-Repeat send side.
//!
//! [`SrSender`] buffers every message the application submits, keeps up to
//! `window_size` of them in flight and releases each one individually when
//! its acknowledgement arrives. A single retransmission timer covers the
//! oldest unacknowledged packet; on expiry only that packet is resent.
//!
//! # Buffer layout
//!
//! ```text
//!  window_left        window_right           tail
//!      │                    │                  │
//!  ────┼────────────────────┼──────────────────┼──▶ logical index
//!      │ <── in flight ───▶ │ <── buffered ──▶ │
//! ```
//!
//! `window_left` is the head of the underlying [`SlotRing`]. Released slots
//! inside the flight range stay in place until everything to their left has
//! been released too.

use crate::config::ProtocolConfig;
use crate::error::ArqError;
use crate::ring::SlotRing;
use crate::seq::SeqSpace;
use arq_env::{ArqContext, EntityId, Message, Packet, Payload};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// What the sender did with an incoming packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Checksum mismatch; dropped.
    Corrupt,

    /// Valid, but acknowledges nothing currently in flight.
    Spurious { ack_num: u32 },

    /// Released the slot of `ack_num`; the window slid by `slid` slots.
    Accepted { ack_num: u32, slid: u64 },
}

/// Counters kept by the sender.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderStats {
    /// Messages accepted from the application
    pub submitted: u64,

    /// Packets handed to the channel, retransmissions included
    pub transmissions: u64,

    /// Timeout-driven resends
    pub retransmissions: u64,

    /// Acks that released a slot
    pub acks_accepted: u64,

    /// Valid acks outside the flight range
    pub acks_ignored: u64,

    /// Acks that failed the checksum
    pub corrupt_acks: u64,

    /// Largest number of packets ever in flight at once
    pub max_outstanding: u64,
}

/// Selective-Repeat sending entity.
#[derive(Debug)]
pub struct SrSender {
    /// Entity this sender runs on
    entity: EntityId,

    /// Retransmission timeout
    timeout: f64,

    /// Sequence arithmetic
    seq: SeqSpace,

    /// Sequence number of the packet at `window_left`
    left_seq: u32,

    /// Sequence number for the next fresh transmission
    next_seq: u32,

    /// All messages not yet acknowledged, in flight or waiting
    buffer: SlotRing<Payload>,

    /// Logical index one past the newest transmitted message
    window_right: u64,

    stats: SenderStats,
}

impl SrSender {
    /// Creates a sender with empty buffers and both sequence numbers at 0.
    pub fn new(entity: EntityId, config: &ProtocolConfig) -> Result<Self, ArqError> {
        config.validate()?;
        Ok(Self {
            entity,
            timeout: config.timeout,
            seq: config.seq_space(),
            left_seq: 0,
            next_seq: 0,
            buffer: SlotRing::with_capacity(config.send_buffer_capacity),
            window_right: 0,
            stats: SenderStats::default(),
        })
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Sequence number of the oldest unacknowledged packet.
    pub fn left_seq(&self) -> u32 {
        self.left_seq
    }

    /// Sequence number the next fresh packet will carry.
    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    /// Logical index of the left window edge.
    pub fn window_left(&self) -> u64 {
        self.buffer.head()
    }

    /// Logical index one past the newest transmitted message.
    pub fn window_right(&self) -> u64 {
        self.window_right
    }

    /// Packets transmitted and not yet slid past.
    pub fn outstanding(&self) -> usize {
        (self.window_right - self.buffer.head()) as usize
    }

    /// Messages waiting for window space.
    pub fn buffered(&self) -> usize {
        (self.buffer.tail() - self.window_right) as usize
    }

    /// `true` when nothing is in flight and nothing is waiting.
    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    /// Accepts a message from the application layer.
    ///
    /// The message is transmitted immediately if the window has room and
    /// buffered otherwise. Starts the timer when the sender was idle.
    pub fn submit<C: ArqContext>(&mut self, ctx: &mut C, message: Message) -> Result<(), ArqError> {
        if self.buffer.is_full() {
            warn!(
                entity = %self.entity,
                capacity = self.buffer.capacity(),
                "Send buffer full, message rejected"
            );
            return Err(ArqError::SendBufferFull { capacity: self.buffer.capacity() });
        }

        if self.buffer.is_empty() {
            debug!(entity = %self.entity, "Start Timer");
            ctx.start_timer(self.entity, self.timeout);
        }

        self.buffer.push(message.data)?;
        self.stats.submitted += 1;

        if self.pump(ctx) == 0 {
            debug!(
                entity = %self.entity,
                buffered = self.buffered(),
                "Window is full, message cached"
            );
        }
        Ok(())
    }

    /// Handles a packet arriving from the channel.
    pub fn on_packet<C: ArqContext>(&mut self, ctx: &mut C, packet: Packet) -> Result<AckOutcome, ArqError> {
        debug!(entity = %self.entity, ack = packet.ack_num, "Recv ACK");

        if !packet.is_valid() {
            self.stats.corrupt_acks += 1;
            debug!(entity = %self.entity, "Checksum failed, dropped the packet");
            return Ok(AckOutcome::Corrupt);
        }

        let ack_num = packet.ack_num;
        let Some(offset) = self.seq.in_range(self.left_seq, self.outstanding() as u32, ack_num) else {
            self.stats.acks_ignored += 1;
            debug!(
                entity = %self.entity,
                ack = ack_num,
                left = self.left_seq,
                outstanding = self.outstanding(),
                "Ack outside window, ignored"
            );
            return Ok(AckOutcome::Spurious { ack_num });
        };

        debug!(entity = %self.entity, "Stop Timer");
        ctx.stop_timer(self.entity);

        let index = self.buffer.head() + u64::from(offset);
        if self.buffer.release(index)?.is_none() {
            debug!(entity = %self.entity, ack = ack_num, "Duplicate ack for released slot");
        }
        self.stats.acks_accepted += 1;

        let slid = self.slide();
        if slid > 0 && self.buffered() > 0 {
            let sent = self.pump(ctx);
            debug!(entity = %self.entity, slid, sent, "Slide right & send cached msg");
        }

        if self.outstanding() > 0 {
            debug!(entity = %self.entity, "Start Timer");
            ctx.start_timer(self.entity, self.timeout);
        }

        Ok(AckOutcome::Accepted { ack_num, slid })
    }

    /// Handles expiry of this entity's timer.
    ///
    /// Resends the packet at the left window edge and rearms the timer.
    /// Returns the retransmitted sequence number.
    pub fn on_timeout<C: ArqContext>(&mut self, ctx: &mut C) -> Option<u32> {
        if self.outstanding() == 0 {
            warn!(entity = %self.entity, "Timer expired with nothing in flight");
            return None;
        }
        let Some(payload) = self.buffer.get(self.buffer.head()).copied() else {
            warn!(entity = %self.entity, "Timer expired but left edge already released");
            return None;
        };

        let seq = self.left_seq;
        debug!(entity = %self.entity, seq, "Time out, resend packet");
        self.stats.retransmissions += 1;
        self.transmit(ctx, seq, payload);

        debug!(entity = %self.entity, "Start Timer");
        ctx.start_timer(self.entity, self.timeout);
        Some(seq)
    }

    /// Transmits buffered messages while the window has room.
    fn pump<C: ArqContext>(&mut self, ctx: &mut C) -> usize {
        let mut sent = 0;
        while self.outstanding() < self.seq.window() as usize && self.window_right < self.buffer.tail() {
            let Some(payload) = self.buffer.get(self.window_right).copied() else {
                break;
            };
            self.transmit(ctx, self.next_seq, payload);
            self.next_seq = self.seq.advance(self.next_seq, 1);
            self.window_right += 1;
            sent += 1;
        }
        self.stats.max_outstanding = self.stats.max_outstanding.max(self.outstanding() as u64);
        sent
    }

    /// Drops released slots off the left edge.
    fn slide(&mut self) -> u64 {
        let mut slid = 0;
        while self.buffer.head() < self.window_right && !self.buffer.front_occupied() {
            self.buffer.pop_front();
            self.left_seq = self.seq.advance(self.left_seq, 1);
            slid += 1;
        }
        slid
    }

    fn transmit<C: ArqContext>(&mut self, ctx: &mut C, seq: u32, payload: Payload) {
        debug!(entity = %self.entity, seq, msg = %payload, "Send Pkt");
        self.stats.transmissions += 1;
        ctx.to_network(self.entity, Packet::data(seq, payload));
    }
}

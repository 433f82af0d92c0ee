//! Recording implementation of ArqContext for protocol unit tests.

use crate::context::ArqContext;
use crate::network::NetworkLayer;
use crate::types::{EntityId, Packet, Payload, SimTime};

/// A timer call observed by [`RecordingContext`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerOp {
    Start { entity: EntityId, increment: f64 },
    Stop { entity: EntityId },
}

/// Context that performs no I/O and simply remembers every call.
///
/// Timers follow the same single-timer rule as the emulator: a start while
/// running and a stop while idle are counted as misuse and change nothing.
#[derive(Debug, Default)]
pub struct RecordingContext {
    /// Time reported by `now()`; moved by the test
    now: SimTime,

    /// Packets handed to the channel, in order
    sent: Vec<(EntityId, Packet)>,

    /// Accepted timer operations, in order
    timer_ops: Vec<TimerOp>,

    /// Whether each entity's timer is armed
    running: [bool; 2],

    /// Rejected timer operations
    misuse: usize,

    /// Payloads handed to the application layer, in order
    delivered: Vec<(EntityId, Payload)>,
}

impl RecordingContext {
    /// Creates an empty context at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time reported by `now()`.
    pub fn set_time(&mut self, now: SimTime) {
        self.now = now;
    }

    /// Drains and returns the packets sent so far.
    pub fn take_sent(&mut self) -> Vec<(EntityId, Packet)> {
        std::mem::take(&mut self.sent)
    }

    /// Packets sent so far.
    pub fn sent(&self) -> &[(EntityId, Packet)] {
        &self.sent
    }

    /// Accepted timer operations.
    pub fn timer_ops(&self) -> &[TimerOp] {
        &self.timer_ops
    }

    /// Returns `true` while `entity`'s timer is armed.
    pub fn timer_running(&self, entity: EntityId) -> bool {
        self.running[entity.index()]
    }

    /// Models expiry: disarms the timer as the emulator does when it pops
    /// the timeout event, before calling the entity's timeout handler.
    pub fn expire_timer(&mut self, entity: EntityId) -> bool {
        std::mem::replace(&mut self.running[entity.index()], false)
    }

    /// Number of rejected timer operations.
    pub fn timer_misuse(&self) -> usize {
        self.misuse
    }

    /// Payloads delivered to the application layer.
    pub fn delivered(&self) -> &[(EntityId, Payload)] {
        &self.delivered
    }
}

impl NetworkLayer for RecordingContext {
    fn to_network(&mut self, from: EntityId, packet: Packet) {
        self.sent.push((from, packet));
    }
}

impl ArqContext for RecordingContext {
    fn now(&self) -> SimTime {
        self.now
    }

    fn start_timer(&mut self, entity: EntityId, increment: f64) {
        if self.running[entity.index()] {
            self.misuse += 1;
            return;
        }
        self.running[entity.index()] = true;
        self.timer_ops.push(TimerOp::Start { entity, increment });
    }

    fn stop_timer(&mut self, entity: EntityId) {
        if !self.running[entity.index()] {
            self.misuse += 1;
            return;
        }
        self.running[entity.index()] = false;
        self.timer_ops.push(TimerOp::Stop { entity });
    }

    fn to_application(&mut self, entity: EntityId, payload: Payload) {
        self.delivered.push((entity, payload));
    }
}

//! Simulated unreliable channel between the two entities.
//!
//! Every packet handed to the channel is, in this order:
//! 1. dropped with `loss_probability` (or when the fault plan says so),
//! 2. given an arrival time after the last pending arrival at the same
//!    destination, so packets towards one entity never overtake each other,
//! 3. corrupted with `corruption_probability` (or per the fault plan),
//! 4. scheduled as a `ChannelArrival` for the peer entity.

use crate::calendar::{Calendar, EventKind};
use arq_env::{CorruptionKind, EntityId, EnvError, FaultController, Packet, SimTime, CORRUPT_SENTINEL, PAYLOAD_LEN};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Default propagation delay range `[min, max)` in time units.
pub const DEFAULT_DELAY: (f64, f64) = (1.0, 10.0);

/// Share of corruptions that hit a payload byte; the rest split evenly
/// between the two header fields.
const PAYLOAD_CORRUPTION_SHARE: f64 = 0.75;

/// Channel counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Packets handed to the channel
    pub transmitted: u64,

    /// Packets dropped
    pub lost: u64,

    /// Packets delivered corrupted
    pub corrupted: u64,
}

/// Deterministic fault script keyed by per-source transmission index.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    losses: HashSet<(EntityId, u64)>,
    corruptions: HashMap<(EntityId, u64), CorruptionKind>,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_loss(&mut self, source: EntityId, transmission: u64) {
        self.losses.insert((source, transmission));
    }

    pub fn force_corruption(&mut self, source: EntityId, transmission: u64, kind: CorruptionKind) {
        self.corruptions.insert((source, transmission), kind);
    }

    /// Consumes a scheduled loss.
    pub fn take_loss(&mut self, source: EntityId, transmission: u64) -> bool {
        self.losses.remove(&(source, transmission))
    }

    /// Consumes a scheduled corruption.
    pub fn take_corruption(&mut self, source: EntityId, transmission: u64) -> Option<CorruptionKind> {
        self.corruptions.remove(&(source, transmission))
    }

    /// Faults not yet triggered.
    pub fn pending(&self) -> usize {
        self.losses.len() + self.corruptions.len()
    }
}

/// The lossy, corrupting, order-preserving channel.
#[derive(Debug)]
pub struct ChannelEmulator {
    /// Probability that a packet is dropped
    loss_probability: f64,

    /// Probability that a surviving packet is corrupted
    corruption_probability: f64,

    /// Propagation delay bounds `[min, max)`
    delay_range: (f64, f64),

    delay: Uniform<f64>,

    rng: ChaCha8Rng,

    plan: FaultPlan,

    /// Packets sent so far by each entity
    sent_by: [u64; 2],

    stats: ChannelStats,
}

impl ChannelEmulator {
    /// Creates a channel with the default delay range.
    pub fn new(seed: u64, loss_probability: f64, corruption_probability: f64) -> Result<Self, EnvError> {
        let (min, max) = DEFAULT_DELAY;
        Ok(Self {
            loss_probability: EnvError::check_probability("loss probability", loss_probability)?,
            corruption_probability: EnvError::check_probability("corruption probability", corruption_probability)?,
            delay_range: DEFAULT_DELAY,
            delay: Uniform::new(min, max),
            rng: ChaCha8Rng::seed_from_u64(seed),
            plan: FaultPlan::new(),
            sent_by: [0; 2],
            stats: ChannelStats::default(),
        })
    }

    /// Replaces the propagation delay range.
    ///
    /// `min` must be positive so two packets to the same destination never
    /// share an arrival time.
    pub fn with_delay_range(mut self, min: f64, max: f64) -> Result<Self, EnvError> {
        if !(min.is_finite() && max.is_finite() && min > 0.0 && max > min) {
            return Err(EnvError::InvalidDelay { min, max });
        }
        self.delay_range = (min, max);
        self.delay = Uniform::new(min, max);
        Ok(self)
    }

    pub fn loss_probability(&self) -> f64 {
        self.loss_probability
    }

    pub fn corruption_probability(&self) -> f64 {
        self.corruption_probability
    }

    pub fn delay_range(&self) -> (f64, f64) {
        self.delay_range
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Mutable access to the fault script.
    pub fn plan_mut(&mut self) -> &mut FaultPlan {
        &mut self.plan
    }

    /// Sends `packet` from `source` towards its peer.
    ///
    /// Returns the scheduled arrival time, or `None` if the packet was lost.
    pub fn send(&mut self, calendar: &mut Calendar, now: SimTime, source: EntityId, packet: Packet) -> Option<SimTime> {
        self.stats.transmitted += 1;
        self.sent_by[source.index()] += 1;
        let transmission = self.sent_by[source.index()];

        let forced_loss = self.plan.take_loss(source, transmission);
        if self.rng.gen::<f64>() < self.loss_probability || forced_loss {
            self.stats.lost += 1;
            info!(%source, transmission, seq = packet.seq_num, ack = packet.ack_num, forced = forced_loss, "Packet lost");
            return None;
        }

        let mut copy = packet;
        let destination = source.peer();

        let last = calendar
            .latest_matching(|e| e.entity == destination && e.kind.is_channel_arrival())
            .map(|e| e.time)
            .unwrap_or(now);
        let arrival = last.max(now) + self.delay.sample(&mut self.rng);

        let forced_corruption = self.plan.take_corruption(source, transmission);
        let drawn = self.rng.gen::<f64>() < self.corruption_probability;
        let kind = match forced_corruption {
            Some(kind) => Some(kind),
            None if drawn => Some(self.draw_corruption_kind()),
            None => None,
        };
        if let Some(kind) = kind {
            self.corrupt(&mut copy, kind);
            self.stats.corrupted += 1;
            info!(%source, transmission, ?kind, forced = forced_corruption.is_some(), "Packet corrupted");
        }

        debug!(%source, %destination, %arrival, seq = copy.seq_num, ack = copy.ack_num, "Packet scheduled");
        calendar.insert(arrival, destination, EventKind::ChannelArrival(copy));
        Some(arrival)
    }

    fn draw_corruption_kind(&mut self) -> CorruptionKind {
        let x = self.rng.gen::<f64>();
        if x < PAYLOAD_CORRUPTION_SHARE {
            CorruptionKind::Payload
        } else if x < PAYLOAD_CORRUPTION_SHARE + (1.0 - PAYLOAD_CORRUPTION_SHARE) / 2.0 {
            CorruptionKind::SeqNum
        } else {
            CorruptionKind::AckNum
        }
    }

    fn corrupt(&mut self, packet: &mut Packet, kind: CorruptionKind) {
        match kind {
            CorruptionKind::Payload => {
                let position = self.rng.gen_range(0..PAYLOAD_LEN);
                let mask = self.rng.gen_range(1..=u8::MAX);
                packet.payload.as_bytes_mut()[position] ^= mask;
            }
            CorruptionKind::SeqNum => packet.seq_num = CORRUPT_SENTINEL,
            CorruptionKind::AckNum => packet.ack_num = CORRUPT_SENTINEL,
        }
    }
}

impl FaultController for ChannelEmulator {
    fn set_loss_probability(&mut self, probability: f64) -> Result<(), EnvError> {
        self.loss_probability = EnvError::check_probability("loss probability", probability)?;
        Ok(())
    }

    fn set_corruption_probability(&mut self, probability: f64) -> Result<(), EnvError> {
        self.corruption_probability = EnvError::check_probability("corruption probability", probability)?;
        Ok(())
    }

    fn force_loss(&mut self, source: EntityId, transmission: u64) {
        self.plan.force_loss(source, transmission);
    }

    fn force_corruption(&mut self, source: EntityId, transmission: u64, kind: CorruptionKind) {
        self.plan.force_corruption(source, transmission, kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arq_env::Payload;

    fn arrivals(calendar: &mut Calendar) -> Vec<(SimTime, EntityId, Packet)> {
        std::iter::from_fn(|| calendar.pop_earliest())
            .filter_map(|e| match e.kind {
                EventKind::ChannelArrival(p) => Some((e.time, e.entity, p)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_perfect_channel_delivers_to_peer_within_delay() {
        let mut channel = ChannelEmulator::new(7, 0.0, 0.0).unwrap();
        let mut calendar = Calendar::new();
        let packet = Packet::data(3, Payload::filled(b'x'));

        let at = channel.send(&mut calendar, SimTime::new(10.0), EntityId::A, packet).unwrap();

        assert!(at.as_f64() >= 11.0 && at.as_f64() < 20.0);
        let got = arrivals(&mut calendar);
        assert_eq!(got, vec![(at, EntityId::B, packet)]);
        assert_eq!(channel.stats().transmitted, 1);
    }

    #[test]
    fn test_same_destination_never_reorders() {
        let mut channel = ChannelEmulator::new(11, 0.0, 0.0).unwrap();
        let mut calendar = Calendar::new();

        for seq in 0..50 {
            channel.send(&mut calendar, SimTime::ZERO, EntityId::A, Packet::data(seq, Payload::zeroed()));
        }

        let seqs: Vec<u32> = arrivals(&mut calendar).into_iter().map(|(_, _, p)| p.seq_num).collect();
        assert_eq!(seqs, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_full_loss_schedules_nothing() {
        let mut channel = ChannelEmulator::new(1, 1.0, 0.0).unwrap();
        let mut calendar = Calendar::new();

        assert!(channel.send(&mut calendar, SimTime::ZERO, EntityId::A, Packet::ack(0)).is_none());
        assert!(calendar.is_empty());
        assert_eq!(channel.stats().lost, 1);
    }

    #[test]
    fn test_random_corruption_always_breaks_checksum() {
        let mut channel = ChannelEmulator::new(5, 0.0, 1.0).unwrap();
        let mut calendar = Calendar::new();

        for seq in 0..200 {
            let packet = Packet::data(seq % 11, Payload::for_message(u64::from(seq)));
            channel.send(&mut calendar, SimTime::ZERO, EntityId::A, packet);
        }

        let got = arrivals(&mut calendar);
        assert_eq!(got.len(), 200);
        assert!(got.iter().all(|(_, _, p)| !p.is_valid()));
        assert_eq!(channel.stats().corrupted, 200);
    }

    #[test]
    fn test_fault_plan_targets_one_transmission() {
        let mut channel = ChannelEmulator::new(3, 0.0, 0.0).unwrap();
        let mut calendar = Calendar::new();
        channel.force_loss(EntityId::A, 2);
        channel.force_corruption(EntityId::B, 1, CorruptionKind::AckNum);

        for seq in 0..3 {
            channel.send(&mut calendar, SimTime::ZERO, EntityId::A, Packet::data(seq, Payload::zeroed()));
        }
        channel.send(&mut calendar, SimTime::ZERO, EntityId::B, Packet::ack(0));

        let got = arrivals(&mut calendar);
        let to_b: Vec<u32> = got.iter().filter(|(_, e, _)| *e == EntityId::B).map(|(_, _, p)| p.seq_num).collect();
        assert_eq!(to_b, vec![0, 2]);

        let to_a: Vec<&Packet> = got.iter().filter(|(_, e, _)| *e == EntityId::A).map(|(_, _, p)| p).collect();
        assert_eq!(to_a.len(), 1);
        assert_eq!(to_a[0].ack_num, CORRUPT_SENTINEL);
        assert!(!to_a[0].is_valid());
        assert_eq!(channel.plan_mut().pending(), 0);
    }

    #[test]
    fn test_rates_change_mid_run() {
        let mut channel = ChannelEmulator::new(9, 0.0, 0.0).unwrap();
        let mut calendar = Calendar::new();
        assert!(channel.send(&mut calendar, SimTime::ZERO, EntityId::A, Packet::ack(0)).is_some());

        channel.set_loss_probability(1.0).unwrap();
        assert_eq!(channel.loss_probability(), 1.0);
        assert!(channel.send(&mut calendar, SimTime::ZERO, EntityId::A, Packet::ack(1)).is_none());

        channel.set_loss_probability(0.0).unwrap();
        channel.set_corruption_probability(1.0).unwrap();
        assert_eq!(channel.corruption_probability(), 1.0);
        channel.send(&mut calendar, SimTime::ZERO, EntityId::A, Packet::ack(2));

        let got = arrivals(&mut calendar);
        assert_eq!(got.len(), 2);
        assert!(got[0].2.is_valid());
        assert!(!got[1].2.is_valid());
        assert_eq!(channel.stats().lost, 1);

        assert!(channel.set_loss_probability(1.5).is_err());
        assert_eq!(channel.loss_probability(), 0.0);
        assert!(channel.set_corruption_probability(f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(ChannelEmulator::new(0, 1.2, 0.0).is_err());
        assert!(ChannelEmulator::new(0, 0.0, -0.5).is_err());

        let channel = ChannelEmulator::new(0, 0.0, 0.0).unwrap();
        assert_eq!(
            channel.with_delay_range(5.0, 5.0).unwrap_err(),
            EnvError::InvalidDelay { min: 5.0, max: 5.0 }
        );
    }

    #[test]
    fn test_same_seed_same_schedule() {
        let run = |seed| {
            let mut channel = ChannelEmulator::new(seed, 0.3, 0.3).unwrap();
            let mut calendar = Calendar::new();
            (0..20)
                .map(|seq| channel.send(&mut calendar, SimTime::ZERO, EntityId::A, Packet::data(seq, Payload::zeroed())))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(99), run(99));
    }
}

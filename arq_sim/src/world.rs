//! SimWorld - the simulation harness container and dispatch loop.

use crate::arrivals::{ArrivalGenerator, ArrivalProcess};
use crate::calendar::{Calendar, Event, EventKind};
use crate::channel::{ChannelEmulator, ChannelStats};
use crate::context::{Delivery, SimContext};
use crate::error::{ConfigError, SimError};
use crate::exporter::TraceRecord;
use crate::timer::{TimerService, TimerStats};

use arq_core::{ArqError, ProtocolConfig, ReceiverStats, SenderStats, SrReceiver, SrSender};
use arq_env::{EntityId, EnvError, Message, Payload, SimTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of messages the application layer generates
    pub messages: u64,

    /// Probability that the channel drops a packet
    pub loss_probability: f64,

    /// Probability that the channel corrupts a surviving packet
    pub corruption_probability: f64,

    /// Application arrival process
    pub arrivals: ArrivalProcess,

    /// Verbosity requested on the command line (0..=3)
    pub trace_level: u8,

    /// Window, sequence space, timeout and buffer sizes
    pub protocol: ProtocolConfig,

    /// Stop dispatching after this time even if events remain
    pub time_limit: Option<f64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            messages: 20,
            loss_probability: 0.0,
            corruption_probability: 0.0,
            arrivals: ArrivalProcess::default(),
            trace_level: 0,
            protocol: ProtocolConfig::default(),
            time_limit: None,
        }
    }
}

impl SimConfig {
    /// Checks every parameter. Nothing is built on failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        EnvError::check_probability("loss probability", self.loss_probability)?;
        EnvError::check_probability("corruption probability", self.corruption_probability)?;
        self.arrivals.validate()?;
        self.protocol.validate()?;
        if let Some(limit) = self.time_limit {
            ConfigError::check_positive("time limit", limit)?;
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_messages(mut self, messages: u64) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_faults(mut self, loss: f64, corruption: f64) -> Self {
        self.loss_probability = loss;
        self.corruption_probability = corruption;
        self
    }

    pub fn with_arrivals(mut self, arrivals: ArrivalProcess) -> Self {
        self.arrivals = arrivals;
        self
    }

    pub fn with_protocol(mut self, protocol: ProtocolConfig) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_time_limit(mut self, limit: f64) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSummary {
    /// Time of the last dispatched event
    pub final_time: f64,

    /// Messages generated by the application layer
    pub messages_generated: u64,

    /// Messages refused because the send buffer was full
    pub messages_rejected: u64,

    /// Payloads delivered to the receiving application
    pub messages_delivered: u64,

    pub events_dispatched: u64,

    /// `true` if the run stopped at the time limit with events pending
    pub time_limit_reached: bool,

    pub channel: ChannelStats,
    pub timers: TimerStats,
    pub sender: SenderStats,
    pub receiver: ReceiverStats,
}

impl SimSummary {
    /// Closing line of a run.
    pub fn termination_line(&self) -> String {
        format!(
            "Simulator terminated at time {:.6} after sending {} msgs from layer5",
            self.final_time, self.messages_generated
        )
    }
}

/// The SimWorld - container for one simulated link.
pub struct SimWorld {
    config: SimConfig,
    calendar: Calendar,
    channel: ChannelEmulator,
    timers: TimerService,
    arrivals: ArrivalGenerator,
    sender: SrSender,
    receiver: SrReceiver,

    /// Time of the most recently dispatched event
    time: SimTime,

    /// Application messages handed to the sender so far
    generated: u64,

    rejected: u64,
    dispatched: u64,
    limit_reached: bool,
    deliveries: Vec<Delivery>,

    /// Dispatch log, when recording is on
    records: Option<Vec<TraceRecord>>,
}

impl SimWorld {
    /// Validates the configuration and builds the world with its first
    /// application arrival scheduled.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        if config.protocol.may_alias() && (config.loss_probability > 0.0 || config.corruption_probability > 0.0) {
            warn!(
                window = config.protocol.window_size,
                modulus = config.protocol.seq_modulus,
                "Sequence modulus below twice the window on a faulty channel; retransmissions may be misdelivered"
            );
        }

        // Derive separate seeds for different subsystems
        let channel_seed = config.seed.wrapping_mul(0x9e3779b97f4a7c15);
        let arrival_seed = config.seed.wrapping_mul(0x517cc1b727220a95);

        let channel = ChannelEmulator::new(channel_seed, config.loss_probability, config.corruption_probability)?;
        let arrivals = ArrivalGenerator::new(config.arrivals, arrival_seed, config.messages)?;
        let sender = SrSender::new(EntityId::A, &config.protocol)?;
        let receiver = SrReceiver::new(EntityId::B, &config.protocol)?;

        let mut world = Self {
            config,
            calendar: Calendar::new(),
            channel,
            timers: TimerService::new(),
            arrivals,
            sender,
            receiver,
            time: SimTime::ZERO,
            generated: 0,
            rejected: 0,
            dispatched: 0,
            limit_reached: false,
            deliveries: Vec::new(),
            records: None,
        };
        world.arrivals.schedule_next(&mut world.calendar, SimTime::ZERO);
        Ok(world)
    }

    /// Turns on the per-event dispatch log.
    pub fn with_recording(mut self) -> Self {
        self.records = Some(Vec::new());
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Channel access for fault injection before or during a run.
    pub fn channel_mut(&mut self) -> &mut ChannelEmulator {
        &mut self.channel
    }

    pub fn sender(&self) -> &SrSender {
        &self.sender
    }

    pub fn receiver(&self) -> &SrReceiver {
        &self.receiver
    }

    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    /// Payloads delivered to B's application, in order.
    pub fn delivered_payloads(&self) -> Vec<Payload> {
        self.deliveries
            .iter()
            .filter(|d| d.entity == EntityId::B)
            .map(|d| d.payload)
            .collect()
    }

    pub fn records(&self) -> &[TraceRecord] {
        self.records.as_deref().unwrap_or(&[])
    }

    /// Takes the dispatch log.
    pub fn take_records(&mut self) -> Vec<TraceRecord> {
        self.records.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Dispatches the earliest event. Returns `false` once the calendar is
    /// empty or the next event lies beyond the time limit.
    pub fn step(&mut self) -> Result<bool, SimError> {
        let Some(next) = self.calendar.peek_time() else {
            return Ok(false);
        };
        if let Some(limit) = self.config.time_limit {
            if next.as_f64() > limit {
                warn!(%next, limit, pending = self.calendar.len(), "Time limit reached");
                self.limit_reached = true;
                return Ok(false);
            }
        }
        let Some(event) = self.calendar.pop_earliest() else {
            return Ok(false);
        };

        self.time = event.time;
        self.dispatched += 1;
        debug!(time = %event.time, kind = event.kind.label(), entity = %event.entity, "EVENT");
        if let Some(records) = self.records.as_mut() {
            records.push(TraceRecord::from_event(&event));
        }
        self.calendar.dump();

        self.dispatch(event)?;
        Ok(true)
    }

    /// Runs until the calendar drains or the time limit is hit.
    pub fn run(&mut self) -> Result<SimSummary, SimError> {
        info!(
            seed = self.config.seed,
            messages = self.config.messages,
            loss = self.config.loss_probability,
            corrupt = self.config.corruption_probability,
            arrivals = %self.config.arrivals,
            window = self.config.protocol.window_size,
            "Simulation started"
        );
        while self.step()? {}
        let summary = self.summary();
        info!(time = summary.final_time, delivered = summary.messages_delivered, "Simulation finished");
        Ok(summary)
    }

    /// Snapshot of the counters.
    pub fn summary(&self) -> SimSummary {
        SimSummary {
            final_time: self.time.as_f64(),
            messages_generated: self.generated,
            messages_rejected: self.rejected,
            messages_delivered: self.receiver.stats().delivered,
            events_dispatched: self.dispatched,
            time_limit_reached: self.limit_reached,
            channel: self.channel.stats().clone(),
            timers: self.timers.stats().clone(),
            sender: self.sender.stats().clone(),
            receiver: self.receiver.stats().clone(),
        }
    }

    fn dispatch(&mut self, event: Event) -> Result<(), SimError> {
        let now = event.time;
        match event.kind {
            EventKind::ApplicationArrival => {
                self.arrivals.schedule_next(&mut self.calendar, now);
            }
            EventKind::Timeout => self.timers.record_expiry(),
            EventKind::ChannelArrival(_) => {}
        }

        let mut ctx = SimContext::new(
            now,
            &mut self.calendar,
            &mut self.channel,
            &mut self.timers,
            &mut self.deliveries,
        );

        match (event.kind, event.entity) {
            (EventKind::ApplicationArrival, EntityId::A) => {
                let message = Message::generated(self.generated);
                self.generated += 1;
                match self.sender.submit(&mut ctx, message) {
                    Ok(()) => {}
                    Err(ArqError::SendBufferFull { capacity }) => {
                        self.rejected += 1;
                        warn!(capacity, msg = %message.data, "Message dropped, send buffer full");
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            (EventKind::ChannelArrival(packet), EntityId::A) => {
                self.sender.on_packet(&mut ctx, packet)?;
            }
            (EventKind::ChannelArrival(packet), EntityId::B) => {
                self.receiver.on_packet(&mut ctx, packet)?;
            }
            (EventKind::Timeout, EntityId::A) => {
                self.sender.on_timeout(&mut ctx);
            }
            (kind, entity) => {
                warn!(%entity, kind = kind.label(), "Event for an entity with no handler");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quiet(messages: u64) -> SimConfig {
        SimConfig::default()
            .with_messages(messages)
            .with_arrivals(ArrivalProcess::Fixed { interval: 50.0 })
    }

    #[test]
    fn test_sim_world_creation_schedules_first_arrival() {
        let world = SimWorld::new(quiet(3)).unwrap();

        assert_eq!(world.calendar().len(), 1);
        assert_eq!(world.calendar().peek_time(), Some(SimTime::new(50.0)));
        assert_eq!(world.time(), SimTime::ZERO);
    }

    #[test]
    fn test_invalid_config_builds_nothing() {
        let config = quiet(3).with_faults(1.5, 0.0);
        assert!(matches!(SimWorld::new(config), Err(SimError::Config(_))));
    }

    #[test]
    fn test_unusable_ranges_rejected_before_run() {
        let huge_mean = quiet(3).with_arrivals(ArrivalProcess::Uniform { mean: 1e308 });
        assert!(matches!(huge_mean.validate(), Err(ConfigError::OutOfRange { .. })));
        assert!(matches!(SimWorld::new(huge_mean), Err(SimError::Config(_))));

        let tiny_timeout = quiet(3).with_protocol(ProtocolConfig::default().with_timeout(1e-300));
        assert!(matches!(
            SimWorld::new(tiny_timeout),
            Err(SimError::Config(ConfigError::Protocol(ArqError::InvalidConfig(_))))
        ));
    }

    #[test]
    fn test_zero_messages_terminates_immediately() {
        let mut world = SimWorld::new(quiet(0)).unwrap();
        let summary = world.run().unwrap();

        assert_eq!(summary.messages_generated, 0);
        assert_eq!(summary.events_dispatched, 0);
        assert_eq!(summary.final_time, 0.0);
    }

    #[test]
    fn test_clean_run_delivers_everything_in_order() {
        let mut world = SimWorld::new(quiet(30)).unwrap();
        let summary = world.run().unwrap();

        let expected: Vec<Payload> = (0..30).map(Payload::for_message).collect();
        assert_eq!(world.delivered_payloads(), expected);
        assert_eq!(summary.messages_generated, 30);
        assert_eq!(summary.sender.retransmissions, 0);
        assert_eq!(summary.timers.misuse, 0);
        assert!(summary.final_time > 30.0 * 50.0);
        assert!(world.sender().is_idle());
    }

    #[test]
    fn test_time_limit_stops_early() {
        let mut world = SimWorld::new(quiet(100).with_time_limit(500.0)).unwrap();
        let summary = world.run().unwrap();

        assert!(summary.time_limit_reached);
        assert!(summary.final_time <= 500.0);
        assert!(summary.messages_generated < 100);
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let config = SimConfig::default()
            .with_seed(77)
            .with_messages(40)
            .with_faults(0.2, 0.2)
            .with_protocol(ProtocolConfig::with_window(4).with_seq_modulus(8));

        let a = SimWorld::new(config.clone()).unwrap().run().unwrap();
        let b = SimWorld::new(config).unwrap().run().unwrap();

        assert_eq!(a, b);
        assert_relative_eq!(a.final_time, b.final_time);
    }

    #[test]
    fn test_recording_logs_every_dispatch() {
        let mut world = SimWorld::new(quiet(2)).unwrap().with_recording();
        let summary = world.run().unwrap();

        assert_eq!(world.records().len() as u64, summary.events_dispatched);
        assert_eq!(world.records()[0].kind, "from_layer5");
    }
}

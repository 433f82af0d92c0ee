//! Scenario runner - executes the named end-to-end scenarios.

use crate::arrivals::ArrivalProcess;
use crate::error::SimError;
use crate::exporter::TraceExport;
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimSummary, SimWorld};

use arq_core::ProtocolConfig;
use arq_env::{CorruptionKind, EntityId, FaultController, Payload};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Spacing for scenarios that want one packet in flight at a time. Any
/// round trip is shorter than the default timeout, so none of them sees a
/// spurious retransmission.
const SPARSE_INTERVAL: f64 = 50.0;

/// Upper bound on simulated time for the randomized scenarios.
const SCENARIO_TIME_LIMIT: f64 = 1_000_000.0;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Time of the last dispatched event
    pub final_time: f64,

    /// Messages handed to the sender
    pub messages_submitted: u64,

    /// Messages delivered to the receiving application
    pub messages_delivered: u64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,

    /// Event log, when the runner records
    pub trace: Option<TraceExport>,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioMetrics {
    /// Packets handed to the channel by both entities
    pub packets_sent: u64,

    pub packets_lost: u64,

    pub packets_corrupted: u64,

    /// Timeout-driven resends by the sender
    pub retransmissions: u64,

    /// Acks the sender dropped on checksum
    pub corrupt_acks: u64,

    /// Peak number of unacknowledged packets
    pub max_outstanding: u64,

    pub events_dispatched: u64,
}

impl From<&SimSummary> for ScenarioMetrics {
    fn from(summary: &SimSummary) -> Self {
        Self {
            packets_sent: summary.channel.transmitted,
            packets_lost: summary.channel.lost,
            packets_corrupted: summary.channel.corrupted,
            retransmissions: summary.sender.retransmissions,
            corrupt_acks: summary.sender.corrupt_acks,
            max_outstanding: summary.sender.max_outstanding,
            events_dispatched: summary.events_dispatched,
        }
    }
}

/// Runs scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Overrides each scenario's own message count
    messages: Option<u64>,

    /// Keep the dispatch log in the result
    record: bool,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self { seed, messages: None, record: false }
    }

    /// Sets the message count for every scenario.
    pub fn with_messages(mut self, messages: u64) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Records the event log into each result.
    pub fn with_trace(mut self, record: bool) -> Self {
        self.record = record;
        self
    }

    /// Simulation parameters for a scenario.
    pub fn config_for(&self, scenario: ScenarioId) -> SimConfig {
        let messages = self.messages.unwrap_or_else(|| scenario.default_messages());
        let base = SimConfig::default().with_seed(self.seed);
        let sparse = ArrivalProcess::Fixed { interval: SPARSE_INTERVAL };

        match scenario {
            ScenarioId::InOrder => base.with_messages(messages).with_arrivals(sparse),
            ScenarioId::SingleLoss | ScenarioId::CorruptAck => {
                base.with_messages(messages.max(3)).with_arrivals(sparse)
            }
            ScenarioId::Lossy => base
                .with_messages(messages)
                .with_faults(0.2, 0.2)
                .with_arrivals(ArrivalProcess::Uniform { mean: 20.0 })
                .with_protocol(ProtocolConfig::default().with_seq_modulus(20))
                .with_time_limit(SCENARIO_TIME_LIMIT),
            ScenarioId::Backpressure => base
                .with_messages(messages)
                .with_arrivals(ArrivalProcess::Fixed { interval: 1.0 })
                .with_protocol(ProtocolConfig::default().with_seq_modulus(20))
                .with_time_limit(SCENARIO_TIME_LIMIT),
        }
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let config = self.config_for(scenario);
        match self.execute(scenario, config) {
            Ok(result) => result,
            Err(err) => {
                warn!(scenario = scenario.name(), %err, "Scenario aborted");
                ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: false,
                    final_time: 0.0,
                    messages_submitted: 0,
                    messages_delivered: 0,
                    failure_reason: Some(err.to_string()),
                    metrics: ScenarioMetrics::default(),
                    trace: None,
                }
            }
        }
    }

    fn execute(&self, scenario: ScenarioId, config: SimConfig) -> Result<ScenarioResult, SimError> {
        let mut world = SimWorld::new(config.clone())?;
        if self.record {
            world = world.with_recording();
        }

        match scenario {
            ScenarioId::SingleLoss => world.channel_mut().force_loss(EntityId::A, 3),
            ScenarioId::CorruptAck => world.channel_mut().force_corruption(EntityId::B, 3, CorruptionKind::AckNum),
            _ => {}
        }

        let summary = world.run()?;
        let delivered = world.delivered_payloads();
        let window = u64::from(config.protocol.window_size);

        let mut failures = Vec::new();
        if let Some(reason) = check_in_order(&delivered, config.messages) {
            failures.push(reason);
        }
        if summary.time_limit_reached {
            failures.push(format!("time limit reached at {:.1}", summary.final_time));
        }
        if summary.sender.max_outstanding > window {
            failures.push(format!(
                "{} packets outstanding, window is {}",
                summary.sender.max_outstanding, window
            ));
        }

        match scenario {
            ScenarioId::InOrder => {
                if summary.channel.lost + summary.channel.corrupted > 0 {
                    failures.push("channel reported drops".to_string());
                }
                if summary.sender.retransmissions != 0 {
                    failures.push(format!("{} unexpected retransmissions", summary.sender.retransmissions));
                }
            }
            ScenarioId::SingleLoss => {
                if summary.channel.lost != 1 {
                    failures.push(format!("expected 1 lost packet, got {}", summary.channel.lost));
                }
                if summary.sender.retransmissions != 1 {
                    failures.push(format!("expected 1 retransmission, got {}", summary.sender.retransmissions));
                }
            }
            ScenarioId::CorruptAck => {
                if summary.sender.corrupt_acks != 1 {
                    failures.push(format!("expected 1 corrupt ack, got {}", summary.sender.corrupt_acks));
                }
                if summary.sender.retransmissions != 1 {
                    failures.push(format!("expected 1 retransmission, got {}", summary.sender.retransmissions));
                }
            }
            ScenarioId::Lossy => {}
            ScenarioId::Backpressure => {
                if summary.sender.max_outstanding != window {
                    failures.push(format!(
                        "window never filled (peak {} of {})",
                        summary.sender.max_outstanding, window
                    ));
                }
            }
        }

        let passed = failures.is_empty();
        let trace = self.record.then(|| {
            let mut export = TraceExport::new(scenario.name(), config);
            export.extend(world.take_records());
            export.finalize(summary.clone(), Some(passed));
            export
        });

        Ok(ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            final_time: summary.final_time,
            messages_submitted: summary.sender.submitted,
            messages_delivered: summary.messages_delivered,
            failure_reason: (!passed).then(|| failures.join("; ")),
            metrics: ScenarioMetrics::from(&summary),
            trace,
        })
    }
}

/// Describes the first divergence from `a, b, c, ...` delivery, if any.
fn check_in_order(delivered: &[Payload], messages: u64) -> Option<String> {
    if let Some(n) = (0..messages).zip(delivered).position(|(n, p)| *p != Payload::for_message(n)) {
        return Some(format!("delivery {} out of order: got {}", n, delivered[n]));
    }
    if delivered.len() as u64 != messages {
        return Some(format!("delivered {} of {} messages", delivered.len(), messages));
    }
    None
}

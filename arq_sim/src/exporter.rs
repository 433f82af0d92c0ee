//! JSON exporter for offline inspection of a run.
//!
//! Exports the dispatched event sequence plus the final summary.

use crate::calendar::{Event, EventKind};
use crate::world::{SimConfig, SimSummary};
use arq_env::EntityId;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One dispatched event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Simulation time of dispatch
    pub time: f64,

    /// Entity the event was addressed to
    pub entity: EntityId,

    /// `timer_interrupt`, `from_layer5` or `from_layer3`
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq_num: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack_num: Option<u32>,

    /// Checksum verdict for channel arrivals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
}

impl TraceRecord {
    pub fn from_event(event: &Event) -> Self {
        let packet = match event.kind {
            EventKind::ChannelArrival(packet) => Some(packet),
            _ => None,
        };
        Self {
            time: event.time.as_f64(),
            entity: event.entity,
            kind: event.kind.label().to_string(),
            seq_num: packet.map(|p| p.seq_num),
            ack_num: packet.map(|p| p.ack_num),
            valid: packet.map(|p| p.is_valid()),
        }
    }
}

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceExport {
    /// Scenario name, or `custom` for a plain CLI run
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    pub config: SimConfig,

    /// Dispatched events in order
    pub events: Vec<TraceRecord>,

    /// Final counters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SimSummary>,

    /// Whether the run met its scenario's expectations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
}

impl TraceExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, config: SimConfig) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed: config.seed,
            config,
            events: Vec::new(),
            summary: None,
            passed: None,
        }
    }

    /// Appends dispatched events.
    pub fn extend(&mut self, records: impl IntoIterator<Item = TraceRecord>) {
        self.events.extend(records);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, summary: SimSummary, passed: Option<bool>) {
        self.summary = Some(summary);
        self.passed = passed;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arq_env::{Packet, Payload, SimTime};
    use crate::calendar::Calendar;

    #[test]
    fn test_record_captures_packet_fields() {
        let mut calendar = Calendar::new();
        let mut packet = Packet::data(4, Payload::filled(b'e'));
        packet.seq_num = 999_999;
        calendar.insert(SimTime::new(12.5), EntityId::B, EventKind::ChannelArrival(packet));
        calendar.insert(SimTime::new(13.0), EntityId::A, EventKind::Timeout);

        let data = TraceRecord::from_event(&calendar.pop_earliest().unwrap());
        assert_eq!(data.time, 12.5);
        assert_eq!(data.kind, "from_layer3");
        assert_eq!(data.seq_num, Some(999_999));
        assert_eq!(data.valid, Some(false));

        let timeout = TraceRecord::from_event(&calendar.pop_earliest().unwrap());
        assert_eq!(timeout.seq_num, None);
        assert_eq!(timeout.kind, "timer_interrupt");
    }

    #[test]
    fn test_export_serializes_without_empty_fields() {
        let mut export = TraceExport::new("custom", SimConfig::default());
        export.extend([TraceRecord {
            time: 1.0,
            entity: EntityId::A,
            kind: "from_layer5".to_string(),
            seq_num: None,
            ack_num: None,
            valid: None,
        }]);

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["scenario"], "custom");
        assert_eq!(json["events"][0]["kind"], "from_layer5");
        assert!(json["events"][0].get("seq_num").is_none());
        assert!(json.get("summary").is_none());
    }
}

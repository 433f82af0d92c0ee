//! Named end-to-end scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// Perfect channel, messages spaced so the window never fills
    InOrder,

    /// Exactly one data packet lost
    SingleLoss,

    /// Exactly one acknowledgment corrupted
    CorruptAck,

    /// Random loss and corruption on both directions
    Lossy,

    /// Arrivals far faster than the channel drains
    Backpressure,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::InOrder,
            ScenarioId::SingleLoss,
            ScenarioId::CorruptAck,
            ScenarioId::Lossy,
            ScenarioId::Backpressure,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::InOrder => "in_order",
            ScenarioId::SingleLoss => "single_loss",
            ScenarioId::CorruptAck => "corrupt_ack",
            ScenarioId::Lossy => "lossy",
            ScenarioId::Backpressure => "backpressure",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::InOrder => "No faults, 25 messages a..y, delivered exactly in order",
            ScenarioId::SingleLoss => "3rd transmission from A lost, recovered by one retransmission",
            ScenarioId::CorruptAck => "Ack for the 3rd message corrupted, sender times out and resends once",
            ScenarioId::Lossy => "20% loss and 20% corruption, full in-order delivery within the window bound",
            ScenarioId::Backpressure => "Dense arrivals fill the window, excess waits in the send buffer",
        }
    }

    /// Message count used when the runner is not told otherwise.
    pub fn default_messages(&self) -> u64 {
        match self {
            ScenarioId::InOrder => 25,
            ScenarioId::SingleLoss | ScenarioId::CorruptAck => 10,
            ScenarioId::Lossy => 200,
            ScenarioId::Backpressure => 60,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_order" | "inorder" => Ok(ScenarioId::InOrder),
            "single_loss" | "singleloss" => Ok(ScenarioId::SingleLoss),
            "corrupt_ack" | "corruptack" => Ok(ScenarioId::CorruptAck),
            "lossy" => Ok(ScenarioId::Lossy),
            "backpressure" => Ok(ScenarioId::Backpressure),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_from_str() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>(), Ok(id));
        }
    }

    #[test]
    fn test_unknown_scenario() {
        assert_eq!("split_brain".parse::<ScenarioId>(), Err("Unknown scenario: split_brain".to_string()));
        assert_eq!("LOSSY".parse::<ScenarioId>(), Ok(ScenarioId::Lossy));
    }
}

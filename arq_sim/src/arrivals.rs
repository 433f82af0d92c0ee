//! Application-layer message arrivals for entity A.

use crate::calendar::{Calendar, EventId, EventKind};
use crate::error::ConfigError;
use arq_env::{EntityId, SimTime};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp, Uniform};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Inter-arrival time distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArrivalProcess {
    /// Uniform on `[0, 2 * mean]`
    Uniform { mean: f64 },

    /// Exponential with the given mean (Poisson arrivals)
    Exponential { mean: f64 },

    /// Constant spacing
    Fixed { interval: f64 },
}

impl Default for ArrivalProcess {
    fn default() -> Self {
        ArrivalProcess::Uniform { mean: 10.0 }
    }
}

impl ArrivalProcess {
    /// Mean gap between arrivals.
    pub fn mean(&self) -> f64 {
        match *self {
            ArrivalProcess::Uniform { mean } | ArrivalProcess::Exponential { mean } => mean,
            ArrivalProcess::Fixed { interval } => interval,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mean = ConfigError::check_positive("mean inter-arrival time", self.mean())?;
        match *self {
            ArrivalProcess::Uniform { .. } if !(2.0 * mean).is_finite() => {
                Err(ConfigError::OutOfRange { name: "mean inter-arrival time", value: mean })
            }
            ArrivalProcess::Exponential { .. } if !(1.0 / mean).is_finite() => {
                Err(ConfigError::OutOfRange { name: "mean inter-arrival time", value: mean })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ArrivalProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrivalProcess::Uniform { mean } => write!(f, "uniform(mean={mean})"),
            ArrivalProcess::Exponential { mean } => write!(f, "exponential(mean={mean})"),
            ArrivalProcess::Fixed { interval } => write!(f, "fixed({interval})"),
        }
    }
}

#[derive(Debug)]
enum Gap {
    Uniform(Uniform<f64>),
    Exponential(Exp<f64>),
    Fixed(f64),
}

/// Schedules `ApplicationArrival` events until the message budget is used.
#[derive(Debug)]
pub struct ArrivalGenerator {
    gap: Gap,
    rng: ChaCha8Rng,
    budget: u64,
    scheduled: u64,
}

impl ArrivalGenerator {
    pub fn new(process: ArrivalProcess, seed: u64, budget: u64) -> Result<Self, ConfigError> {
        process.validate()?;
        let gap = match process {
            ArrivalProcess::Uniform { mean } => Gap::Uniform(Uniform::new_inclusive(0.0, 2.0 * mean)),
            ArrivalProcess::Exponential { mean } => Gap::Exponential(
                Exp::new(1.0 / mean).map_err(|_| ConfigError::NotPositive { name: "mean inter-arrival time", value: mean })?,
            ),
            ArrivalProcess::Fixed { interval } => Gap::Fixed(interval),
        };
        Ok(Self {
            gap,
            rng: ChaCha8Rng::seed_from_u64(seed),
            budget,
            scheduled: 0,
        })
    }

    /// Arrivals scheduled so far.
    pub fn scheduled(&self) -> u64 {
        self.scheduled
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub fn exhausted(&self) -> bool {
        self.scheduled >= self.budget
    }

    fn next_gap(&mut self) -> f64 {
        match &self.gap {
            Gap::Uniform(dist) => dist.sample(&mut self.rng),
            Gap::Exponential(dist) => dist.sample(&mut self.rng),
            Gap::Fixed(interval) => *interval,
        }
    }

    /// Schedules the next arrival after `now`, unless the budget is used up.
    pub fn schedule_next(&mut self, calendar: &mut Calendar, now: SimTime) -> Option<EventId> {
        if self.exhausted() {
            return None;
        }
        let at = now + self.next_gap();
        self.scheduled += 1;
        trace!(%at, n = self.scheduled, "Generate next arrival");
        Some(calendar.insert(at, EntityId::A, EventKind::ApplicationArrival))
    }
}

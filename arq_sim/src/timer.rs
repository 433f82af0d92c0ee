//! Per-entity retransmission timers on top of the calendar.

use crate::calendar::{Calendar, EventId, EventKind};
use arq_env::{EntityId, SimTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Timer counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStats {
    pub started: u64,
    pub stopped: u64,
    pub expired: u64,
    /// Starts while running and stops while idle
    pub misuse: u64,
}

/// At most one pending `Timeout` event per entity.
///
/// The calendar is the single source of truth: a timer is running exactly
/// while its `Timeout` event is pending, so an expiry popped by the
/// dispatch loop needs no bookkeeping here beyond the counter.
#[derive(Debug, Default)]
pub struct TimerService {
    stats: TimerStats,
}

impl TimerService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(calendar: &Calendar, entity: EntityId) -> bool {
        calendar.any(|e| e.entity == entity && e.kind.is_timeout())
    }

    /// Schedules a timeout for `entity` at `now + increment`, or at the next
    /// representable instant when the increment is lost to rounding.
    pub fn start(&mut self, calendar: &mut Calendar, now: SimTime, entity: EntityId, increment: f64) -> Option<EventId> {
        if Self::is_running(calendar, entity) {
            self.stats.misuse += 1;
            warn!(%entity, %now, "Attempt to start a timer that is already started");
            return None;
        }
        self.stats.started += 1;
        let mut fires = now + increment;
        if fires <= now {
            fires = SimTime::new(next_up(now.as_f64()));
            warn!(%entity, %now, increment, "Timer increment below clock resolution");
        }
        debug!(%entity, %fires, "Timer started");
        Some(calendar.insert(fires, entity, EventKind::Timeout))
    }

    /// Cancels `entity`'s pending timeout.
    pub fn stop(&mut self, calendar: &mut Calendar, entity: EntityId) -> bool {
        match calendar.remove_matching(|e| e.entity == entity && e.kind.is_timeout()) {
            Some(event) => {
                self.stats.stopped += 1;
                debug!(%entity, fires = %event.time, "Timer stopped");
                true
            }
            None => {
                self.stats.misuse += 1;
                warn!(%entity, "Unable to cancel your timer. It wasn't running.");
                false
            }
        }
    }

    /// Counts a timeout popped by the dispatch loop.
    pub fn record_expiry(&mut self) {
        self.stats.expired += 1;
    }

    pub fn stats(&self) -> &TimerStats {
        &self.stats
    }
}

/// Smallest `f64` strictly above a non-negative finite `x`.
fn next_up(x: f64) -> f64 {
    if x <= 0.0 {
        f64::from_bits(1)
    } else {
        f64::from_bits(x.to_bits() + 1)
    }
}

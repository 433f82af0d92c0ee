//! Event calendar - the time-ordered list of pending simulation events.
//!
//! Events are kept sorted by `(time, insertion order)` in a `VecDeque`, so
//! popping the earliest is O(1) and insertion is a binary search plus an
//! O(n) shift. Equal timestamps pop in the order they were inserted.

use arq_env::{EntityId, Packet, SimTime};
use std::collections::VecDeque;
use std::fmt;
use tracing::trace;

/// Handle to a scheduled event, unique within one calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ev#{}", self.0)
    }
}

/// What happens when an event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The entity's retransmission timer expired
    Timeout,

    /// The application layer above the entity has a new message
    ApplicationArrival,

    /// A packet reaches the entity from the channel
    ChannelArrival(Packet),
}

impl EventKind {
    /// Short label used in traces and exports.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Timeout => "timer_interrupt",
            EventKind::ApplicationArrival => "from_layer5",
            EventKind::ChannelArrival(_) => "from_layer3",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, EventKind::Timeout)
    }

    pub fn is_channel_arrival(&self) -> bool {
        matches!(self, EventKind::ChannelArrival(_))
    }
}

/// A scheduled event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: EventId,
    pub time: SimTime,
    pub entity: EntityId,
    pub kind: EventKind,
}

/// Pending events in dispatch order.
#[derive(Debug, Default)]
pub struct Calendar {
    events: VecDeque<Event>,
    next_id: u64,
}

impl Calendar {
    /// Creates an empty calendar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules an event and returns its handle.
    ///
    /// The event goes after every pending event with the same or an
    /// earlier time.
    pub fn insert(&mut self, time: SimTime, entity: EntityId, kind: EventKind) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;

        let position = self.events.partition_point(|e| e.time <= time);
        trace!(%id, %time, %entity, kind = kind.label(), position, "Insert event");
        self.events.insert(position, Event { id, time, entity, kind });
        id
    }

    /// Removes and returns the earliest event. `None` ends the simulation.
    pub fn pop_earliest(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Time of the earliest pending event.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.events.front().map(|e| e.time)
    }

    /// Removes and returns the earliest event matching `pred`.
    pub fn remove_matching(&mut self, pred: impl Fn(&Event) -> bool) -> Option<Event> {
        let position = self.events.iter().position(pred)?;
        self.events.remove(position)
    }

    /// Removes the event with the given handle.
    pub fn remove(&mut self, id: EventId) -> Option<Event> {
        self.remove_matching(|e| e.id == id)
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.events.iter().any(|e| e.id == id)
    }

    /// Latest pending event matching `pred`.
    pub fn latest_matching(&self, pred: impl Fn(&Event) -> bool) -> Option<&Event> {
        self.events.iter().rev().find(|e| pred(e))
    }

    /// `true` if any pending event matches `pred`.
    pub fn any(&self, pred: impl Fn(&Event) -> bool) -> bool {
        self.events.iter().any(pred)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Pending events in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Logs every pending event at trace level.
    pub fn dump(&self) {
        trace!(pending = self.events.len(), "Calendar contents");
        for event in &self.events {
            trace!(
                id = %event.id,
                time = %event.time,
                entity = %event.entity,
                kind = event.kind.label(),
                "  pending"
            );
        }
    }
}

//! Simulation context implementing ArqContext for one dispatched event.

use crate::calendar::Calendar;
use crate::channel::ChannelEmulator;
use crate::timer::TimerService;
use arq_env::{ArqContext, EntityId, NetworkLayer, Packet, Payload, SimTime};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A payload handed to an entity's application layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub time: SimTime,
    pub entity: EntityId,
    pub payload: Payload,
}

/// Borrowed view of the emulator handed to a protocol entity.
///
/// Built fresh by the dispatch loop for each event, frozen at that event's
/// time. Sends go through the channel, timers through the timer service,
/// and deliveries are appended to the world's delivery log.
pub struct SimContext<'a> {
    now: SimTime,
    calendar: &'a mut Calendar,
    channel: &'a mut ChannelEmulator,
    timers: &'a mut TimerService,
    deliveries: &'a mut Vec<Delivery>,
}

impl<'a> SimContext<'a> {
    pub fn new(
        now: SimTime,
        calendar: &'a mut Calendar,
        channel: &'a mut ChannelEmulator,
        timers: &'a mut TimerService,
        deliveries: &'a mut Vec<Delivery>,
    ) -> Self {
        Self { now, calendar, channel, timers, deliveries }
    }
}

impl NetworkLayer for SimContext<'_> {
    fn to_network(&mut self, from: EntityId, packet: Packet) {
        self.channel.send(self.calendar, self.now, from, packet);
    }
}

impl ArqContext for SimContext<'_> {
    fn now(&self) -> SimTime {
        self.now
    }

    fn start_timer(&mut self, entity: EntityId, increment: f64) {
        self.timers.start(self.calendar, self.now, entity, increment);
    }

    fn stop_timer(&mut self, entity: EntityId) {
        self.timers.stop(self.calendar, entity);
    }

    fn to_application(&mut self, entity: EntityId, payload: Payload) {
        info!(%entity, time = %self.now, msg = %payload, "Delivered to application");
        self.deliveries.push(Delivery { time: self.now, entity, payload });
    }
}

//! Core environment context trait for the protocol entities.

use crate::network::NetworkLayer;
use crate::types::{EntityId, Payload, SimTime};

/// The central interface for environment interaction.
///
/// This trait abstracts everything a protocol entity can do besides
/// mutating its own state, so the same sender and receiver code runs under
/// the discrete-event emulator and under a plain recording double.
///
/// # Implementations
///
/// - **Simulation**: `SimContext` (in `arq_sim`) - calendar-backed clock,
///   timers and channel
/// - **Testing**: [`RecordingContext`](crate::RecordingContext) - writes
///   every call down for inspection
///
/// # Determinism
///
/// Handlers must not read any clock other than [`now`](ArqContext::now);
/// in simulation it only moves when the next event is dispatched.
pub trait ArqContext: NetworkLayer {
    /// Returns the current simulated time.
    fn now(&self) -> SimTime;

    /// Arms the single retransmission timer of `entity` to fire after
    /// `increment` time units.
    ///
    /// Starting a timer that is already running is a caller error: the
    /// implementation logs a warning and leaves the running timer alone.
    fn start_timer(&mut self, entity: EntityId, increment: f64);

    /// Cancels the running timer of `entity`.
    ///
    /// Stopping an idle timer is logged as a warning and otherwise ignored.
    fn stop_timer(&mut self, entity: EntityId);

    /// Hands an in-order payload to the application layer above `entity`.
    fn to_application(&mut self, entity: EntityId, payload: Payload);
}

//! ARQ Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seam between the Selective-Repeat
//! protocol entities and whatever drives them. The entities never touch a
//! clock, a socket or a timer directly; every side effect goes through
//! the traits defined here:
//!
//! - Time and timers (`now()`, `start_timer()`, `stop_timer()`)
//! - The unreliable channel (`to_network()`)
//! - The application layer above the receiver (`to_application()`)
//!
//! The discrete-event emulator in `arq_sim` implements these on top of its
//! event calendar; [`RecordingContext`] implements them by simply writing
//! every call down, which is what the protocol unit tests use.
//!
//! # Example
//!
//! ```ignore
//! use arq_env::{ArqContext, EntityId, Packet, Payload};
//!
//! fn echo<Ctx: ArqContext>(ctx: &mut Ctx, packet: Packet) {
//!     if packet.is_valid() {
//!         ctx.to_network(EntityId::B, Packet::ack(packet.seq_num));
//!         ctx.to_application(EntityId::B, packet.payload);
//!     }
//! }
//! ```

mod context;
mod network;
mod types;
mod error;
mod recording;

pub use context::ArqContext;
pub use network::{CorruptionKind, FaultController, NetworkLayer};
pub use types::{EntityId, Message, Packet, Payload, SimTime, CORRUPT_SENTINEL, PAYLOAD_LEN};
pub use error::EnvError;
pub use recording::{RecordingContext, TimerOp};

//! ARQ Discrete-Event Simulation Harness
//!
//! This crate provides the emulated world the protocol entities of
//! `arq_core` run in: a virtual clock, an unreliable channel and the
//! application layers on either side.
//!
//! # Core Principle: Turn-Based Dispatch
//!
//! Nothing runs concurrently. The dispatch loop pops the earliest event
//! from the [`Calendar`], advances the clock to its time and hands it to
//! the addressed entity, which reacts through a [`SimContext`]:
//! - **Time**: jumps from event to event, never advancing on its own
//! - **Channel**: loss, corruption and delay drawn from a seeded RNG,
//!   arrivals per destination kept in send order
//! - **Randomness**: all entropy derived from a single 64-bit seed
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          SimWorld                            │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ Calendar (virtual clock + time-ordered event list)     │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │     ▲ arrivals        ▲ timeouts             ▲ packets       │
//! │  ┌──┴──────────┐  ┌───┴──────────┐   ┌───────┴──────────┐    │
//! │  │ Arrival     │  │ TimerService │   │ ChannelEmulator  │    │
//! │  │ Generator   │  └───▲──────────┘   └───────▲──────────┘    │
//! │  └─────────────┘      │  SimContext          │               │
//! │                  ┌────┴─────┐  packets  ┌────┴─────┐         │
//! │                  │ SrSender │ ◄───────► │SrReceiver│         │
//! │                  │   (A)    │           │   (B)    │         │
//! │                  └──────────┘           └──────────┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use arq_sim::{SimConfig, SimWorld};
//!
//! let config = SimConfig::default().with_messages(100).with_faults(0.1, 0.1);
//! let mut world = SimWorld::new(config)?;
//! let summary = world.run()?;
//! println!("{}", summary.termination_line());
//! # Ok::<(), arq_sim::SimError>(())
//! ```

pub mod arrivals;
pub mod calendar;
pub mod channel;
mod context;
pub mod error;
pub mod exporter;
pub mod runner;
pub mod scenarios;
pub mod timer;
mod world;

pub use arrivals::{ArrivalGenerator, ArrivalProcess};
pub use calendar::{Calendar, Event, EventId, EventKind};
pub use channel::{ChannelEmulator, ChannelStats, FaultPlan};
pub use context::{Delivery, SimContext};
pub use error::{ConfigError, SimError};
pub use exporter::{TraceExport, TraceRecord};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
pub use timer::{TimerService, TimerStats};
pub use world::{SimConfig, SimSummary, SimWorld};

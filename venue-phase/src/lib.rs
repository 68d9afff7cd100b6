#![warn(unused, rust_2018_idioms)]

//! The phase/tick controller: a time-of-day schedule (§4.2) combined with an admin
//! halt/resume state machine, producing one [`tick::TickEvent`] per loop iteration and
//! [`PhaseTransition`] events whenever an engine's live phase changes.

pub mod controller;
pub mod phase;
pub mod schedule;
pub mod tick;
pub mod tz_clock;

pub use controller::{HaltReply, HaltRequest, PhaseTransition, TradingPhaseController};
pub use phase::{Phase, Settings, TradingPhase, TradingStatus};
pub use schedule::{PhaseRecord, PhaseRecordKind, PhaseSchedule};
pub use tick::{TickEvent, TickEventFactory};
pub use tz_clock::TzClock;

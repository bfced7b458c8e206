//! `smartpower-scheduler`: local shutdown/restart scheduling engine.
//!
//! # Overview
//!
//! Entries live in a [`store::ScheduleStore`] persisted as one flat JSON
//! file. Every add passes through [`conflict::check_conflict`] first. The
//! [`monitor::Monitor`] samples the wall clock, matches once per new minute
//! and hands matches to the [`gate::ConfirmationGate`], which executes on
//! confirmation or when its countdown runs out.
//!
//! # Recurrence kinds (trigger priority order)
//!
//! | Kind      | Match rule                                   |
//! |-----------|----------------------------------------------|
//! | `OneTime` | within ±60 s of the entry, fires once        |
//! | `Weekly`  | exact weekday + HH:MM (0 = Monday)           |
//! | `Daily`   | exact HH:MM, only while enabled              |
//!
//! Weekly and daily occurrences can be suppressed one at a time through the
//! skip list.

pub mod backend;
pub mod conflict;
pub mod error;
pub mod gate;
pub mod monitor;
pub mod resolver;
pub mod state;
pub mod store;
pub mod types;

pub use backend::{JsonFileBackend, MemoryBackend, StateBackend};
pub use conflict::{check_conflict, Candidate, Conflict};
pub use error::{Result, SchedulerError};
pub use gate::{ConfirmationGate, GateState};
pub use monitor::{GateCommand, Monitor, MonitorEvent, MonitorOutcome};
pub use resolver::{next_event, upcoming};
pub use state::ScheduleState;
pub use store::{lock_store, ScheduleStore, SharedStore};
pub use types::{DailySetting, NextEvent, OneTimeEntry, Trigger, WeeklyEntry};

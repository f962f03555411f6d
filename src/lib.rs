//! This crate is the core of a personal calendar backend.
//!
//! It deterministically expands recurring events into their concrete occurrences for
//! a time window, merges them with ordinary events in the [`query`] module, and
//! drives a periodic, idempotent reminder scan in the [`reminder`] module.
//!
//! Occurrences are *virtual*: a recurring event is stored once, as a master record
//! carrying its recurrence rule as text, and every query recomputes the occurrences
//! that fall in the requested window. Nothing about a series is cached or persisted
//! between queries, so editing (or clearing) a rule takes effect on the very next read.
//!
//! The pieces the surrounding application must provide (persistence, notification
//! transport) are abstracted behind the traits in [`traits`]; a file-backed
//! [`LocalStore`] implementation is provided in the [`store`] module.

pub mod traits;

mod event;
pub use event::{EndBeforeStart, Event, EventId, UserId};
mod instance;
pub use instance::{EventInstance, InstanceRecord};
pub mod rrule;
pub mod expand;
pub mod window;
pub use window::TimeWindow;
pub mod query;
pub use query::RangeQueryEngine;
pub mod reminder;
pub use reminder::ReminderScanner;

pub mod store;
pub use store::LocalStore;

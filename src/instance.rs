//! Concrete instances of events, as returned by range queries.
//!
//! An instance is either a non-recurring master itself, or one virtual occurrence of
//! a recurring master. Keeping the two as a tagged variant (rather than one struct
//! with an `is_occurrence` flag) makes identity and provenance explicit: an
//! `Occurrence` always knows which master it was derived from, and an occurrence can
//! never be mistaken for a persisted record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{Event, EventId};

/// One displayable calendar entry resolved for a specific time window
#[derive(Clone, Debug, PartialEq)]
pub enum EventInstance {
    /// A non-recurring master event, emitted as-is
    Single(Event),
    /// A virtual occurrence of a recurring master.
    ///
    /// `resolved_start`/`resolved_end` are the master's own interval shifted by a
    /// whole number of periods, so the duration is exactly the master's duration.
    /// All descriptive fields (title, description, tags...) are read through to the
    /// master: there is no per-occurrence override.
    Occurrence {
        master: Event,
        resolved_start: DateTime<Utc>,
        resolved_end: DateTime<Utc>,
    },
}

impl EventInstance {
    /// The master event this instance was derived from (or is)
    pub fn master(&self) -> &Event {
        match self {
            EventInstance::Single(event) => event,
            EventInstance::Occurrence { master, .. } => master,
        }
    }

    /// The id of the underlying master. Occurrences have no identity of their own
    pub fn id(&self) -> &EventId {
        self.master().id()
    }

    pub fn title(&self) -> &str {
        self.master().title()
    }

    /// When this instance actually starts
    pub fn start(&self) -> DateTime<Utc> {
        match self {
            EventInstance::Single(event) => event.start_time(),
            EventInstance::Occurrence { resolved_start, .. } => *resolved_start,
        }
    }

    /// When this instance actually ends
    pub fn end(&self) -> DateTime<Utc> {
        match self {
            EventInstance::Single(event) => event.end_time(),
            EventInstance::Occurrence { resolved_end, .. } => *resolved_end,
        }
    }

    pub fn is_occurrence(&self) -> bool {
        match self {
            EventInstance::Occurrence { .. } => true,
            _ => false,
        }
    }

    /// The start time of the whole series, i.e. the master's own start time.
    /// `None` for non-recurring instances, where it would carry no extra information
    pub fn series_start_time(&self) -> Option<DateTime<Utc>> {
        match self {
            EventInstance::Single(_) => None,
            EventInstance::Occurrence { master, .. } => Some(master.start_time()),
        }
    }

    /// Flatten this instance into the serializable read shape
    pub fn to_record(&self) -> InstanceRecord {
        let master = self.master();
        InstanceRecord {
            id: *master.id(),
            title: master.title().to_string(),
            start: self.start(),
            end: self.end(),
            description: master.description().map(|d| d.to_string()),
            location: master.location().map(|l| l.to_string()),
            tags: master.tags(),
            is_occurrence: self.is_occurrence(),
            series_start_time: self.series_start_time(),
            recurrence_rule: master.recurrence_rule().map(|r| r.to_string()),
        }
    }
}

/// The flat, serializable shape of an [`EventInstance`], as handed to API layers.
///
/// `recurrence_rule` round-trips the exact text that was submitted on the write side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: EventId,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub tags: Vec<String>,
    pub is_occurrence: bool,
    pub series_start_time: Option<DateTime<Utc>>,
    pub recurrence_rule: Option<String>,
}

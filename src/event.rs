//! Calendar events (master records)

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The unique identifier of an [`Event`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Generate a random EventId
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.0)
    }
}

/// The unique identifier of the user owning an [`Event`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a random UserId
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.0)
    }
}

/// The error returned when an event would end before it starts
#[derive(Debug, Error)]
#[error("event would end ({end}) before it starts ({start})")]
pub struct EndBeforeStart {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A calendar event, as persisted.
///
/// This is always a *master* record: when the event carries a recurrence rule, its
/// concrete occurrences are virtual, they are recomputed on every query by
/// [`expand`](crate::expand::expand) and never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,

    /// The user this event belongs to
    owner: UserId,

    title: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    description: Option<String>,
    location: Option<String>,

    /// The set of labels attached to this event, flattened to a comma-separated string
    tags: String,

    /// An optional recurrence rule, in the restricted RRULE grammar handled by
    /// [`crate::rrule`]. It is kept as the verbatim text the caller submitted, and
    /// returned unchanged on reads.
    recurrence_rule: Option<String>,

    /// Whether a reminder has already been sent for this event.
    /// Note this is tracked per master, not per occurrence: once a recurring
    /// series has been reminded once, no later occurrence triggers a reminder.
    reminder_sent: bool,

    /// Reserved for series linkage. Always `None` on masters; the current
    /// expansion logic never sets it.
    parent_event_id: Option<EventId>,
}

impl Event {
    /// Create a brand new event. This will pick a new (random) event ID.
    pub fn new(
        owner: UserId,
        title: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self, EndBeforeStart> {
        if end_time < start_time {
            return Err(EndBeforeStart {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            id: EventId::random(),
            owner,
            title,
            start_time,
            end_time,
            description: None,
            location: None,
            tags: String::new(),
            recurrence_rule: None,
            reminder_sent: false,
            parent_event_id: None,
        })
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }
    pub fn owner(&self) -> &UserId {
        &self.owner
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }
    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
    pub fn recurrence_rule(&self) -> Option<&str> {
        self.recurrence_rule.as_deref()
    }
    pub fn reminder_sent(&self) -> bool {
        self.reminder_sent
    }
    pub fn parent_event_id(&self) -> Option<&EventId> {
        self.parent_event_id.as_ref()
    }

    /// How long this event lasts. Every occurrence of a recurring series keeps this exact duration.
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// The labels attached to this event, parsed back from their flattened form
    pub fn tags(&self) -> Vec<String> {
        self.tags
            .split(',')
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(|tag| tag.to_string())
            .collect()
    }

    /// The flattened form of the labels, as persisted
    pub fn tags_raw(&self) -> &str {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags()
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(tag))
    }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
    }

    /// Move the event. This rejects intervals that would end before they start
    pub fn set_times(
        &mut self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<(), EndBeforeStart> {
        if end_time < start_time {
            return Err(EndBeforeStart {
                start: start_time,
                end: end_time,
            });
        }
        self.start_time = start_time;
        self.end_time = end_time;
        Ok(())
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    pub fn set_location(&mut self, location: Option<String>) {
        self.location = location;
    }

    /// Replace the set of labels. They are flattened to a single comma-separated string
    pub fn set_tags(&mut self, tags: &[&str]) {
        self.tags = tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .collect::<Vec<_>>()
            .join(",");
    }

    /// Set (or clear, with `None`) the recurrence rule.
    ///
    /// The text is persisted verbatim. Since occurrences are virtual, the occurrence
    /// set changes on the very next query, there is no state to migrate.
    pub fn set_recurrence_rule(&mut self, rule: Option<String>) {
        self.recurrence_rule = rule;
    }

    pub fn set_reminder_sent(&mut self, sent: bool) {
        self.reminder_sent = sent;
    }
}

//! Interfaces of the external collaborators this crate drives.
//!
//! The core never talks to a database or a mail server itself: it goes through
//! these traits, so the surrounding application decides what actually backs them.
//! [`LocalStore`](crate::store::LocalStore) is a ready-made [`EventStore`] for
//! local operation and tests.

use std::error::Error;

use async_trait::async_trait;

use crate::event::{Event, EventId, UserId};
use crate::query::SearchFilter;
use crate::window::TimeWindow;

/// The error type collaborators report. The core wraps it into its own typed
/// errors at the boundary, so implementations can use whatever error type suits them
pub type CollaboratorError = Box<dyn Error + Send + Sync>;

/// Persistence of master events.
///
/// Implementations must hand back every row normalized into one canonical
/// [`Event`] value; the core never branches on storage-level record shapes.
/// A store used concurrently with the reminder scan should guard `reminder_sent`
/// updates with its own transaction discipline (e.g. optimistic concurrency),
/// since this crate takes no locks of its own.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Every event of `owner` that may produce instances within `window`: a
    /// non-recurring event whose interval overlaps the window, or a recurring
    /// master starting no later than the window's end. Whether a recurring
    /// candidate really yields in-window occurrences is the expander's call, not
    /// the store's
    async fn fetch_candidates(
        &self,
        owner: &UserId,
        window: &TimeWindow,
    ) -> Result<Vec<Event>, CollaboratorError>;

    async fn fetch_by_id(&self, id: &EventId) -> Result<Option<Event>, CollaboratorError>;

    /// Insert or replace an event. Since occurrences are virtual, replacing a
    /// master (including its recurrence rule) is the complete update, nothing
    /// else needs touching
    async fn save(&mut self, event: Event) -> Result<(), CollaboratorError>;

    /// Delete an event. Deleting a recurring master atomically removes its whole
    /// series: occurrences have no storage of their own
    async fn delete(&mut self, id: &EventId) -> Result<(), CollaboratorError>;

    /// Every event (of any user) starting within `window` whose reminder has not
    /// been sent yet, paired with the owner's recipient address
    async fn fetch_due_for_reminder(
        &self,
        window: &TimeWindow,
    ) -> Result<Vec<(Event, String)>, CollaboratorError>;

    /// Masters of `owner` matching `filter` (keyword, tags, date bounds),
    /// without any occurrence expansion
    async fn search(
        &self,
        owner: &UserId,
        filter: &SearchFilter,
    ) -> Result<Vec<Event>, CollaboratorError>;
}

/// Outbound notification transport (e.g. a mailer).
///
/// A send should be bounded in time by the implementation or by the caller; the
/// reminder scanner additionally wraps every send in its own timeout and treats a
/// timed-out send as a failure, never as a success.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(
        &mut self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), CollaboratorError>;
}

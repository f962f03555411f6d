//! Windowed range queries: candidate selection, expansion, merging and ordering

use chrono::{DateTime, Utc};
use log::debug;
use thiserror::Error;

use crate::event::{Event, UserId};
use crate::expand::expand;
use crate::instance::{EventInstance, InstanceRecord};
use crate::traits::{CollaboratorError, EventStore};
use crate::window::{TimeWindow, WindowError};

/// The error returned by range queries and searches
#[derive(Debug, Error)]
pub enum QueryError {
    /// The request had a missing or unreadable window bound. Raised before any
    /// store access
    #[error("rejected query window: {0}")]
    WindowRequired(#[from] WindowError),
    /// The persistence layer failed. Not retried here; retry policy belongs to
    /// the store collaborator
    #[error("event store failure: {0}")]
    Store(#[source] CollaboratorError),
}

/// Criteria for a master-event search (no occurrence expansion).
///
/// All present criteria must match. `text` is a case-insensitive substring match
/// over title and description; `tags` matches events carrying at least one of the
/// given labels.
#[derive(Clone, Debug, Default)]
pub struct SearchFilter {
    pub text: Option<String>,
    pub tags: Vec<String>,
    pub starts_after: Option<DateTime<Utc>>,
    pub ends_before: Option<DateTime<Utc>>,
}

/// Answers windowed read requests over one [`EventStore`].
///
/// Queries are synchronous pipelines (one bounded store fetch, then sequential
/// in-memory expansion); the async signatures only come from the store collaborator.
pub struct RangeQueryEngine<S: EventStore> {
    store: S,
}

impl<S: EventStore> RangeQueryEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// All instances of `owner`'s events within `window`, fully expanded.
    ///
    /// Results are sorted by resolved start time; ties (distinct events starting
    /// at the same instant) are broken by event id, so two identical queries
    /// against an unchanged store return identical, identically-ordered results.
    pub async fn query(
        &self,
        owner: &UserId,
        window: &TimeWindow,
    ) -> Result<Vec<EventInstance>, QueryError> {
        let candidates = self
            .store
            .fetch_candidates(owner, window)
            .await
            .map_err(QueryError::Store)?;
        debug!(
            "Range query for user {}: {} candidate event(s)",
            owner,
            candidates.len()
        );

        let mut instances: Vec<EventInstance> = Vec::new();
        for candidate in &candidates {
            instances.extend(expand(candidate, window));
        }

        instances.sort_by(|left, right| {
            left.start()
                .cmp(&right.start())
                .then_with(|| left.id().cmp(right.id()))
        });

        Ok(instances)
    }

    /// Like [`Self::query`], but building the window from the textual bounds of a
    /// read request. Both bounds are mandatory and are validated before any store
    /// access; a date-only end bound covers its whole day
    pub async fn query_bounds(
        &self,
        owner: &UserId,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<EventInstance>, QueryError> {
        let window = TimeWindow::from_query_bounds(start, end)?;
        self.query(owner, &window).await
    }

    /// Like [`Self::query`], flattened to the serializable read shape
    pub async fn query_records(
        &self,
        owner: &UserId,
        window: &TimeWindow,
    ) -> Result<Vec<InstanceRecord>, QueryError> {
        let instances = self.query(owner, window).await?;
        Ok(instances.iter().map(|instance| instance.to_record()).collect())
    }

    /// Search `owner`'s master events by keyword, tags and date bounds.
    ///
    /// This intentionally does not expand recurring events: a search has no
    /// window to bound an expansion, so it finds masters only
    pub async fn search(
        &self,
        owner: &UserId,
        filter: &SearchFilter,
    ) -> Result<Vec<Event>, QueryError> {
        self.store
            .search(owner, filter)
            .await
            .map_err(QueryError::Store)
    }
}

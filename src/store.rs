//! A local, optionally file-backed event store.
//!
//! This is the reference [`EventStore`] implementation: it keeps everything in
//! memory, can persist itself to a JSON file, and implements the exact candidate
//! selection predicates the query engine and the reminder scanner rely on. It is
//! used both for local single-user operation and as the store in tests.

use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::event::{Event, EventId, UserId};
use crate::query::SearchFilter;
use crate::traits::{CollaboratorError, EventStore};
use crate::window::TimeWindow;

/// An [`EventStore`] holding its events in memory, with optional JSON file persistence
#[derive(Debug, Default, PartialEq)]
pub struct LocalStore {
    backing_file: Option<PathBuf>,
    data: StoreData,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct StoreData {
    events: HashMap<EventId, Event>,
    /// Where each user's reminders go (e.g. an email address)
    recipients: HashMap<UserId, String>,
}

impl LocalStore {
    /// An empty, purely in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store that [`Self::save_to_file`] will persist to `path`
    pub fn with_backing_file(path: &Path) -> Self {
        Self {
            backing_file: Some(PathBuf::from(path)),
            data: StoreData::default(),
        }
    }

    /// Load a store from the content of a valid backing file if it exists.
    /// Returns an error otherwise
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let data = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            }
            Ok(file) => serde_json::from_reader(file)?,
        };

        Ok(Self {
            backing_file: Some(PathBuf::from(path)),
            data,
        })
    }

    /// Store the current contents to the backing file, if one is set
    pub fn save_to_file(&self) {
        let path = match &self.backing_file {
            None => return,
            Some(path) => path,
        };

        let file = match std::fs::File::create(path) {
            Err(err) => {
                warn!("Unable to save file {:?}: {}", path, err);
                return;
            }
            Ok(f) => f,
        };

        if let Err(err) = serde_json::to_writer(file, &self.data) {
            warn!("Unable to serialize: {}", err);
        }
    }

    /// Register where a user's reminders should be sent
    pub fn set_recipient(&mut self, owner: UserId, address: String) {
        self.data.recipients.insert(owner, address);
    }

    pub fn add_event(&mut self, event: Event) {
        self.data.events.insert(*event.id(), event);
    }

    pub fn event_count(&self) -> usize {
        self.data.events.len()
    }

    pub fn get_event(&self, id: &EventId) -> Option<&Event> {
        self.data.events.get(id)
    }
}

#[async_trait]
impl EventStore for LocalStore {
    async fn fetch_candidates(
        &self,
        owner: &UserId,
        window: &TimeWindow,
    ) -> Result<Vec<Event>, CollaboratorError> {
        let mut found: Vec<Event> = self
            .data
            .events
            .values()
            .filter(|event| event.owner() == owner && event.parent_event_id().is_none())
            .filter(|event| match event.recurrence_rule() {
                // A recurring master only needs to start before the window closes;
                // whether its rule yields in-window occurrences is the expander's call
                Some(_) => event.start_time() <= window.end(),
                // A non-recurring event must itself reach into the window.
                // This filter may be lenient (bounds inclusive), the expander
                // re-tests with strict overlap anyway
                None => event.start_time() <= window.end() && event.end_time() >= window.start(),
            })
            .cloned()
            .collect();
        found.sort_by_key(|event| (event.start_time(), *event.id()));
        Ok(found)
    }

    async fn fetch_by_id(&self, id: &EventId) -> Result<Option<Event>, CollaboratorError> {
        Ok(self.data.events.get(id).cloned())
    }

    async fn save(&mut self, event: Event) -> Result<(), CollaboratorError> {
        self.data.events.insert(*event.id(), event);
        Ok(())
    }

    async fn delete(&mut self, id: &EventId) -> Result<(), CollaboratorError> {
        if self.data.events.remove(id).is_none() {
            return Err("no event for this id".into());
        }
        Ok(())
    }

    async fn fetch_due_for_reminder(
        &self,
        window: &TimeWindow,
    ) -> Result<Vec<(Event, String)>, CollaboratorError> {
        let mut due: Vec<(Event, String)> = Vec::new();
        for event in self.data.events.values() {
            if event.reminder_sent() || !window.contains(event.start_time()) {
                continue;
            }
            match self.data.recipients.get(event.owner()) {
                Some(address) => due.push((event.clone(), address.clone())),
                None => {
                    warn!(
                        "No recipient address for user {}; skipping the reminder for event {}",
                        event.owner(),
                        event.id()
                    );
                }
            }
        }
        due.sort_by_key(|(event, _)| (event.start_time(), *event.id()));
        Ok(due)
    }

    async fn search(
        &self,
        owner: &UserId,
        filter: &SearchFilter,
    ) -> Result<Vec<Event>, CollaboratorError> {
        let text = filter.text.as_ref().map(|text| text.to_lowercase());

        let mut found: Vec<Event> = self
            .data
            .events
            .values()
            .filter(|event| event.owner() == owner)
            .filter(|event| match &text {
                None => true,
                Some(needle) => {
                    event.title().to_lowercase().contains(needle)
                        || event
                            .description()
                            .map(|description| description.to_lowercase().contains(needle))
                            .unwrap_or(false)
                }
            })
            .filter(|event| {
                filter.tags.is_empty() || filter.tags.iter().any(|tag| event.has_tag(tag))
            })
            .filter(|event| match filter.starts_after {
                None => true,
                Some(bound) => event.start_time() >= bound,
            })
            .filter(|event| match filter.ends_before {
                None => true,
                Some(bound) => event.end_time() <= bound,
            })
            .cloned()
            .collect();
        found.sort_by_key(|event| (event.start_time(), *event.id()));
        Ok(found)
    }
}

//! Shared helpers to build test scenarios: populated stores and a mockable
//! notification sender.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use agenda_core::traits::{CollaboratorError, NotificationSender};
use agenda_core::{Event, LocalStore, UserId};

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

pub fn one_hour_event(owner: UserId, title: &str, start: DateTime<Utc>) -> Event {
    Event::new(owner, title.to_string(), start, start + Duration::hours(1)).unwrap()
}

pub fn recurring_event(owner: UserId, title: &str, start: DateTime<Utc>, duration: Duration, rule: &str) -> Event {
    let mut event = Event::new(owner, title.to_string(), start, start + duration).unwrap();
    event.set_recurrence_rule(Some(rule.to_string()));
    event
}

/// A store with one registered user, ready to receive events
pub fn store_for(owner: UserId) -> LocalStore {
    let mut store = LocalStore::new();
    store.set_recipient(owner, "user@example.com".to_string());
    store
}

/// A notification sender that records what it sent, and can be told to fail.
///
/// To make it fail _n_ times after _m_ initial successes, set `behaviour` to
/// `(m, n)`. An optional artificial delay simulates a slow transport, for
/// exercising the scanner's send timeout.
pub struct MockSender {
    /// Every successfully "sent" notification, as (recipient, subject, body)
    pub sent: Vec<(String, String, String)>,
    behaviour: (u32, u32),
    delay: Option<std::time::Duration>,
}

impl MockSender {
    pub fn reliable() -> Self {
        Self {
            sent: Vec::new(),
            behaviour: (0, 0),
            delay: None,
        }
    }

    /// All sends fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            sent: Vec::new(),
            behaviour: (0, n_fails),
            delay: None,
        }
    }

    pub fn slow(delay: std::time::Duration) -> Self {
        Self {
            sent: Vec::new(),
            behaviour: (0, 0),
            delay: Some(delay),
        }
    }

    pub fn recipients(&self) -> Vec<&str> {
        self.sent.iter().map(|(recipient, _, _)| recipient.as_str()).collect()
    }

    pub fn subjects(&self) -> Vec<&str> {
        self.sent.iter().map(|(_, subject, _)| subject.as_str()).collect()
    }
}

#[async_trait]
impl NotificationSender for MockSender {
    async fn send(
        &mut self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), CollaboratorError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let (remaining_successes, remaining_failures) = self.behaviour;
        if remaining_successes == 0 && remaining_failures > 0 {
            self.behaviour = (0, remaining_failures - 1);
            return Err(format!(
                "Mocked behaviour requires this send to fail this time ({:?})",
                self.behaviour
            )
            .into());
        }
        if remaining_successes > 0 {
            self.behaviour = (remaining_successes - 1, remaining_failures);
        }

        self.sent.push((
            recipient.to_string(),
            subject.to_string(),
            body.to_string(),
        ));
        Ok(())
    }
}

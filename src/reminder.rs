//! The periodic reminder scan.
//!
//! Whatever triggers the scan (a cron job, a timer task...) is out of scope; this
//! module only provides the scan itself, as an idempotent operation taking `now`
//! explicitly so tests can supply fixed instants. The scan assumes it is the only
//! active scanner: running several concurrently without a claim mechanism can
//! duplicate notifications.

use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use thiserror::Error;

use crate::event::Event;
use crate::traits::{EventStore, NotificationSender};
use crate::window::TimeWindow;

/// Tolerance margins of the reminder scan.
///
/// The window `[now - grace_before, now + lookahead]` keeps a slightly late (or
/// early) trigger from missing events.
#[derive(Clone, Copy, Debug)]
pub struct ReminderConfig {
    /// How far behind `now` the scan still picks events up
    pub grace_before: Duration,
    /// How far ahead of `now` the scan reminds in advance
    pub lookahead: Duration,
    /// Bound on each individual notification send. A timed-out send counts as a
    /// failure and is retried on the next scan
    pub send_timeout: std::time::Duration,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            grace_before: Duration::minutes(10),
            lookahead: Duration::hours(1),
            send_timeout: std::time::Duration::from_secs(30),
        }
    }
}

/// What a reminder scan did, in aggregate. Individual send failures are never
/// surfaced to the caller, they only show up as `processed - sent`
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScanOutcome {
    /// Due candidates considered
    pub processed: usize,
    /// Notifications sent (and durably flagged) during this scan
    pub sent: usize,
}

/// The only error a scan can end with: losing the store is fatal, nothing else is
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("event store failure: {0}")]
    Store(#[source] crate::traits::CollaboratorError),
}

/// Scans for due, not-yet-notified events and dispatches notifications.
pub struct ReminderScanner<S, N>
where
    S: EventStore,
    N: NotificationSender,
{
    store: S,
    sender: N,
    config: ReminderConfig,
}

impl<S, N> ReminderScanner<S, N>
where
    S: EventStore,
    N: NotificationSender,
{
    pub fn new(store: S, sender: N) -> Self {
        Self::with_config(store, sender, ReminderConfig::default())
    }

    pub fn with_config(store: S, sender: N, config: ReminderConfig) -> Self {
        Self {
            store,
            sender,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn sender(&self) -> &N {
        &self.sender
    }

    /// Run one reminder scan around `now`.
    ///
    /// Every event starting within the tolerance window whose reminder has not
    /// been sent yet gets one notification attempt. On success, `reminder_sent`
    /// is persisted *before* moving to the next candidate, so a crash mid-batch
    /// leaves sent events flagged and unsent ones retryable. On failure (or
    /// timeout), the flag stays false and the event remains a candidate for the
    /// next scan: delivery is at-least-once, never a silent drop.
    ///
    /// Safe to call repeatedly: a second scan with no new qualifying events sends
    /// nothing, since every success has been flagged already.
    pub async fn scan_and_notify(&mut self, now: DateTime<Utc>) -> Result<ScanOutcome, ScanError> {
        let window = TimeWindow::around(now, self.config.grace_before, self.config.lookahead);
        let due = self
            .store
            .fetch_due_for_reminder(&window)
            .await
            .map_err(ScanError::Store)?;

        let mut outcome = ScanOutcome::default();
        for (mut event, recipient) in due {
            outcome.processed += 1;

            let subject = format!("Reminder: {}", event.title());
            let body = reminder_body(&event);

            let send = tokio::time::timeout(
                self.config.send_timeout,
                self.sender.send(&recipient, &subject, &body),
            )
            .await;

            match send {
                Ok(Ok(())) => {
                    event.set_reminder_sent(true);
                    self.store.save(event).await.map_err(ScanError::Store)?;
                    outcome.sent += 1;
                }
                Ok(Err(err)) => {
                    warn!(
                        "Unable to send a reminder for event {} to {}: {}. It will be retried on the next scan",
                        event.id(), recipient, err
                    );
                }
                Err(_elapsed) => {
                    warn!(
                        "Sending a reminder for event {} to {} timed out. It will be retried on the next scan",
                        event.id(), recipient
                    );
                }
            }
        }

        info!(
            "Reminder scan at {}: processed {} event(s), sent {} reminder(s)",
            now, outcome.processed, outcome.sent
        );
        Ok(outcome)
    }
}

fn reminder_body(event: &Event) -> String {
    format!(
        "Hello,\n\nThis is a reminder for your event:\n\nEvent: {}\nStarts at: {} UTC\nDescription: {}",
        event.title(),
        event.start_time().format("%Y-%m-%d %H:%M"),
        event.description().unwrap_or("N/A"),
    )
}

//! End-to-end tests of the reminder scan: the tolerance window, exactly-once
//! flagging on success, and at-least-once retries on failure.

mod scenarii;

use chrono::Duration;

use agenda_core::reminder::{ReminderConfig, ReminderScanner, ScanOutcome};
use agenda_core::{Event, UserId};
use scenarii::{one_hour_event, utc, MockSender};

fn due_events(owner: UserId) -> (Event, Event, Event) {
    // Around now = 09:55 with the default margins, the window is [09:45, 10:55]
    let just_started = one_hour_event(owner, "just started", utc(2024, 1, 1, 9, 50));
    let upcoming = one_hour_event(owner, "upcoming", utc(2024, 1, 1, 10, 50));
    let long_past = one_hour_event(owner, "long past", utc(2024, 1, 1, 8, 0));
    (just_started, upcoming, long_past)
}

#[tokio::test]
async fn test_scan_window_tolerance() {
    let _ = env_logger::builder().is_test(true).try_init();

    let owner = UserId::random();
    let mut store = scenarii::store_for(owner);
    let (just_started, upcoming, long_past) = due_events(owner);
    store.add_event(just_started);
    store.add_event(upcoming);
    store.add_event(long_past);

    let mut scanner = ReminderScanner::new(store, MockSender::reliable());
    let outcome = scanner.scan_and_notify(utc(2024, 1, 1, 9, 55)).await.unwrap();

    // The event slightly in the past and the upcoming one are both caught;
    // the 08:00 one is outside the grace period
    assert_eq!(outcome, ScanOutcome { processed: 2, sent: 2 });
    assert_eq!(
        scanner.sender().subjects(),
        vec!["Reminder: just started", "Reminder: upcoming"]
    );
    assert_eq!(
        scanner.sender().recipients(),
        vec!["user@example.com", "user@example.com"]
    );
}

#[tokio::test]
async fn test_second_scan_sends_nothing() {
    let owner = UserId::random();
    let mut store = scenarii::store_for(owner);
    store.add_event(one_hour_event(owner, "meeting", utc(2024, 1, 1, 10, 0)));

    let mut scanner = ReminderScanner::new(store, MockSender::reliable());
    let now = utc(2024, 1, 1, 9, 55);

    let first = scanner.scan_and_notify(now).await.unwrap();
    assert_eq!(first, ScanOutcome { processed: 1, sent: 1 });

    // Immediately re-running the scan finds the flag already set
    let second = scanner.scan_and_notify(now).await.unwrap();
    assert_eq!(second, ScanOutcome { processed: 0, sent: 0 });
    assert_eq!(scanner.sender().sent.len(), 1);
}

#[tokio::test]
async fn test_failed_send_is_retried_on_the_next_scan() {
    let _ = env_logger::builder().is_test(true).try_init();

    let owner = UserId::random();
    let mut store = scenarii::store_for(owner);
    let event = one_hour_event(owner, "flaky delivery", utc(2024, 1, 1, 10, 0));
    let id = *event.id();
    store.add_event(event);

    // The first send fails, every following one succeeds
    let mut scanner = ReminderScanner::new(store, MockSender::fail_now(1));
    let now = utc(2024, 1, 1, 9, 55);

    // The failure is not surfaced as an error, only reflected in the counts
    let first = scanner.scan_and_notify(now).await.unwrap();
    assert_eq!(first, ScanOutcome { processed: 1, sent: 0 });
    assert_eq!(scanner.store().get_event(&id).unwrap().reminder_sent(), false);

    let second = scanner.scan_and_notify(now).await.unwrap();
    assert_eq!(second, ScanOutcome { processed: 1, sent: 1 });
    assert_eq!(scanner.store().get_event(&id).unwrap().reminder_sent(), true);

    let third = scanner.scan_and_notify(now).await.unwrap();
    assert_eq!(third, ScanOutcome { processed: 0, sent: 0 });
    assert_eq!(scanner.sender().sent.len(), 1);
}

#[tokio::test]
async fn test_one_failure_does_not_block_the_rest_of_the_batch() {
    let owner = UserId::random();
    let mut store = scenarii::store_for(owner);
    store.add_event(one_hour_event(owner, "first", utc(2024, 1, 1, 10, 0)));
    store.add_event(one_hour_event(owner, "second", utc(2024, 1, 1, 10, 20)));

    // Only the first send of the batch fails
    let mut scanner = ReminderScanner::new(store, MockSender::fail_now(1));
    let outcome = scanner.scan_and_notify(utc(2024, 1, 1, 9, 55)).await.unwrap();

    assert_eq!(outcome, ScanOutcome { processed: 2, sent: 1 });
    assert_eq!(scanner.sender().subjects(), vec!["Reminder: second"]);
}

#[tokio::test]
async fn test_timed_out_send_counts_as_a_failure() {
    let _ = env_logger::builder().is_test(true).try_init();

    let owner = UserId::random();
    let mut store = scenarii::store_for(owner);
    let event = one_hour_event(owner, "slow transport", utc(2024, 1, 1, 10, 0));
    let id = *event.id();
    store.add_event(event);

    let config = ReminderConfig {
        send_timeout: std::time::Duration::from_millis(20),
        ..ReminderConfig::default()
    };
    let slow_sender = MockSender::slow(std::time::Duration::from_millis(200));
    let mut scanner = ReminderScanner::with_config(store, slow_sender, config);

    let outcome = scanner.scan_and_notify(utc(2024, 1, 1, 9, 55)).await.unwrap();
    assert_eq!(outcome, ScanOutcome { processed: 1, sent: 0 });
    // The flag must stay clear so the next scan retries
    assert_eq!(scanner.store().get_event(&id).unwrap().reminder_sent(), false);
}

#[tokio::test]
async fn test_custom_margins_are_honored() {
    let owner = UserId::random();
    let mut store = scenarii::store_for(owner);
    store.add_event(one_hour_event(owner, "far ahead", utc(2024, 1, 1, 12, 0)));

    // Not in reach of the default one-hour lookahead...
    let mut scanner = ReminderScanner::new(store, MockSender::reliable());
    let now = utc(2024, 1, 1, 9, 55);
    assert_eq!(
        scanner.scan_and_notify(now).await.unwrap(),
        ScanOutcome { processed: 0, sent: 0 }
    );

    // ...but a wider configuration picks it up
    let config = ReminderConfig {
        lookahead: Duration::hours(3),
        ..ReminderConfig::default()
    };
    let mut store = scenarii::store_for(owner);
    store.add_event(one_hour_event(owner, "far ahead", utc(2024, 1, 1, 12, 0)));
    let mut scanner = ReminderScanner::with_config(store, MockSender::reliable(), config);
    assert_eq!(
        scanner.scan_and_notify(now).await.unwrap(),
        ScanOutcome { processed: 1, sent: 1 }
    );
}

//! Time windows, used to bound both range queries and the reminder scan

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The error returned for missing or unreadable window bounds.
///
/// It is raised while building the window, i.e. always *before* any store access.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum WindowError {
    #[error("both window bounds are required")]
    MissingBound,
    #[error("invalid window bound {0:?}")]
    InvalidBound(String),
}

/// A closed time interval `[start, end]`.
///
/// Windows bound all the work this crate does: rule evaluation never walks past a
/// window's end, so even unbounded recurrence rules produce finite results.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window from two instants. An inverted window (`end < start`) is
    /// allowed and simply matches nothing
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Build the tolerance window around `now` used by the reminder scan
    pub fn around(now: DateTime<Utc>, before: Duration, after: Duration) -> Self {
        Self {
            start: now - before,
            end: now + after,
        }
    }

    /// Build a window from the textual bounds of a read request.
    ///
    /// Both bounds are mandatory; a missing one fails with
    /// [`WindowError::MissingBound`] so callers can reject the request before
    /// touching the store. Bounds are parsed leniently (see [`parse_bound`]); when
    /// the *end* bound carries no time of day, it is pushed to the very end of that
    /// date, so whole-day queries behave intuitively.
    pub fn from_query_bounds(start: Option<&str>, end: Option<&str>) -> Result<Self, WindowError> {
        let start = start.ok_or(WindowError::MissingBound)?;
        let end = end.ok_or(WindowError::MissingBound)?;

        let (start, _) = parse_bound(start)?;
        let (end, date_only) = parse_bound(end)?;
        let end = if date_only {
            // 23:59:59.999999 of that date
            end + Duration::days(1) - Duration::microseconds(1)
        } else {
            end
        };

        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether the interval `[start, end)` strictly overlaps this window.
    ///
    /// "Strictly" means merely touching does not count: an interval whose end
    /// equals the window's start (or vice versa) is excluded.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }

    /// Whether an instant falls within this window (both bounds inclusive)
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// This window with its lower bound moved `amount` earlier.
    /// Used to catch occurrences that begin before a window but are still running when it opens
    pub fn widened_down_by(&self, amount: Duration) -> Self {
        Self {
            start: self.start - amount,
            end: self.end,
        }
    }
}

/// Parse one window bound, leniently.
///
/// Accepts RFC 3339 instants, naive date-times with or without fractional seconds
/// (taken as UTC), and bare dates. Returns the instant and whether the text was
/// date-only (which callers may round up to the end of the day).
pub fn parse_bound(text: &str) -> Result<(DateTime<Utc>, bool), WindowError> {
    let text = text.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Ok((instant.with_timezone(&Utc), false));
    }

    const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];
    for format in &DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok((Utc.from_utc_datetime(&naive), false));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap();
        return Ok((Utc.from_utc_datetime(&midnight), true));
    }

    Err(WindowError::InvalidBound(text.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bound_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap();
        for text in &[
            "2024-01-02T10:30:00Z",
            "2024-01-02T10:30:00+00:00",
            "2024-01-02T11:30:00+01:00",
            "2024-01-02T10:30:00",
            "2024-01-02T10:30:00.000",
        ] {
            let (instant, date_only) = parse_bound(text).unwrap();
            assert_eq!(instant, expected, "parsing {}", text);
            assert!(!date_only);
        }

        let (instant, date_only) = parse_bound("2024-01-02").unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        assert!(date_only);

        assert!(parse_bound("not-a-date").is_err());
    }

    #[test]
    fn test_date_only_end_bound_covers_the_whole_day() {
        let window = TimeWindow::from_query_bounds(Some("2024-01-02"), Some("2024-01-02")).unwrap();
        assert_eq!(window.start(), Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        // An event late that evening is still in the window
        assert!(window.contains(Utc.with_ymd_and_hms(2024, 1, 2, 23, 59, 59).unwrap()));
        // But midnight of the next day is not
        assert!(!window.contains(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_missing_bounds_are_rejected() {
        assert_eq!(
            TimeWindow::from_query_bounds(None, Some("2024-01-02")),
            Err(WindowError::MissingBound)
        );
        assert_eq!(
            TimeWindow::from_query_bounds(Some("2024-01-02"), None),
            Err(WindowError::MissingBound)
        );
        assert_eq!(
            TimeWindow::from_query_bounds(None, None),
            Err(WindowError::MissingBound)
        );
    }

    #[test]
    fn test_strict_overlap() {
        let window = TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap(),
        );

        let nine = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap();
        let ten = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        let eleven = Utc.with_ymd_and_hms(2024, 1, 2, 11, 0, 0).unwrap();
        let noon = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        let one = Utc.with_ymd_and_hms(2024, 1, 2, 13, 0, 0).unwrap();

        assert!(window.overlaps(ten, eleven));
        assert!(window.overlaps(nine, eleven));
        assert!(window.overlaps(eleven, one));
        // Touching intervals do not overlap
        assert!(!window.overlaps(nine, ten));
        assert!(!window.overlaps(noon, one));
    }
}

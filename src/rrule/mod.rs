//! Recurrence rule parsing and evaluation
//!
//! This module turns a rule text plus an anchor instant (a master event's start
//! time) into the concrete start times of the series that fall inside a query
//! window. Evaluation is a pure function of its inputs: calling it twice with the
//! same arguments yields the same sequence, nothing is cached between calls, and
//! the produced sequence is always finite, even for rules with neither `COUNT`
//! nor `UNTIL` (those are clipped to the window).

mod parser;
pub use parser::{Frequency, RecurrenceRule, RuleParseError};

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

/// Parse `rule_text` and list the start times of the series anchored at `anchor`
/// that fall within `[window_start, window_end]` (both bounds inclusive).
///
/// See [`RecurrenceRule::occurrences_between`] for the evaluation semantics.
pub fn occurrences_between(
    rule_text: &str,
    anchor: DateTime<Utc>,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>, RuleParseError> {
    let rule: RecurrenceRule = rule_text.parse()?;
    Ok(rule.occurrences_between(anchor, window_start, window_end))
}

impl RecurrenceRule {
    /// List the start times of this series that fall within
    /// `[window_start, window_end]` (inclusive), in ascending order.
    ///
    /// The series is anchored at `anchor`: for `DAILY`/`MONTHLY`/`YEARLY` rules and
    /// for `WEEKLY` rules without `BYDAY`, the anchor itself is the first
    /// occurrence. A `WEEKLY` rule with `BYDAY` instead emits every listed weekday
    /// (at the anchor's time of day) of every `INTERVAL`-th week, starting with the
    /// anchor's own week; its first occurrence is the first matching day at or
    /// after the anchor.
    ///
    /// `COUNT` caps the whole series, so occurrences *before* the window still
    /// consume it. `UNTIL` is inclusive. `MONTHLY`/`YEARLY` slots that name a day
    /// absent from the target month (e.g. Jan 31st in February) are skipped and do
    /// not consume `COUNT`.
    pub fn occurrences_between(
        &self,
        anchor: DateTime<Utc>,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Vec<DateTime<Utc>> {
        let mut found = Vec::new();
        if window_end < window_start {
            return found;
        }

        // Nothing may start later than this, so evaluation always terminates
        let horizon = match self.until() {
            Some(until) if until < window_end => until,
            _ => window_end,
        };
        let mut budget = Budget::new(self.count());

        match self.frequency() {
            Frequency::Daily => {
                let step = Duration::days(i64::from(self.interval()));
                self.collect_fixed_step(anchor, step, window_start, horizon, &mut budget, &mut found);
            }
            Frequency::Weekly if self.by_day().is_empty() => {
                let step = Duration::weeks(i64::from(self.interval()));
                self.collect_fixed_step(anchor, step, window_start, horizon, &mut budget, &mut found);
            }
            Frequency::Weekly => {
                self.collect_weekly_by_day(anchor, window_start, horizon, &mut budget, &mut found);
            }
            Frequency::Monthly => {
                self.collect_calendar_step(anchor, u64::from(self.interval()), window_start, horizon, &mut budget, &mut found);
            }
            Frequency::Yearly => {
                self.collect_calendar_step(anchor, 12 * u64::from(self.interval()), window_start, horizon, &mut budget, &mut found);
            }
        }

        found
    }

    /// Walk a series whose occurrences are a fixed `Duration` apart (daily and
    /// plain weekly rules)
    fn collect_fixed_step(
        &self,
        anchor: DateTime<Utc>,
        step: Duration,
        window_start: DateTime<Utc>,
        horizon: DateTime<Utc>,
        budget: &mut Budget,
        found: &mut Vec<DateTime<Utc>>,
    ) {
        let mut occurrence = anchor;
        loop {
            if occurrence > horizon || !budget.take_one() {
                break;
            }
            if occurrence >= window_start {
                found.push(occurrence);
            }
            occurrence = occurrence + step;
        }
    }

    /// Walk a `WEEKLY` series constrained by `BYDAY`, day by day.
    ///
    /// Weeks are Monday-based; a week qualifies when its offset from the anchor's
    /// week is a multiple of `INTERVAL`.
    fn collect_weekly_by_day(
        &self,
        anchor: DateTime<Utc>,
        window_start: DateTime<Utc>,
        horizon: DateTime<Utc>,
        budget: &mut Budget,
        found: &mut Vec<DateTime<Utc>>,
    ) {
        let time_of_day = anchor.time();
        let anchor_week_start = anchor.date_naive()
            - Duration::days(i64::from(anchor.weekday().num_days_from_monday()));

        let mut day = anchor.date_naive();
        loop {
            let occurrence = Utc.from_utc_datetime(&day.and_time(time_of_day));
            if occurrence > horizon {
                break;
            }

            let week_offset = (day - anchor_week_start).num_days() / 7;
            if week_offset % i64::from(self.interval()) == 0 && self.by_day().contains(&day.weekday()) {
                if !budget.take_one() {
                    break;
                }
                if occurrence >= window_start {
                    found.push(occurrence);
                }
            }

            day = day + Duration::days(1);
        }
    }

    /// Walk a `MONTHLY` or `YEARLY` series: same day-of-month (and, for yearly,
    /// month) as the anchor, stepping `months_per_slot` months at a time
    fn collect_calendar_step(
        &self,
        anchor: DateTime<Utc>,
        months_per_slot: u64,
        window_start: DateTime<Utc>,
        horizon: DateTime<Utc>,
        budget: &mut Budget,
        found: &mut Vec<DateTime<Utc>>,
    ) {
        let day = anchor.day();
        let time_of_day = anchor.time();

        let mut slot: u64 = 0;
        loop {
            let (year, month) = add_months(anchor.year(), anchor.month(), slot * months_per_slot);

            // The first instant of the slot's month; once even that is past the
            // horizon, no later slot can produce anything
            let month_floor = match NaiveDate::from_ymd_opt(year, month, 1) {
                Some(date) => Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap()),
                None => break, // year out of chrono's range
            };
            if month_floor > horizon {
                break;
            }

            // A month without that day (Jan 31st -> February, Feb 29th -> a
            // non-leap year) simply yields no occurrence for this slot
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                let occurrence = Utc.from_utc_datetime(&date.and_time(time_of_day));
                if occurrence > horizon {
                    break;
                }
                if !budget.take_one() {
                    break;
                }
                if occurrence >= window_start {
                    found.push(occurrence);
                }
            }

            slot += 1;
        }
    }
}

/// The remaining `COUNT` of a series being evaluated (or unlimited)
struct Budget(Option<u32>);

impl Budget {
    fn new(count: Option<u32>) -> Self {
        Self(count)
    }

    /// Consume one occurrence; returns false once the series is exhausted
    fn take_one(&mut self) -> bool {
        match &mut self.0 {
            None => true,
            Some(0) => false,
            Some(remaining) => {
                *remaining -= 1;
                true
            }
        }
    }
}

/// Offset a (year, month) pair by a number of months
fn add_months(year: i32, month: u32, months: u64) -> (i32, u32) {
    let zero_based = i64::from(year) * 12 + i64::from(month) - 1 + months as i64;
    ((zero_based.div_euclid(12)) as i32, (zero_based.rem_euclid(12) + 1) as u32)
}

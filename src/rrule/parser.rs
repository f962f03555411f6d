//! A module to parse the restricted RRULE grammar
//!
//! Only a practical subset of RFC5545 recurrence rules is supported:
//! `FREQ=<DAILY|WEEKLY|MONTHLY|YEARLY>[;INTERVAL=n][;COUNT=n][;UNTIL=<instant>][;BYDAY=<days>]`

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use thiserror::Error;

/// The error returned for recurrence rule text this crate cannot understand.
///
/// Callers expanding events must not let this abort a whole range query; see
/// [`expand`](crate::expand::expand) for the degradation policy.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RuleParseError {
    #[error("empty recurrence rule")]
    Empty,
    #[error("malformed rule part {0:?} (expected KEY=VALUE)")]
    MalformedPart(String),
    #[error("unsupported rule part {0:?}")]
    UnsupportedKey(String),
    #[error("missing FREQ part")]
    MissingFrequency,
    #[error("unsupported frequency {0:?}")]
    UnsupportedFrequency(String),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("BYDAY is only supported for FREQ=WEEKLY")]
    ByDayNotWeekly,
}

/// How often a series repeats (before applying `INTERVAL`)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// A parsed recurrence rule.
///
/// A rule on its own describes a repetition *pattern*; it only becomes a concrete
/// series once anchored at a master event's start time (see
/// [`occurrences_between`](RecurrenceRule::occurrences_between)).
#[derive(Clone, Debug, PartialEq)]
pub struct RecurrenceRule {
    pub(crate) freq: Frequency,
    /// Multiplier on the base frequency (`INTERVAL=2` with `FREQ=WEEKLY` is "every other week")
    pub(crate) interval: u32,
    /// Absolute cap on the number of occurrences of the whole series
    pub(crate) count: Option<u32>,
    /// Last instant (inclusive) an occurrence may start at
    pub(crate) until: Option<DateTime<Utc>>,
    /// Days of the week an occurrence may fall on. Only valid with `FREQ=WEEKLY`
    pub(crate) by_day: Vec<Weekday>,
}

impl RecurrenceRule {
    pub fn frequency(&self) -> Frequency {
        self.freq
    }
    pub fn interval(&self) -> u32 {
        self.interval
    }
    pub fn count(&self) -> Option<u32> {
        self.count
    }
    pub fn until(&self) -> Option<DateTime<Utc>> {
        self.until
    }
    pub fn by_day(&self) -> &[Weekday] {
        &self.by_day
    }
}

impl FromStr for RecurrenceRule {
    type Err = RuleParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        // Some producers prefix the rule with its iCalendar property name
        let text = text.strip_prefix("RRULE:").unwrap_or(text);
        if text.is_empty() {
            return Err(RuleParseError::Empty);
        }

        let mut freq = None;
        let mut interval = 1;
        let mut count = None;
        let mut until = None;
        let mut by_day = Vec::new();

        for part in text.split(';').filter(|part| !part.is_empty()) {
            let (key, value) = match part.split_once('=') {
                Some((key, value)) => (key.trim().to_ascii_uppercase(), value.trim()),
                None => return Err(RuleParseError::MalformedPart(part.to_string())),
            };

            match key.as_str() {
                "FREQ" => {
                    freq = Some(parse_frequency(value)?);
                }
                "INTERVAL" => {
                    interval = parse_positive(value, "INTERVAL")?;
                }
                "COUNT" => {
                    count = Some(parse_positive(value, "COUNT")?);
                }
                "UNTIL" => {
                    until = Some(parse_instant(value)?);
                }
                "BYDAY" => {
                    by_day = parse_by_day(value)?;
                }
                _ => return Err(RuleParseError::UnsupportedKey(key)),
            }
        }

        let freq = freq.ok_or(RuleParseError::MissingFrequency)?;
        if !by_day.is_empty() && freq != Frequency::Weekly {
            return Err(RuleParseError::ByDayNotWeekly);
        }

        Ok(RecurrenceRule {
            freq,
            interval,
            count,
            until,
            by_day,
        })
    }
}

fn parse_frequency(value: &str) -> Result<Frequency, RuleParseError> {
    match value.to_ascii_uppercase().as_str() {
        "DAILY" => Ok(Frequency::Daily),
        "WEEKLY" => Ok(Frequency::Weekly),
        "MONTHLY" => Ok(Frequency::Monthly),
        "YEARLY" => Ok(Frequency::Yearly),
        _ => Err(RuleParseError::UnsupportedFrequency(value.to_string())),
    }
}

fn parse_positive(value: &str, key: &'static str) -> Result<u32, RuleParseError> {
    match value.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(RuleParseError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

/// Parse an `UNTIL` instant.
///
/// Accepts the iCalendar basic forms (`20240105T000000Z`, with or without the
/// trailing `Z`, and the date-only `20240105`) as well as extended ISO-8601 forms.
/// Naive instants and bare dates are taken as UTC.
fn parse_instant(value: &str) -> Result<DateTime<Utc>, RuleParseError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }

    const DATETIME_FORMATS: [&str; 4] = [
        "%Y%m%dT%H%M%SZ",
        "%Y%m%dT%H%M%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for format in &DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    const DATE_FORMATS: [&str; 2] = ["%Y%m%d", "%Y-%m-%d"];
    for format in &DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap()));
        }
    }

    Err(RuleParseError::InvalidValue {
        key: "UNTIL",
        value: value.to_string(),
    })
}

fn parse_by_day(value: &str) -> Result<Vec<Weekday>, RuleParseError> {
    let mut days = Vec::new();
    for code in value.split(',').filter(|code| !code.is_empty()) {
        let day = match code.trim().to_ascii_uppercase().as_str() {
            "MO" => Weekday::Mon,
            "TU" => Weekday::Tue,
            "WE" => Weekday::Wed,
            "TH" => Weekday::Thu,
            "FR" => Weekday::Fri,
            "SA" => Weekday::Sat,
            "SU" => Weekday::Sun,
            _ => {
                return Err(RuleParseError::InvalidValue {
                    key: "BYDAY",
                    value: code.to_string(),
                })
            }
        };
        if !days.contains(&day) {
            days.push(day);
        }
    }
    if days.is_empty() {
        return Err(RuleParseError::InvalidValue {
            key: "BYDAY",
            value: value.to_string(),
        });
    }
    Ok(days)
}

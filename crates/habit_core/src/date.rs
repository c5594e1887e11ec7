//! Day-granularity dates and the injected time source.
//!
//! Timezone only enters through [`CalendarDate::normalize`]; everything after
//! that compares plain `(year, month, day)` values.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{HabitError, HabitResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> HabitResult<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| HabitError::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))
    }

    /// Parses a strict `YYYY-MM-DD` string.
    pub fn parse(input: &str) -> HabitResult<Self> {
        if !has_date_shape(input) {
            return Err(HabitError::InvalidDate(input.to_string()));
        }
        NaiveDate::parse_from_str(input, DATE_FORMAT)
            .map(Self)
            .map_err(|_| HabitError::InvalidDate(input.to_string()))
    }

    /// Projects an instant onto the calendar day it falls on at `offset`.
    pub fn normalize(timestamp: DateTime<Utc>, offset: &FixedOffset) -> Self {
        Self(timestamp.with_timezone(offset).date_naive())
    }

    pub fn today(clock: &dyn Clock, offset: &FixedOffset) -> Self {
        Self::normalize(clock.now(), offset)
    }

    /// Signed whole days from `self` to `other` (`other - self`).
    pub fn days_between(self, other: Self) -> i64 {
        (other.0 - self.0).num_days()
    }

    /// Shifts by `days`, saturating at the ends of the representable range.
    pub fn add_days(self, days: i64) -> Self {
        let shifted = if days >= 0 {
            self.0.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            self.0.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        match shifted {
            Some(date) => Self(date),
            None if days >= 0 => Self(NaiveDate::MAX),
            None => Self(NaiveDate::MIN),
        }
    }

    pub fn iso_week_key(self) -> IsoWeekKey {
        let week = self.0.iso_week();
        IsoWeekKey {
            year: week.year(),
            week: week.week(),
        }
    }

    /// Monday of the ISO week containing this date.
    pub fn week_start(self) -> Self {
        let offset = self.0.weekday().num_days_from_monday();
        self.add_days(-i64::from(offset))
    }

    pub fn as_naive(self) -> NaiveDate {
        self.0
    }
}

fn has_date_shape(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(idx, byte)| match idx {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        })
}

impl From<NaiveDate> for CalendarDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for CalendarDate {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for CalendarDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CalendarDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// `(ISO year, ISO week number)` bucket used by the weekly cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoWeekKey {
    pub year: i32,
    pub week: u32,
}

impl fmt::Display for IsoWeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.year, self.week)
    }
}

/// Source of "now". Inject a [`FixedClock`] in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// Local noon of `date` at `offset`, far from either day boundary.
    pub fn at_noon(date: CalendarDate, offset: &FixedOffset) -> Self {
        let local_noon = date.0.and_time(NaiveTime::default()) + Duration::hours(12);
        let utc = local_noon - Duration::seconds(i64::from(offset.local_minus_utc()));
        Self(Utc.from_utc_datetime(&utc))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parses `Z`, `UTC`, `+HH`, `+HHMM` or `+HH:MM` (sign required for numeric forms).
pub fn parse_utc_offset(input: &str) -> Option<FixedOffset> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match trimmed.as_bytes().first()? {
        b'+' => (1, &trimmed[1..]),
        b'-' => (-1, &trimmed[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

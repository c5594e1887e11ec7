use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::date::{CalendarDate, IsoWeekKey};

/// Deduplicated completion days of a single habit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionSet {
    dates: BTreeSet<CalendarDate>,
}

impl CompletionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or removes `date`. Returns whether the set changed; repeating a
    /// toggle or removing an absent day is a no-op.
    pub fn toggle(&mut self, date: CalendarDate, completed: bool) -> bool {
        if completed {
            self.dates.insert(date)
        } else {
            self.dates.remove(&date)
        }
    }

    pub fn contains(&self, date: CalendarDate) -> bool {
        self.dates.contains(&date)
    }

    /// Most recent first.
    pub fn sorted_descending(&self) -> impl Iterator<Item = CalendarDate> + '_ {
        self.dates.iter().rev().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = CalendarDate> + '_ {
        self.dates.iter().copied()
    }

    pub fn most_recent(&self) -> Option<CalendarDate> {
        self.dates.last().copied()
    }

    pub fn count_in_week(&self, key: IsoWeekKey) -> usize {
        self.dates
            .iter()
            .filter(|date| date.iso_week_key() == key)
            .count()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

impl FromIterator<CalendarDate> for CompletionSet {
    fn from_iter<I: IntoIterator<Item = CalendarDate>>(iter: I) -> Self {
        Self {
            dates: iter.into_iter().collect(),
        }
    }
}

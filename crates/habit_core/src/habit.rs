use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::completion::CompletionSet;
use crate::date::CalendarDate;
use crate::error::{HabitError, HabitResult};
use crate::policy::StreakPolicy;
use crate::streak::compute_streak;

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_WEEKLY_TARGET: u8 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(String);

impl HabitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = HabitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            other => Err(HabitError::InvalidFrequency(other.to_string())),
        }
    }
}

/// Completions per ISO week a weekly habit needs, always within `1..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeeklyTarget(u8);

impl WeeklyTarget {
    pub fn new(target: i64) -> HabitResult<Self> {
        match u8::try_from(target) {
            Ok(value) if (1..=MAX_WEEKLY_TARGET).contains(&value) => Ok(Self(value)),
            _ => Err(HabitError::InvalidTarget(target)),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Frequency together with the only configuration it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cadence {
    Daily,
    Weekly(WeeklyTarget),
}

impl Cadence {
    /// Validates `target` for the given frequency. Daily habits ignore the
    /// target and store it as 1.
    pub fn new(frequency: Frequency, target: i64) -> HabitResult<Self> {
        match frequency {
            Frequency::Daily => Ok(Self::Daily),
            Frequency::Weekly => WeeklyTarget::new(target).map(Self::Weekly),
        }
    }

    pub fn frequency(&self) -> Frequency {
        match self {
            Self::Daily => Frequency::Daily,
            Self::Weekly(_) => Frequency::Weekly,
        }
    }

    pub fn target(&self) -> u8 {
        match self {
            Self::Daily => 1,
            Self::Weekly(target) => target.get(),
        }
    }
}

/// Completions logged in the ISO week of a reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyProgress {
    pub completed: usize,
    pub target: u8,
}

impl WeeklyProgress {
    pub fn is_met(&self) -> bool {
        self.completed >= usize::from(self.target)
    }
}

/// A tracked habit. `streak` is derived from `completed_dates` and is only
/// ever rewritten by recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HabitRecord", into = "HabitRecord")]
pub struct Habit {
    id: HabitId,
    owner_id: UserId,
    name: String,
    description: Option<String>,
    cadence: Cadence,
    completed_dates: CompletionSet,
    streak: u32,
    best_streak: u32,
}

impl Habit {
    pub fn new(
        id: HabitId,
        owner_id: UserId,
        name: impl Into<String>,
        description: Option<String>,
        cadence: Cadence,
    ) -> HabitResult<Self> {
        Ok(Self {
            id,
            owner_id,
            name: validate_name(name.into())?,
            description: description.filter(|text| !text.trim().is_empty()),
            cadence,
            completed_dates: CompletionSet::new(),
            streak: 0,
            best_streak: 0,
        })
    }

    pub fn id(&self) -> &HabitId {
        &self.id
    }

    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn completed_dates(&self) -> &CompletionSet {
        &self.completed_dates
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Highest streak observed since this habit started being tracked.
    pub fn best_streak(&self) -> u32 {
        self.best_streak.max(self.streak)
    }

    pub fn is_owned_by(&self, owner: &UserId) -> bool {
        &self.owner_id == owner
    }

    pub fn completed_on(&self, date: CalendarDate) -> bool {
        self.completed_dates.contains(date)
    }

    /// `None` for daily habits.
    pub fn weekly_progress(&self, today: CalendarDate) -> Option<WeeklyProgress> {
        match self.cadence {
            Cadence::Daily => None,
            Cadence::Weekly(target) => Some(WeeklyProgress {
                completed: self.completed_dates.count_in_week(today.iso_week_key()),
                target: target.get(),
            }),
        }
    }

    pub(crate) fn completions_mut(&mut self) -> &mut CompletionSet {
        &mut self.completed_dates
    }

    /// Recomputes the cached streak and raises the persisted best.
    pub(crate) fn rederive_streak(&mut self, today: CalendarDate, policy: &StreakPolicy) {
        self.streak = compute_streak(&self.completed_dates, self.cadence, today, policy);
        self.best_streak = self.best_streak.max(self.streak);
    }
}

fn validate_name(name: String) -> HabitResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(HabitError::InvalidName("name must not be blank".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(HabitError::InvalidName(format!(
            "name must be {MAX_NAME_CHARS} characters or less"
        )));
    }
    Ok(trimmed.to_string())
}

/// Persisted shape of a habit. Dates are `YYYY-MM-DD` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitRecord {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub frequency: String,
    #[serde(default = "default_weekly_target")]
    pub weekly_target: i64,
    #[serde(default)]
    pub completed_dates: Vec<String>,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub best_streak: u32,
}

fn default_weekly_target() -> i64 {
    1
}

impl TryFrom<HabitRecord> for Habit {
    type Error = HabitError;

    fn try_from(record: HabitRecord) -> Result<Self, Self::Error> {
        let frequency: Frequency = record.frequency.parse()?;
        let cadence = Cadence::new(frequency, record.weekly_target)?;
        let completed_dates = record
            .completed_dates
            .iter()
            .map(|raw| CalendarDate::parse(raw))
            .collect::<HabitResult<CompletionSet>>()?;
        let mut habit = Habit::new(
            HabitId::new(record.id),
            UserId::new(record.owner_id),
            record.name,
            record.description,
            cadence,
        )?;
        habit.completed_dates = completed_dates;
        habit.streak = record.streak;
        habit.best_streak = record.best_streak.max(record.streak);
        Ok(habit)
    }
}

impl From<Habit> for HabitRecord {
    fn from(habit: Habit) -> Self {
        Self {
            id: habit.id.0,
            owner_id: habit.owner_id.0,
            name: habit.name,
            description: habit.description,
            frequency: habit.cadence.frequency().as_str().to_string(),
            weekly_target: i64::from(habit.cadence.target()),
            completed_dates: habit
                .completed_dates
                .iter()
                .map(|date| date.to_string())
                .collect(),
            streak: habit.streak,
            best_streak: habit.best_streak,
        }
    }
}

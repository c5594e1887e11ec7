//! Named streak policies. Every point where streak semantics may differ
//! between deployments is one of these settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which days may anchor a daily streak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DailyAnchor {
    /// The chain may end today or yesterday; today is still open for completion.
    #[default]
    TodayOrYesterday,
    /// The chain must end today.
    TodayOnly,
}

/// How the in-progress ISO week is treated for weekly habits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeeklyCurrentWeek {
    /// The current week must already meet its target, otherwise the streak is 0.
    #[default]
    MustQualify,
    /// An unqualified current week is skipped and the walk starts at last week.
    Grace,
}

/// Which habits feed the aggregate `current_streak`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CurrentStreakScope {
    #[default]
    AllHabits,
    CompletedToday,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakPolicy {
    pub daily_anchor: DailyAnchor,
    pub weekly_current_week: WeeklyCurrentWeek,
    pub current_streak_scope: CurrentStreakScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown policy value `{0}`")]
pub struct UnknownPolicy(pub String);

macro_rules! kebab_names {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownPolicy;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok(Self::$variant),)+
                    _ => Err(UnknownPolicy(s.to_string())),
                }
            }
        }
    };
}

kebab_names!(DailyAnchor {
    TodayOrYesterday => "today-or-yesterday",
    TodayOnly => "today-only",
});

kebab_names!(WeeklyCurrentWeek {
    MustQualify => "must-qualify",
    Grace => "grace",
});

kebab_names!(CurrentStreakScope {
    AllHabits => "all-habits",
    CompletedToday => "completed-today",
});

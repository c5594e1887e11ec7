use serde::{Deserialize, Serialize};

use crate::date::CalendarDate;
use crate::habit::Habit;
use crate::policy::CurrentStreakScope;

/// Dashboard counters over a user's habits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    pub total_habits: u32,
    pub completed_today: u32,
    pub current_streak: u32,
    /// Maximum of each habit's persisted best streak. This is only as deep as
    /// the history recorded since `bestStreak` was first persisted.
    pub longest_streak: u32,
}

/// Folds cached streak fields; callers wanting fresh values refresh first.
pub fn aggregate(habits: &[Habit], today: CalendarDate, scope: CurrentStreakScope) -> HabitStats {
    habits.iter().fold(HabitStats::default(), |mut stats, habit| {
        let done_today = habit.completed_on(today);
        stats.total_habits += 1;
        if done_today {
            stats.completed_today += 1;
        }
        let counts_as_current = match scope {
            CurrentStreakScope::AllHabits => true,
            CurrentStreakScope::CompletedToday => done_today,
        };
        if counts_as_current {
            stats.current_streak = stats.current_streak.max(habit.streak());
        }
        stats.longest_streak = stats.longest_streak.max(habit.best_streak());
        stats
    })
}

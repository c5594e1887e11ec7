pub mod completion;
pub mod date;
pub mod engine;
pub mod error;
pub mod habit;
pub mod mutation;
pub mod policy;
pub mod stats;
pub mod streak;

pub use crate::completion::CompletionSet;
pub use crate::date::{parse_utc_offset, CalendarDate, Clock, FixedClock, IsoWeekKey, SystemClock};
pub use crate::engine::StreakEngine;
pub use crate::error::{HabitError, HabitResult};
pub use crate::habit::{
    Cadence, Frequency, Habit, HabitId, HabitRecord, UserId, WeeklyProgress, WeeklyTarget,
};
pub use crate::mutation::{apply_completion, refresh};
pub use crate::policy::{CurrentStreakScope, DailyAnchor, StreakPolicy, WeeklyCurrentWeek};
pub use crate::stats::{aggregate, HabitStats};
pub use crate::streak::compute_streak;

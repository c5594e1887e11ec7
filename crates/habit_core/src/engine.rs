use std::fmt;
use std::sync::Arc;

use chrono::FixedOffset;

use crate::completion::CompletionSet;
use crate::date::{CalendarDate, Clock, SystemClock};
use crate::error::HabitResult;
use crate::habit::{Cadence, Habit};
use crate::mutation;
use crate::policy::StreakPolicy;
use crate::stats::{self, HabitStats};
use crate::streak;

/// Binds the pure streak functions to one clock, timezone and policy so that
/// every call site agrees on what "today" is.
#[derive(Clone)]
pub struct StreakEngine {
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    policy: StreakPolicy,
}

impl StreakEngine {
    pub fn new(clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self {
            clock,
            offset,
            policy: StreakPolicy::default(),
        }
    }

    pub fn system(offset: FixedOffset) -> Self {
        Self::new(Arc::new(SystemClock), offset)
    }

    pub fn with_policy(mut self, policy: StreakPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &StreakPolicy {
        &self.policy
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn today(&self) -> CalendarDate {
        CalendarDate::today(self.clock.as_ref(), &self.offset)
    }

    pub fn compute_streak(&self, dates: &CompletionSet, cadence: Cadence) -> u32 {
        streak::compute_streak(dates, cadence, self.today(), &self.policy)
    }

    pub fn apply_completion(&self, habit: &Habit, date: &str, completed: bool) -> HabitResult<Habit> {
        mutation::apply_completion(habit, date, completed, self.today(), &self.policy)
    }

    pub fn refresh(&self, habit: &Habit) -> Habit {
        mutation::refresh(habit, self.today(), &self.policy)
    }

    /// Aggregates over freshly rederived streaks.
    pub fn aggregate(&self, habits: &[Habit]) -> HabitStats {
        let today = self.today();
        let fresh: Vec<Habit> = habits
            .iter()
            .map(|habit| mutation::refresh(habit, today, &self.policy))
            .collect();
        stats::aggregate(&fresh, today, self.policy.current_streak_scope)
    }
}

impl fmt::Debug for StreakEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreakEngine")
            .field("offset", &self.offset)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

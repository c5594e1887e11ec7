use crate::date::CalendarDate;
use crate::error::HabitResult;
use crate::habit::Habit;
use crate::policy::StreakPolicy;

/// Toggles `date` on a copy of `habit` and rederives its streak against `today`.
///
/// The input is left untouched, so a rejected date never leaves a half-applied
/// habit behind.
pub fn apply_completion(
    habit: &Habit,
    date: &str,
    completed: bool,
    today: CalendarDate,
    policy: &StreakPolicy,
) -> HabitResult<Habit> {
    let date = CalendarDate::parse(date)?;
    let mut next = habit.clone();
    let changed = next.completions_mut().toggle(date, completed);
    next.rederive_streak(today, policy);
    tracing::debug!(
        habit = %habit.id(),
        %date,
        completed,
        changed,
        streak = next.streak(),
        "applied completion"
    );
    Ok(next)
}

/// Rederives the cached streak for display after a possible day rollover.
pub fn refresh(habit: &Habit, today: CalendarDate, policy: &StreakPolicy) -> Habit {
    let mut next = habit.clone();
    next.rederive_streak(today, policy);
    next
}

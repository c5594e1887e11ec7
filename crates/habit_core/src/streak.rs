//! Streak computation for daily and weekly cadences.
//!
//! Daily: walk completions from the most recent one backwards while each day is
//! exactly one before the previous. The most recent completion has to sit on an
//! anchor day (see [`DailyAnchor`]) or the streak is 0. A gap ends the walk;
//! earlier, disconnected runs are never resumed.
//!
//! Weekly: bucket completions by ISO week and count consecutive weeks that meet
//! the target, walking back from the week containing `today`. Whether an
//! unfinished current week breaks the chain is set by [`WeeklyCurrentWeek`].

use std::collections::HashMap;

use crate::completion::CompletionSet;
use crate::date::{CalendarDate, IsoWeekKey};
use crate::habit::Cadence;
use crate::policy::{DailyAnchor, StreakPolicy, WeeklyCurrentWeek};

pub fn compute_streak(
    dates: &CompletionSet,
    cadence: Cadence,
    today: CalendarDate,
    policy: &StreakPolicy,
) -> u32 {
    let streak = match cadence {
        Cadence::Daily => daily_streak(dates, today, policy.daily_anchor),
        Cadence::Weekly(target) => {
            weekly_streak(dates, target.get(), today, policy.weekly_current_week)
        }
    };
    tracing::trace!(?cadence, %today, completions = dates.len(), streak, "computed streak");
    streak
}

fn daily_streak(dates: &CompletionSet, today: CalendarDate, anchor: DailyAnchor) -> u32 {
    let mut walk = dates.sorted_descending();
    let Some(most_recent) = walk.next() else {
        return 0;
    };

    let lag = most_recent.days_between(today);
    let anchored = match anchor {
        DailyAnchor::TodayOrYesterday => lag == 0 || lag == 1,
        DailyAnchor::TodayOnly => lag == 0,
    };
    if !anchored {
        return 0;
    }

    let mut streak = 1;
    let mut previous = most_recent;
    for date in walk {
        if date.days_between(previous) != 1 {
            break;
        }
        streak += 1;
        previous = date;
    }
    streak
}

fn weekly_streak(
    dates: &CompletionSet,
    target: u8,
    today: CalendarDate,
    current_week: WeeklyCurrentWeek,
) -> u32 {
    let mut buckets: HashMap<IsoWeekKey, u32> = HashMap::new();
    for date in dates.iter() {
        *buckets.entry(date.iso_week_key()).or_default() += 1;
    }
    let qualifies = |week_start: CalendarDate| {
        buckets
            .get(&week_start.iso_week_key())
            .is_some_and(|count| *count >= u32::from(target))
    };

    let mut week = today.week_start();
    if !qualifies(week) {
        match current_week {
            WeeklyCurrentWeek::MustQualify => return 0,
            WeeklyCurrentWeek::Grace => week = week.add_days(-7),
        }
    }

    // Each counted week is a distinct bucket, which also bounds the walk at
    // the edge of the date range where `add_days` saturates.
    let mut streak = 0;
    for _ in 0..buckets.len() {
        if !qualifies(week) {
            break;
        }
        streak += 1;
        week = week.add_days(-7);
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::Frequency;

    fn date(raw: &str) -> CalendarDate {
        CalendarDate::parse(raw).unwrap()
    }

    fn set(raw: &[&str]) -> CompletionSet {
        raw.iter().map(|d| date(d)).collect()
    }

    fn days_back(today: CalendarDate, offsets: &[i64]) -> CompletionSet {
        offsets.iter().map(|n| today.add_days(-n)).collect()
    }

    fn weekly(target: i64) -> Cadence {
        Cadence::new(Frequency::Weekly, target).unwrap()
    }

    const TODAY: &str = "2025-10-15";

    #[test]
    fn empty_set_has_no_streak() {
        let today = date(TODAY);
        let policy = StreakPolicy::default();
        let empty = CompletionSet::new();
        assert_eq!(compute_streak(&empty, Cadence::Daily, today, &policy), 0);
        for target in 1..=7 {
            assert_eq!(compute_streak(&empty, weekly(target), today, &policy), 0);
        }
        let grace = StreakPolicy {
            weekly_current_week: WeeklyCurrentWeek::Grace,
            ..StreakPolicy::default()
        };
        assert_eq!(compute_streak(&empty, weekly(1), today, &grace), 0);
    }

    #[test]
    fn daily_chain_ending_today_counts_every_day() {
        let today = date(TODAY);
        for n in 1..=40 {
            let offsets: Vec<i64> = (0..n).collect();
            let dates = days_back(today, &offsets);
            assert_eq!(
                compute_streak(&dates, Cadence::Daily, today, &StreakPolicy::default()),
                n as u32
            );
        }
    }

    #[test]
    fn daily_chain_may_end_yesterday() {
        let today = date(TODAY);
        let dates = days_back(today, &[1, 2, 3]);
        let policy = StreakPolicy::default();
        assert_eq!(compute_streak(&dates, Cadence::Daily, today, &policy), 3);

        let strict = StreakPolicy {
            daily_anchor: DailyAnchor::TodayOnly,
            ..policy
        };
        assert_eq!(compute_streak(&dates, Cadence::Daily, today, &strict), 0);
    }

    #[test]
    fn daily_lapse_of_two_days_resets() {
        let today = date(TODAY);
        let dates = days_back(today, &[2, 3, 4, 5]);
        assert_eq!(
            compute_streak(&dates, Cadence::Daily, today, &StreakPolicy::default()),
            0
        );
    }

    #[test]
    fn daily_gap_stops_the_walk() {
        let today = date(TODAY);
        let dates = days_back(today, &[0, 1, 3, 4, 5]);
        assert_eq!(
            compute_streak(&dates, Cadence::Daily, today, &StreakPolicy::default()),
            2
        );
    }

    #[test]
    fn daily_future_completion_is_the_most_recent_date() {
        let today = date(TODAY);
        let dates = days_back(today, &[-1, 0, 1]);
        assert_eq!(
            compute_streak(&dates, Cadence::Daily, today, &StreakPolicy::default()),
            0
        );
    }

    #[test]
    fn daily_chain_crosses_month_and_leap_day() {
        let dates = set(&["2024-03-01", "2024-02-29", "2024-02-28", "2024-02-26"]);
        assert_eq!(
            compute_streak(
                &dates,
                Cadence::Daily,
                date("2024-03-01"),
                &StreakPolicy::default()
            ),
            3
        );
    }

    #[test]
    fn weekly_counts_consecutive_qualifying_weeks() {
        // 2025-10-15 is a Wednesday in 2025-W42.
        let dates = set(&[
            "2025-10-13",
            "2025-10-14",
            "2025-10-15",
            "2025-10-06",
            "2025-10-08",
            "2025-10-10",
            "2025-09-29",
            "2025-10-01",
        ]);
        assert_eq!(
            compute_streak(&dates, weekly(3), date(TODAY), &StreakPolicy::default()),
            2
        );
    }

    #[test]
    fn weekly_in_progress_week_follows_policy() {
        let dates = set(&[
            "2025-10-13",
            "2025-10-14",
            "2025-10-06",
            "2025-10-07",
            "2025-10-08",
            "2025-10-09",
        ]);
        let today = date(TODAY);

        let must_qualify = StreakPolicy::default();
        assert_eq!(compute_streak(&dates, weekly(4), today, &must_qualify), 0);

        let grace = StreakPolicy {
            weekly_current_week: WeeklyCurrentWeek::Grace,
            ..StreakPolicy::default()
        };
        assert_eq!(compute_streak(&dates, weekly(4), today, &grace), 1);
    }

    #[test]
    fn weekly_walk_crosses_iso_year() {
        // 2025-W01 starts on 2024-12-30; 2024 has 52 ISO weeks.
        let dates = set(&["2025-01-02", "2024-12-24", "2024-12-17"]);
        assert_eq!(
            compute_streak(
                &dates,
                weekly(1),
                date("2025-01-03"),
                &StreakPolicy::default()
            ),
            3
        );
    }

    #[test]
    fn weekly_future_dates_only_count_in_their_own_week() {
        // Saturday later this week counts toward the current week.
        let dates = set(&["2025-10-18", "2025-10-13", "2025-10-27"]);
        assert_eq!(
            compute_streak(&dates, weekly(2), date(TODAY), &StreakPolicy::default()),
            1
        );
    }
}

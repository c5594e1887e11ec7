use std::collections::HashMap;
use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use habit_core::{
    aggregate, refresh, CalendarDate, Cadence, Clock, Frequency, Habit, HabitError, HabitId,
    HabitStats, StreakEngine, StreakPolicy, SystemClock, UserId,
};
use parking_lot::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::repo::{HabitRepository, InMemoryHabitRepository};

/// Input for [`HabitService::create_habit`], as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHabit {
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub frequency: String,
    /// Completions per ISO week; defaults to 1 and is stored as 1 for daily habits.
    pub target: Option<i64>,
}

/// Use-case layer over a [`HabitRepository`].
///
/// Completion toggles against one habit id are serialized so that concurrent
/// read-modify-write cycles cannot drop each other's dates. Reads stay
/// unsynchronized.
pub struct HabitService {
    repo: Arc<dyn HabitRepository>,
    engine: StreakEngine,
    locks: Mutex<HashMap<HabitId, Arc<Mutex<()>>>>,
}

pub struct HabitServiceBuilder {
    repo: Option<Arc<dyn HabitRepository>>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    policy: StreakPolicy,
}

impl HabitServiceBuilder {
    pub fn new() -> Self {
        Self {
            repo: None,
            clock: Arc::new(SystemClock),
            offset: Utc.fix(),
            policy: StreakPolicy::default(),
        }
    }

    pub fn with_repository(mut self, repo: Arc<dyn HabitRepository>) -> Self {
        self.repo = Some(repo);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_policy(mut self, policy: StreakPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> HabitService {
        let repo: Arc<dyn HabitRepository> = match self.repo {
            Some(repo) => repo,
            None => Arc::new(InMemoryHabitRepository::new()),
        };
        HabitService {
            repo,
            engine: StreakEngine::new(self.clock, self.offset).with_policy(self.policy),
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for HabitServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HabitService {
    pub fn builder() -> HabitServiceBuilder {
        HabitServiceBuilder::new()
    }

    pub fn engine(&self) -> &StreakEngine {
        &self.engine
    }

    pub fn today(&self) -> CalendarDate {
        self.engine.today()
    }

    #[instrument(skip(self), fields(owner = %request.owner_id))]
    pub fn create_habit(&self, request: NewHabit) -> StoreResult<Habit> {
        let frequency: Frequency = request.frequency.trim().parse()?;
        let cadence = Cadence::new(frequency, request.target.unwrap_or(1))?;
        let habit = Habit::new(
            HabitId::new(Uuid::new_v4().to_string()),
            request.owner_id,
            request.name,
            request.description,
            cadence,
        )?;
        self.repo.save_habit(&habit)?;
        info!(habit = %habit.id(), %frequency, "created habit");
        Ok(habit)
    }

    /// Lists the owner's habits with streaks rederived for today, persisting
    /// any habit whose cached values moved.
    #[instrument(skip(self))]
    pub fn habits(&self, owner: &UserId) -> StoreResult<Vec<Habit>> {
        self.habits_on(owner, self.today())
    }

    pub fn habit(&self, owner: &UserId, id: &HabitId) -> StoreResult<Habit> {
        let habit = self.owned_habit(owner, id)?;
        Ok(self.engine.refresh(&habit))
    }

    /// Marks `date` (`YYYY-MM-DD`) done or not done and persists the rederived streak.
    #[instrument(skip(self))]
    pub fn set_completion(
        &self,
        owner: &UserId,
        id: &HabitId,
        date: &str,
        completed: bool,
    ) -> StoreResult<Habit> {
        self.locked(id, || {
            let habit = self.owned_habit(owner, id)?;
            let updated = self.engine.apply_completion(&habit, date, completed)?;
            self.repo.save_habit(&updated)?;
            Ok(updated)
        })
    }

    #[instrument(skip(self))]
    pub fn delete_habit(&self, owner: &UserId, id: &HabitId) -> StoreResult<()> {
        self.locked(id, || {
            self.owned_habit(owner, id)?;
            self.repo.delete_habit(id)
        })?;
        self.locks.lock().remove(id);
        info!(habit = %id, "deleted habit");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn stats(&self, owner: &UserId) -> StoreResult<HabitStats> {
        let today = self.today();
        let habits = self.habits_on(owner, today)?;
        Ok(aggregate(
            &habits,
            today,
            self.engine.policy().current_streak_scope,
        ))
    }

    fn habits_on(&self, owner: &UserId, today: CalendarDate) -> StoreResult<Vec<Habit>> {
        let policy = self.engine.policy();
        let stored = self.repo.fetch_habits_for_user(owner)?;
        let mut fresh = Vec::with_capacity(stored.len());
        for habit in stored {
            let refreshed = refresh(&habit, today, policy);
            if refreshed == habit {
                fresh.push(refreshed);
                continue;
            }
            // A toggle or delete may have landed between the fetch and the lock.
            let current = self.locked(habit.id(), || {
                let current = refresh(&self.repo.fetch_habit(habit.id())?, today, policy);
                self.repo.save_habit(&current)?;
                Ok(current)
            });
            match current {
                Ok(current) => {
                    debug!(
                        habit = %current.id(),
                        streak = current.streak(),
                        "refreshed cached streak"
                    );
                    fresh.push(current);
                }
                Err(err) if is_not_found(&err) => {
                    debug!(habit = %habit.id(), "skipping habit deleted during listing");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(fresh)
    }

    fn owned_habit(&self, owner: &UserId, id: &HabitId) -> StoreResult<Habit> {
        let habit = self.repo.fetch_habit(id)?;
        if !habit.is_owned_by(owner) {
            return Err(HabitError::HabitNotFound(id.clone()).into());
        }
        Ok(habit)
    }

    /// Runs `op` holding the lock for `id`. The lock entry is dropped again when
    /// the habit turns out not to exist and nobody else is waiting on it.
    fn locked<T>(&self, id: &HabitId, op: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        let lock = self.locks.lock().entry(id.clone()).or_default().clone();
        let result = {
            let _guard = lock.lock();
            op()
        };
        if matches!(&result, Err(err) if is_not_found(err)) {
            let mut locks = self.locks.lock();
            let unshared = locks
                .get(id)
                .is_some_and(|entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(&lock) == 2);
            if unshared {
                locks.remove(id);
            }
        }
        result
    }
}

fn is_not_found(err: &StoreError) -> bool {
    matches!(err.as_habit_error(), Some(HabitError::HabitNotFound(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};
    use habit_core::{FixedClock, WeeklyCurrentWeek};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::thread;

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn service_on(day: &str) -> (HabitService, Arc<InMemoryHabitRepository>) {
        let repo = Arc::new(InMemoryHabitRepository::new());
        let today = CalendarDate::parse(day).unwrap();
        let service = HabitService::builder()
            .with_repository(repo.clone())
            .with_clock(Arc::new(FixedClock::at_noon(today, &offset())))
            .with_offset(offset())
            .build();
        (service, repo)
    }

    fn request(owner: &str, frequency: &str, target: Option<i64>) -> NewHabit {
        NewHabit {
            owner_id: UserId::new(owner),
            name: "Journal".into(),
            description: Some("Three lines before bed".into()),
            frequency: frequency.into(),
            target,
        }
    }

    #[test]
    fn create_validates_and_persists() {
        let (service, repo) = service_on("2025-10-15");
        let habit = service.create_habit(request("alice", "weekly", Some(3))).unwrap();
        assert_eq!(habit.cadence().target(), 3);
        assert_eq!(habit.streak(), 0);
        assert_eq!(repo.len(), 1);

        let err = service
            .create_habit(request("alice", "monthly", None))
            .unwrap_err();
        assert_eq!(
            err.as_habit_error(),
            Some(&HabitError::InvalidFrequency("monthly".into()))
        );
        let err = service
            .create_habit(request("alice", "weekly", Some(0)))
            .unwrap_err();
        assert_eq!(err.as_habit_error(), Some(&HabitError::InvalidTarget(0)));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn completion_round_trip_updates_streak() {
        let (service, _) = service_on("2025-10-15");
        let owner = UserId::new("alice");
        let habit = service.create_habit(request("alice", "daily", None)).unwrap();

        service
            .set_completion(&owner, habit.id(), "2025-10-14", true)
            .unwrap();
        let habit = service
            .set_completion(&owner, habit.id(), "2025-10-15", true)
            .unwrap();
        assert_eq!(habit.streak(), 2);

        let habit = service
            .set_completion(&owner, habit.id(), "2025-10-15", false)
            .unwrap();
        assert_eq!(habit.streak(), 1);
        assert_eq!(service.habit(&owner, habit.id()).unwrap().streak(), 1);
    }

    #[test]
    fn invalid_date_leaves_the_record_untouched() {
        let (service, repo) = service_on("2025-10-15");
        let owner = UserId::new("alice");
        let habit = service.create_habit(request("alice", "daily", None)).unwrap();
        let err = service
            .set_completion(&owner, habit.id(), "2025-10-32", true)
            .unwrap_err();
        assert_eq!(
            err.as_habit_error(),
            Some(&HabitError::InvalidDate("2025-10-32".into()))
        );
        assert_eq!(repo.fetch_habit(habit.id()).unwrap(), habit);
    }

    #[test]
    fn other_owners_see_not_found() {
        let (service, _) = service_on("2025-10-15");
        let habit = service.create_habit(request("alice", "daily", None)).unwrap();
        let mallory = UserId::new("mallory");
        let expected = Some(HabitError::HabitNotFound(habit.id().clone()));

        let err = service
            .set_completion(&mallory, habit.id(), "2025-10-15", true)
            .unwrap_err();
        assert_eq!(err.as_habit_error().cloned(), expected);
        let err = service.delete_habit(&mallory, habit.id()).unwrap_err();
        assert_eq!(err.as_habit_error().cloned(), expected);
        assert!(service.habits(&mallory).unwrap().is_empty());
    }

    #[test]
    fn delete_removes_the_habit() {
        let (service, repo) = service_on("2025-10-15");
        let owner = UserId::new("alice");
        let habit = service.create_habit(request("alice", "daily", None)).unwrap();
        service.delete_habit(&owner, habit.id()).unwrap();
        assert!(repo.is_empty());
        assert!(service.delete_habit(&owner, habit.id()).is_err());
    }

    #[test]
    fn listing_persists_rolled_over_streaks() {
        let (service, repo) = service_on("2025-10-15");
        let owner = UserId::new("alice");
        let habit = service.create_habit(request("alice", "daily", None)).unwrap();
        service
            .set_completion(&owner, habit.id(), "2025-10-15", true)
            .unwrap();

        let later = HabitService::builder()
            .with_repository(repo.clone())
            .with_clock(Arc::new(FixedClock::at_noon(
                CalendarDate::parse("2025-10-20").unwrap(),
                &offset(),
            )))
            .build();
        let listed = later.habits(&owner).unwrap();
        assert_eq!(listed[0].streak(), 0);
        assert_eq!(listed[0].best_streak(), 1);
        assert_eq!(repo.fetch_habit(habit.id()).unwrap().streak(), 0);
    }

    #[test]
    fn stats_follow_the_configured_policy() {
        let repo = Arc::new(InMemoryHabitRepository::new());
        let today = CalendarDate::parse("2025-10-15").unwrap();
        let service = HabitService::builder()
            .with_repository(repo)
            .with_clock(Arc::new(FixedClock::at_noon(today, &offset())))
            .with_policy(StreakPolicy {
                weekly_current_week: WeeklyCurrentWeek::Grace,
                ..StreakPolicy::default()
            })
            .build();
        let owner = UserId::new("alice");
        let habit = service.create_habit(request("alice", "weekly", Some(4))).unwrap();
        for date in [
            "2025-10-06",
            "2025-10-07",
            "2025-10-08",
            "2025-10-09",
            "2025-10-13",
            "2025-10-14",
        ] {
            service.set_completion(&owner, habit.id(), date, true).unwrap();
        }

        let stats = service.stats(&owner).unwrap();
        assert_eq!(
            stats,
            HabitStats {
                total_habits: 1,
                completed_today: 0,
                current_streak: 1,
                longest_streak: 1,
            }
        );
    }

    #[test]
    fn concurrent_toggles_on_one_habit_are_serialized() {
        let (service, _) = service_on("2025-10-31");
        let service = Arc::new(service);
        let owner = UserId::new("alice");
        let habit = service.create_habit(request("alice", "daily", None)).unwrap();

        let handles: Vec<_> = (1..=31)
            .map(|day| {
                let service = Arc::clone(&service);
                let owner = owner.clone();
                let id = habit.id().clone();
                thread::spawn(move || {
                    service
                        .set_completion(&owner, &id, &format!("2025-10-{day:02}"), true)
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let habit = service.habit(&owner, habit.id()).unwrap();
        assert_eq!(habit.completed_dates().len(), 31);
        assert_eq!(habit.streak(), 31);
    }

    #[test]
    fn unknown_ids_leave_no_lock_entries() {
        let (service, _) = service_on("2025-10-15");
        let owner = UserId::new("alice");
        for n in 0..1000 {
            let id = HabitId::new(format!("missing-{n}"));
            assert!(service.set_completion(&owner, &id, "2025-10-15", true).is_err());
        }
        assert!(service
            .delete_habit(&owner, &HabitId::new("missing-delete"))
            .is_err());

        let habit = service.create_habit(request("alice", "daily", None)).unwrap();
        let mallory = UserId::new("mallory");
        assert!(service
            .set_completion(&mallory, habit.id(), "2025-10-15", true)
            .is_err());
        assert!(service.locks.lock().is_empty());
    }

    /// Serves a listing captured earlier while delegating everything else.
    struct StaleListing {
        inner: InMemoryHabitRepository,
        listing: Vec<Habit>,
    }

    impl HabitRepository for StaleListing {
        fn fetch_habits_for_user(&self, _owner: &UserId) -> StoreResult<Vec<Habit>> {
            Ok(self.listing.clone())
        }

        fn fetch_habit(&self, id: &HabitId) -> StoreResult<Habit> {
            self.inner.fetch_habit(id)
        }

        fn save_habit(&self, habit: &Habit) -> StoreResult<()> {
            self.inner.save_habit(habit)
        }

        fn delete_habit(&self, id: &HabitId) -> StoreResult<()> {
            self.inner.delete_habit(id)
        }
    }

    #[test]
    fn listing_skips_habits_deleted_after_the_fetch() {
        let (service, repo) = service_on("2025-10-15");
        let owner = UserId::new("alice");
        let gone = service.create_habit(request("alice", "daily", None)).unwrap();
        let kept = service.create_habit(request("alice", "daily", None)).unwrap();
        for habit in [&gone, &kept] {
            service
                .set_completion(&owner, habit.id(), "2025-10-15", true)
                .unwrap();
        }
        let listing = vec![
            repo.fetch_habit(gone.id()).unwrap(),
            repo.fetch_habit(kept.id()).unwrap(),
        ];
        repo.delete_habit(gone.id()).unwrap();

        let stale = StaleListing {
            inner: InMemoryHabitRepository::with_habits([repo.fetch_habit(kept.id()).unwrap()]),
            listing,
        };
        let later = HabitService::builder()
            .with_repository(Arc::new(stale))
            .with_clock(Arc::new(FixedClock::at_noon(
                CalendarDate::parse("2025-10-20").unwrap(),
                &offset(),
            )))
            .build();

        let listed = later.habits(&owner).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id(), kept.id());
        assert_eq!(listed[0].streak(), 0);
        assert_eq!(later.stats(&owner).unwrap().total_habits, 1);
        assert!(!later.locks.lock().contains_key(gone.id()));
    }

    /// Moves one day forward on every reading.
    struct SteppingClock {
        start: DateTime<Utc>,
        reads: AtomicI64,
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            self.start + Duration::days(self.reads.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[test]
    fn stats_use_one_reading_of_today() {
        let (service, repo) = service_on("2025-10-15");
        let owner = UserId::new("alice");
        for _ in 0..2 {
            let habit = service.create_habit(request("alice", "daily", None)).unwrap();
            service
                .set_completion(&owner, habit.id(), "2025-10-15", true)
                .unwrap();
        }

        let today = CalendarDate::parse("2025-10-15").unwrap();
        let stepping = HabitService::builder()
            .with_repository(repo)
            .with_clock(Arc::new(SteppingClock {
                start: FixedClock::at_noon(today, &offset()).now(),
                reads: AtomicI64::new(0),
            }))
            .build();
        assert_eq!(
            stepping.stats(&owner).unwrap(),
            HabitStats {
                total_habits: 2,
                completed_today: 2,
                current_streak: 1,
                longest_streak: 1,
            }
        );
    }
}

use std::collections::BTreeMap;

use habit_core::{Habit, HabitError, HabitId, UserId};
use parking_lot::RwLock;

use crate::error::StoreResult;

/// Storage collaborator for habit records.
///
/// Implementations report unknown ids as [`HabitError::HabitNotFound`]. They do
/// not serialize read-modify-write cycles; [`crate::HabitService`] does.
pub trait HabitRepository: Send + Sync {
    fn fetch_habits_for_user(&self, owner: &UserId) -> StoreResult<Vec<Habit>>;
    fn fetch_habit(&self, id: &HabitId) -> StoreResult<Habit>;
    fn save_habit(&self, habit: &Habit) -> StoreResult<()>;
    fn delete_habit(&self, id: &HabitId) -> StoreResult<()>;
}

/// Volatile repository, mainly for tests and previews.
#[derive(Debug, Default)]
pub struct InMemoryHabitRepository {
    habits: RwLock<BTreeMap<HabitId, Habit>>,
}

impl InMemoryHabitRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_habits(habits: impl IntoIterator<Item = Habit>) -> Self {
        let habits = habits
            .into_iter()
            .map(|habit| (habit.id().clone(), habit))
            .collect();
        Self {
            habits: RwLock::new(habits),
        }
    }

    pub fn len(&self) -> usize {
        self.habits.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.habits.read().is_empty()
    }
}

impl HabitRepository for InMemoryHabitRepository {
    fn fetch_habits_for_user(&self, owner: &UserId) -> StoreResult<Vec<Habit>> {
        Ok(owned_by(&self.habits.read(), owner))
    }

    fn fetch_habit(&self, id: &HabitId) -> StoreResult<Habit> {
        self.habits
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| HabitError::HabitNotFound(id.clone()).into())
    }

    fn save_habit(&self, habit: &Habit) -> StoreResult<()> {
        self.habits.write().insert(habit.id().clone(), habit.clone());
        Ok(())
    }

    fn delete_habit(&self, id: &HabitId) -> StoreResult<()> {
        self.habits
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| HabitError::HabitNotFound(id.clone()).into())
    }
}

pub(crate) fn owned_by(habits: &BTreeMap<HabitId, Habit>, owner: &UserId) -> Vec<Habit> {
    habits
        .values()
        .filter(|habit| habit.is_owned_by(owner))
        .cloned()
        .collect()
}

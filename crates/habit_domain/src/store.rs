use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use habit_core::{Habit, HabitError, HabitId, UserId};
use parking_lot::RwLock;
use tempfile::NamedTempFile;

use crate::error::{StoreError, StoreResult};
use crate::repo::{owned_by, HabitRepository};

/// Repository persisted as one JSON array of habit records.
///
/// The whole file is rewritten on every change through a sibling temp file
/// renamed over the store. The in-memory copy is only replaced once the
/// rename succeeded.
#[derive(Debug)]
pub struct JsonFileHabitRepository {
    path: PathBuf,
    habits: RwLock<BTreeMap<HabitId, Habit>>,
}

impl JsonFileHabitRepository {
    /// Loads `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let habits = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            let records: Vec<Habit> = if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw).map_err(|source| StoreError::Json {
                    path: path.clone(),
                    source,
                })?
            };
            records
                .into_iter()
                .map(|habit| (habit.id().clone(), habit))
                .collect()
        } else {
            BTreeMap::new()
        };
        tracing::debug!(path = %path.display(), habits = habits.len(), "opened habit store");
        Ok(Self {
            path,
            habits: RwLock::new(habits),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(
        &self,
        update: impl FnOnce(&mut BTreeMap<HabitId, Habit>) -> StoreResult<()>,
    ) -> StoreResult<()> {
        let mut guard = self.habits.write();
        let mut next = guard.clone();
        update(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn persist(&self, habits: &BTreeMap<HabitId, Habit>) -> StoreResult<()> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_err)?;
        let records: Vec<&Habit> = habits.values().collect();
        let mut payload =
            serde_json::to_string_pretty(&records).map_err(|source| StoreError::Json {
                path: self.path.clone(),
                source,
            })?;
        payload.push('\n');
        let mut staged = NamedTempFile::new_in(dir).map_err(io_err)?;
        staged.write_all(payload.as_bytes()).map_err(io_err)?;
        staged.as_file().sync_all().map_err(io_err)?;
        staged
            .persist(&self.path)
            .map(|_| ())
            .map_err(|err| io_err(err.error))
    }
}

impl HabitRepository for JsonFileHabitRepository {
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
        self.commit(|habits| {
            habits.insert(habit.id().clone(), habit.clone());
            Ok(())
        })
    }

    fn delete_habit(&self, id: &HabitId) -> StoreResult<()> {
        self.commit(|habits| {
            habits
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| HabitError::HabitNotFound(id.clone()).into())
        })
    }
}

use std::path::PathBuf;

use habit_core::HabitError;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Habit(#[from] HabitError),
    #[error("unable to access habit store `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("habit store `{}` is not valid JSON", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// The core rejection behind this error, if any.
    pub fn as_habit_error(&self) -> Option<&HabitError> {
        match self {
            Self::Habit(err) => Some(err),
            _ => None,
        }
    }
}

use thiserror::Error;

use crate::habit::HabitId;

pub type HabitResult<T> = Result<T, HabitError>;

/// Rejections produced at the boundary of the core. Computation itself never fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HabitError {
    #[error("invalid date `{0}`: expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid frequency `{0}`: expected `daily` or `weekly`")]
    InvalidFrequency(String),
    #[error("invalid target {0}: expected a positive integer, at most 7 for weekly habits")]
    InvalidTarget(i64),
    #[error("invalid habit name: {0}")]
    InvalidName(String),
    #[error("habit not found: {0}")]
    HabitNotFound(HabitId),
}

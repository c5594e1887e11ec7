use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use chrono::{FixedOffset, Offset, Utc};
use habit_core::{
    parse_utc_offset, CurrentStreakScope, DailyAnchor, StreakPolicy, UserId, WeeklyCurrentWeek,
};

const DEFAULT_STORE: &str = "habits.json";
const DEFAULT_USER: &str = "local";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) store_path: PathBuf,
    pub(crate) offset: FixedOffset,
    pub(crate) policy: StreakPolicy,
    pub(crate) user: UserId,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    /// Builds a config from any key lookup. Unusable values are logged and
    /// replaced by defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup("HABIT_STORE").filter(|value| !value.trim().is_empty()) {
            config.store_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("HABIT_UTC_OFFSET") {
            match parse_utc_offset(&raw) {
                Some(offset) => config.offset = offset,
                None => tracing::warn!(value = %raw, "ignoring unparseable HABIT_UTC_OFFSET"),
            }
        }
        if let Some(anchor) = parse_setting::<DailyAnchor>(&lookup, "HABIT_DAILY_ANCHOR") {
            config.policy.daily_anchor = anchor;
        }
        if let Some(week) = parse_setting::<WeeklyCurrentWeek>(&lookup, "HABIT_WEEKLY_POLICY") {
            config.policy.weekly_current_week = week;
        }
        if let Some(scope) = parse_setting::<CurrentStreakScope>(&lookup, "HABIT_STREAK_SCOPE") {
            config.policy.current_streak_scope = scope;
        }
        if let Some(user) = lookup("HABIT_USER").filter(|value| !value.trim().is_empty()) {
            config.user = UserId::new(user.trim());
        }
        config
    }

    pub fn store_path(&self) -> &PathBuf {
        &self.store_path
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn policy(&self) -> StreakPolicy {
        self.policy
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }
}

fn parse_setting<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, %err, "ignoring invalid setting");
            None
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE),
            offset: Utc.fix(),
            policy: StreakPolicy::default(),
            user: UserId::new(DEFAULT_USER),
        }
    }
}

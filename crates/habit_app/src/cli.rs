use std::path::PathBuf;

use chrono::FixedOffset;
use clap::{Parser, Subcommand};
use habit_core::{parse_utc_offset, CurrentStreakScope, DailyAnchor, UserId, WeeklyCurrentWeek};

use crate::config::AppConfig;

fn parse_offset_arg(s: &str) -> Result<FixedOffset, String> {
    parse_utc_offset(s).ok_or_else(|| format!("Invalid offset '{s}'. Use Z, UTC or ±HH:MM"))
}

#[derive(Debug, Parser)]
#[command(name = "habits", version, about = "Track recurring habits and their streaks")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, help = "JSON habit store (overrides HABIT_STORE)")]
    pub store: Option<PathBuf>,

    #[arg(long, short, help = "Owner whose habits are used (overrides HABIT_USER)")]
    pub user: Option<String>,

    #[arg(
        long,
        value_parser = parse_offset_arg,
        allow_hyphen_values = true,
        help = "UTC offset that decides which day is today (overrides HABIT_UTC_OFFSET)"
    )]
    pub utc_offset: Option<FixedOffset>,

    #[arg(long, help = "today-or-yesterday | today-only")]
    pub daily_anchor: Option<DailyAnchor>,

    #[arg(long, help = "must-qualify | grace")]
    pub weekly_policy: Option<WeeklyCurrentWeek>,

    #[arg(long, help = "all-habits | completed-today")]
    pub streak_scope: Option<CurrentStreakScope>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List habits with their current streaks
    List,

    /// Create a habit
    Add {
        name: String,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, short, default_value = "daily", help = "daily | weekly")]
        frequency: String,
        #[arg(long, short, help = "Completions per ISO week for weekly habits (1-7)")]
        target: Option<i64>,
    },

    /// Mark a habit done (defaults to today)
    Done {
        id: String,
        #[arg(long, help = "YYYY-MM-DD")]
        date: Option<String>,
    },

    /// Clear a completion (defaults to today)
    Undo {
        id: String,
        #[arg(long, help = "YYYY-MM-DD")]
        date: Option<String>,
    },

    /// Delete a habit
    Delete { id: String },

    /// Show completed-today, current and longest streak
    Stats,
}

impl Cli {
    /// Layers command-line flags over the environment config.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(store) = &self.store {
            config.store_path = store.clone();
        }
        if let Some(user) = &self.user {
            config.user = UserId::new(user.trim());
        }
        if let Some(offset) = self.utc_offset {
            config.offset = offset;
        }
        if let Some(anchor) = self.daily_anchor {
            config.policy.daily_anchor = anchor;
        }
        if let Some(week) = self.weekly_policy {
            config.policy.weekly_current_week = week;
        }
        if let Some(scope) = self.streak_scope {
            config.policy.current_streak_scope = scope;
        }
    }
}

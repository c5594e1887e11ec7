use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use habit_core::{CalendarDate, Habit, HabitId, UserId};
use habit_domain::{HabitService, JsonFileHabitRepository, NewHabit};
use tracing::{debug, info};

use crate::cli::Command;
use crate::config::AppConfig;

/// Opens the configured store and runs one command against it.
pub fn run(config: &AppConfig, command: Command, out: &mut impl Write) -> Result<()> {
    let repo = JsonFileHabitRepository::open(config.store_path()).with_context(|| {
        format!(
            "failed to open habit store {}",
            config.store_path().display()
        )
    })?;
    let service = HabitService::builder()
        .with_repository(Arc::new(repo))
        .with_offset(config.offset())
        .with_policy(config.policy())
        .build();
    info!(
        store = %config.store_path().display(),
        user = %config.user(),
        today = %service.today(),
        "habit store ready"
    );
    execute(&service, config.user(), command, out)
}

pub fn execute(
    service: &HabitService,
    user: &UserId,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    debug!(?command, "executing command");
    match command {
        Command::List => {
            let today = service.today();
            let habits = service.habits(user).context("failed to list habits")?;
            if habits.is_empty() {
                writeln!(out, "no habits yet")?;
            }
            for habit in &habits {
                writeln!(out, "{}", render_habit(habit, today))?;
            }
        }
        Command::Add {
            name,
            description,
            frequency,
            target,
        } => {
            let habit = service
                .create_habit(NewHabit {
                    owner_id: user.clone(),
                    name,
                    description,
                    frequency,
                    target,
                })
                .context("failed to create habit")?;
            writeln!(out, "created {}", render_habit(&habit, service.today()))?;
        }
        Command::Done { id, date } => toggle(service, user, &id, date, true, out)?,
        Command::Undo { id, date } => toggle(service, user, &id, date, false, out)?,
        Command::Delete { id } => {
            service
                .delete_habit(user, &HabitId::new(id.as_str()))
                .with_context(|| format!("failed to delete habit {id}"))?;
            writeln!(out, "deleted {id}")?;
        }
        Command::Stats => {
            let stats = service.stats(user).context("failed to compute stats")?;
            writeln!(
                out,
                "completed today: {}/{}",
                stats.completed_today, stats.total_habits
            )?;
            writeln!(out, "current streak: {}", stats.current_streak)?;
            writeln!(out, "longest streak: {}", stats.longest_streak)?;
        }
    }
    Ok(())
}

fn toggle(
    service: &HabitService,
    user: &UserId,
    id: &str,
    date: Option<String>,
    completed: bool,
    out: &mut impl Write,
) -> Result<()> {
    let today = service.today();
    let date = date.unwrap_or_else(|| today.to_string());
    let habit = service
        .set_completion(user, &HabitId::new(id), &date, completed)
        .with_context(|| format!("failed to update habit {id} for {date}"))?;
    writeln!(out, "{}", render_habit(&habit, today))?;
    Ok(())
}

fn render_habit(habit: &Habit, today: CalendarDate) -> String {
    let unit = match habit.cadence().frequency() {
        habit_core::Frequency::Daily => "day",
        habit_core::Frequency::Weekly => "week",
    };
    let mut line = format!(
        "{}  {}  [{}]  {} {} streak (best {})",
        habit.id(),
        habit.name(),
        habit.cadence().frequency(),
        habit.streak(),
        unit,
        habit.best_streak()
    );
    if let Some(progress) = habit.weekly_progress(today) {
        line.push_str(&format!(
            "  {}/{} this week",
            progress.completed, progress.target
        ));
    }
    if habit.completed_on(today) {
        line.push_str("  done today");
    }
    line
}

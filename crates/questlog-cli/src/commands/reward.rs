use clap::Subcommand;
use questlog_core::{Config, Difficulty, Outcome, Priority, ProgressEvent, ValidationError};
use serde::Serialize;

use super::{open_tracker, push_best_effort, CommandResult};

#[derive(Subcommand)]
pub enum RewardAction {
    /// Complete a habit
    Habit {
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,
        /// Habit streak after this completion
        #[arg(long, default_value_t = 1)]
        streak: u32,
    },
    /// Fail a habit
    HabitFail {
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,
    },
    /// Complete a daily
    Daily {
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,
        #[arg(long, default_value = "low")]
        priority: Priority,
    },
    /// Take back a daily's completion
    DailyUndo {
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,
        #[arg(long, default_value = "low")]
        priority: Priority,
    },
    /// Finish a routine
    Routine {
        /// Number of tasks checked off
        #[arg(long)]
        tasks: u32,
    },
}

#[derive(Serialize)]
struct Report {
    #[serde(flatten)]
    outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

impl RewardAction {
    fn event(self) -> Result<ProgressEvent, ValidationError> {
        Ok(match self {
            RewardAction::Habit { difficulty, streak } => ProgressEvent::HabitCompleted {
                difficulty,
                new_streak: streak.max(1),
            },
            RewardAction::HabitFail { difficulty } => ProgressEvent::HabitFailed { difficulty },
            RewardAction::Daily {
                difficulty,
                priority,
            } => ProgressEvent::DailyCompleted {
                difficulty,
                priority,
            },
            RewardAction::DailyUndo {
                difficulty,
                priority,
            } => ProgressEvent::DailyUncompleted {
                difficulty,
                priority,
            },
            RewardAction::Routine { tasks: 0 } => {
                return Err(ValidationError::InvalidState(
                    "Complete at least one task before finishing the routine".into(),
                ))
            }
            RewardAction::Routine { tasks } => ProgressEvent::RoutineCompleted {
                completed_tasks: tasks,
            },
        })
    }
}

pub fn run(action: RewardAction) -> CommandResult {
    let event = action.event()?;
    let config = Config::load()?;
    let mut tracker = open_tracker(&config)?;

    let outcome = tracker.apply(event)?;
    let message = if config.display.show_message {
        tracker.level_message()
    } else {
        None
    };
    let state = outcome.state.clone();
    println!(
        "{}",
        serde_json::to_string_pretty(&Report { outcome, message })?
    );

    push_best_effort(&config, &state);
    Ok(())
}

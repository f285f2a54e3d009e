//! Deterministic reward tables.

use serde::{Deserialize, Serialize};

use crate::task::{Difficulty, Priority};

/// What a task kind pays out. Routine tasks pay a flat amount regardless of
/// difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Habit,
    Daily,
    RoutineTask,
}

/// Deltas applied to a [`ProgressionState`](super::ProgressionState).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub experience: i32,
    pub coins: i64,
    pub gems: i64,
    pub health: i32,
}

impl Reward {
    fn scaled(self, factor: u32) -> Self {
        let factor = i64::from(factor);
        let clamp_i32 =
            |v: i32| (i64::from(v) * factor).clamp(i32::MIN.into(), i32::MAX.into()) as i32;
        Self {
            experience: clamp_i32(self.experience),
            coins: self.coins.saturating_mul(factor),
            gems: self.gems.saturating_mul(factor),
            health: clamp_i32(self.health),
        }
    }
}

const HABIT_HEALTH: i32 = 2;
const DAILY_HEALTH: i32 = 1;
const HABIT_FAILURE_HEALTH: i32 = -5;
const ROUTINE_TASK_XP: i32 = 10;
const ROUTINE_TASK_COINS: i64 = 5;

fn habit_base(difficulty: Difficulty) -> (i32, i64) {
    match difficulty {
        Difficulty::Easy => (5, 3),
        Difficulty::Medium => (10, 5),
        Difficulty::Hard => (15, 8),
    }
}

fn daily_base(difficulty: Difficulty) -> i32 {
    match difficulty {
        Difficulty::Easy => 3,
        Difficulty::Medium => 6,
        Difficulty::Hard => 10,
    }
}

fn priority_bonus(priority: Priority) -> i32 {
    match priority {
        Priority::Low => 0,
        Priority::Medium => 2,
        Priority::High => 5,
    }
}

/// Reward for completing one task.
///
/// `streak` is the habit's streak *after* this completion and is ignored for
/// other kinds, as is `priority` for anything but dailies.
pub fn compute_task_reward(
    kind: RewardKind,
    difficulty: Difficulty,
    priority: Option<Priority>,
    streak: Option<u32>,
) -> Reward {
    match kind {
        RewardKind::Habit => {
            let (xp, coins) = habit_base(difficulty);
            let streak_bonus = (streak.unwrap_or(0) / 5 * 2) as i32;
            Reward {
                experience: xp + streak_bonus,
                coins: coins + i64::from(streak_bonus / 2),
                gems: 0,
                health: HABIT_HEALTH,
            }
        }
        RewardKind::Daily => Reward {
            experience: daily_base(difficulty) + priority_bonus(priority.unwrap_or_default()),
            coins: 0,
            gems: 0,
            health: DAILY_HEALTH,
        },
        RewardKind::RoutineTask => Reward {
            experience: ROUTINE_TASK_XP,
            coins: ROUTINE_TASK_COINS,
            gems: 0,
            health: 0,
        },
    }
}

/// Penalty for failing a habit.
pub fn habit_failure_penalty(difficulty: Difficulty) -> Reward {
    let experience = match difficulty {
        Difficulty::Easy => -3,
        Difficulty::Medium => -7,
        Difficulty::Hard => -12,
    };
    Reward {
        experience,
        coins: 0,
        gems: 0,
        health: HABIT_FAILURE_HEALTH,
    }
}

/// Takes back the experience and health of a daily that is being
/// uncompleted.
pub fn daily_undo_penalty(difficulty: Difficulty, priority: Priority) -> Reward {
    let earned = compute_task_reward(RewardKind::Daily, difficulty, Some(priority), None);
    Reward {
        experience: -earned.experience,
        health: -earned.health,
        ..Default::default()
    }
}

/// Reward for finishing a routine with `completed_tasks` tasks done.
pub fn routine_reward(completed_tasks: u32) -> Reward {
    compute_task_reward(RewardKind::RoutineTask, Difficulty::default(), None, None)
        .scaled(completed_tasks)
}

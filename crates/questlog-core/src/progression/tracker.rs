//! Explicit holder for a player's progression.
//!
//! The tracker owns the current state, turns user actions into rewards, runs
//! the engine and hands the result to a [`StatsStore`] after every
//! transition. The level message is kept separately with the time it was
//! produced so the caller can stop showing it after [`MESSAGE_TTL_SECS`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::engine::{apply_reward, LevelChange, Outcome};
use super::reward::{
    compute_task_reward, daily_undo_penalty, habit_failure_penalty, routine_reward, Reward,
    RewardKind,
};
use super::state::ProgressionState;
use crate::error::Result;
use crate::task::{Difficulty, Priority};

/// How long a level message stays visible.
pub const MESSAGE_TTL_SECS: i64 = 3;

/// Persistence hook for a tracker.
pub trait StatsStore {
    fn load(&mut self) -> Result<Option<ProgressionState>>;
    fn save(&mut self, state: &ProgressionState) -> Result<()>;
}

/// A user action that moves progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    HabitCompleted {
        difficulty: Difficulty,
        /// Streak after this completion.
        new_streak: u32,
    },
    HabitFailed {
        difficulty: Difficulty,
    },
    DailyCompleted {
        difficulty: Difficulty,
        priority: Priority,
    },
    DailyUncompleted {
        difficulty: Difficulty,
        priority: Priority,
    },
    RoutineCompleted {
        completed_tasks: u32,
    },
}

impl ProgressEvent {
    pub fn reward(&self) -> Reward {
        match *self {
            ProgressEvent::HabitCompleted {
                difficulty,
                new_streak,
            } => compute_task_reward(RewardKind::Habit, difficulty, None, Some(new_streak)),
            ProgressEvent::HabitFailed { difficulty } => habit_failure_penalty(difficulty),
            ProgressEvent::DailyCompleted {
                difficulty,
                priority,
            } => compute_task_reward(RewardKind::Daily, difficulty, Some(priority), None),
            ProgressEvent::DailyUncompleted {
                difficulty,
                priority,
            } => daily_undo_penalty(difficulty, priority),
            ProgressEvent::RoutineCompleted { completed_tasks } => routine_reward(completed_tasks),
        }
    }

    /// Streak carried into the aggregate state after this event, if it
    /// changes.
    fn streak(&self) -> Option<u32> {
        match *self {
            ProgressEvent::HabitCompleted { new_streak, .. } => Some(new_streak),
            ProgressEvent::HabitFailed { .. } => Some(0),
            _ => None,
        }
    }
}

pub struct ProgressTracker<S: StatsStore> {
    state: ProgressionState,
    store: S,
    message: Option<(LevelChange, DateTime<Utc>)>,
    message_ttl: Duration,
}

impl<S: StatsStore> ProgressTracker<S> {
    /// Load the stored state, starting fresh when nothing is stored yet.
    pub fn load(mut store: S) -> Result<Self> {
        let state = store.load()?.unwrap_or_default().normalized();
        Ok(Self {
            state,
            store,
            message: None,
            message_ttl: Duration::seconds(MESSAGE_TTL_SECS),
        })
    }

    /// Override how long a level message stays visible.
    pub fn with_message_ttl(mut self, secs: u64) -> Self {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX).min(i64::MAX / 1000);
        self.message_ttl = Duration::seconds(secs);
        self
    }

    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply one event, timestamped now.
    pub fn apply(&mut self, event: ProgressEvent) -> Result<Outcome> {
        self.apply_at(event, Utc::now())
    }

    pub fn apply_at(&mut self, event: ProgressEvent, now: DateTime<Utc>) -> Result<Outcome> {
        let mut outcome = apply_reward(self.state.clone(), event.reward());
        if let Some(streak) = event.streak() {
            outcome.state.current_streak = streak;
        }

        self.store.save(&outcome.state)?;
        debug!(?event, level = outcome.state.level, "progression updated");

        self.state = outcome.state.clone();
        if let Some(change) = outcome.change {
            self.message = Some((change, now));
        }
        Ok(outcome)
    }

    /// Replace the whole state, e.g. with a copy pulled from the server.
    pub fn overwrite(&mut self, state: ProgressionState) -> Result<()> {
        let state = state.normalized();
        self.store.save(&state)?;
        self.state = state;
        self.message = None;
        Ok(())
    }

    /// Start over from a fresh level-1 state.
    pub fn reset(&mut self) -> Result<()> {
        self.overwrite(ProgressionState::default())
    }

    /// The level message if it is still within its display window.
    pub fn level_message_at(&self, now: DateTime<Utc>) -> Option<&'static str> {
        match self.message {
            Some((change, at)) if now - at < self.message_ttl => Some(change.message()),
            _ => None,
        }
    }

    pub fn level_message(&self) -> Option<&'static str> {
        self.level_message_at(Utc::now())
    }
}

/// Store that keeps nothing beyond the process. Useful for previews and
/// tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub saved: Option<ProgressionState>,
    pub saves: usize,
}

impl StatsStore for MemoryStore {
    fn load(&mut self) -> Result<Option<ProgressionState>> {
        Ok(self.saved.clone())
    }

    fn save(&mut self, state: &ProgressionState) -> Result<()> {
        self.saved = Some(state.clone());
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    struct FailingStore;

    impl StatsStore for FailingStore {
        fn load(&mut self) -> Result<Option<ProgressionState>> {
            Ok(None)
        }
        fn save(&mut self, _state: &ProgressionState) -> Result<()> {
            Err(CoreError::Sync("disk full".into()))
        }
    }

    fn tracker_at(experience: u32) -> ProgressTracker<MemoryStore> {
        let store = MemoryStore {
            saved: Some(ProgressionState {
                experience,
                ..Default::default()
            }),
            saves: 0,
        };
        ProgressTracker::load(store).unwrap()
    }

    #[test]
    fn starts_fresh_without_stored_state() {
        let tracker = ProgressTracker::load(MemoryStore::default()).unwrap();
        assert_eq!(tracker.state(), &ProgressionState::default());
    }

    #[test]
    fn apply_persists_every_transition() {
        let mut tracker = tracker_at(0);
        tracker
            .apply(ProgressEvent::DailyCompleted {
                difficulty: Difficulty::Easy,
                priority: Priority::Low,
            })
            .unwrap();
        tracker
            .apply(ProgressEvent::RoutineCompleted { completed_tasks: 1 })
            .unwrap();
        assert_eq!(tracker.store().saves, 2);
        assert_eq!(tracker.store().saved.as_ref().unwrap().experience, 13);
    }

    #[test]
    fn habit_events_drive_aggregate_streak() {
        let mut tracker = tracker_at(0);
        tracker
            .apply(ProgressEvent::HabitCompleted {
                difficulty: Difficulty::Medium,
                new_streak: 4,
            })
            .unwrap();
        assert_eq!(tracker.state().current_streak, 4);
        tracker
            .apply(ProgressEvent::HabitFailed {
                difficulty: Difficulty::Medium,
            })
            .unwrap();
        assert_eq!(tracker.state().current_streak, 0);
    }

    #[test]
    fn level_message_expires_after_ttl() {
        let mut tracker = tracker_at(55);
        let now = Utc::now();
        let outcome = tracker
            .apply_at(
                ProgressEvent::HabitCompleted {
                    difficulty: Difficulty::Medium,
                    new_streak: 1,
                },
                now,
            )
            .unwrap();
        assert_eq!(outcome.message(), Some("Level Up! 🎉"));
        assert_eq!(tracker.level_message_at(now), Some("Level Up! 🎉"));
        assert_eq!(
            tracker.level_message_at(now + Duration::milliseconds(2_999)),
            Some("Level Up! 🎉")
        );
        assert!(tracker.level_message_at(now + Duration::seconds(MESSAGE_TTL_SECS)).is_none());
    }

    #[test]
    fn message_ttl_is_configurable() {
        let mut tracker = tracker_at(55).with_message_ttl(10);
        let now = Utc::now();
        tracker
            .apply_at(
                ProgressEvent::HabitCompleted {
                    difficulty: Difficulty::Medium,
                    new_streak: 1,
                },
                now,
            )
            .unwrap();
        assert!(tracker.level_message_at(now + Duration::seconds(9)).is_some());
        assert!(tracker.level_message_at(now + Duration::seconds(10)).is_none());
    }

    #[test]
    fn failed_save_leaves_state_untouched() {
        let mut tracker = ProgressTracker::load(FailingStore).unwrap();
        let result = tracker.apply(ProgressEvent::RoutineCompleted { completed_tasks: 2 });
        assert!(result.is_err());
        assert_eq!(tracker.state().experience, 0);
    }

    #[test]
    fn overwrite_clears_message() {
        let mut tracker = tracker_at(55);
        let now = Utc::now();
        tracker
            .apply_at(
                ProgressEvent::HabitCompleted {
                    difficulty: Difficulty::Hard,
                    new_streak: 1,
                },
                now,
            )
            .unwrap();
        tracker.overwrite(ProgressionState::default()).unwrap();
        assert!(tracker.level_message_at(now).is_none());
        assert_eq!(tracker.state().level, 1);
    }
}

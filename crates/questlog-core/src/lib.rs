//! # Questlog Core Library
//!
//! Core logic for Questlog, a habit and routine tracker that rewards
//! completed tasks with experience, coins and health. Both the CLI client
//! and the REST server link this crate, so the reward formulas exist in one
//! place.
//!
//! ## Architecture
//!
//! - **Progression**: pure leveling engine plus an explicit state holder
//!   that persists after every transition
//! - **Task**: habits, dailies and routines, with their daily-scoped
//!   completion rules
//! - **Storage**: SQLite for the server's authoritative copy and the
//!   client's key-value copy, TOML for client configuration
//! - **Sync**: last-write-wins HTTP client for the server's stats endpoint
//!
//! ## Key Components
//!
//! - [`apply_reward`]: one atomic reward/penalty update
//! - [`ProgressTracker`]: state holder with a [`StatsStore`] hook
//! - [`Database`]: server-side persistence
//! - [`Config`]: client configuration

pub mod error;
pub mod progression;
pub mod storage;
pub mod sync;
pub mod task;

pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use progression::{
    apply_experience_delta, apply_health_delta, apply_reward, compute_task_reward, required_xp,
    LevelChange, Outcome, ProgressEvent, ProgressTracker, ProgressionState, Reward, RewardKind,
    StatsStore,
};
pub use storage::{Config, Database, LocalDb, LocalStatsStore, User, UserStatsStore};
pub use sync::SyncClient;
pub use task::{Daily, Difficulty, Habit, Priority, Routine, RoutineTask};

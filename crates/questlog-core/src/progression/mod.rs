mod engine;
mod level;
mod reward;
mod state;
mod tracker;

pub use engine::{apply_experience_delta, apply_health_delta, apply_reward, LevelChange, Outcome};
pub use level::{
    level_down_experience, required_xp, BASE_REQUIRED_XP, LEVEL_DOWN_RETAIN, LEVEL_UP_BONUS_XP,
    MAX_HEALTH, MAX_LEVEL, MIN_EXPERIENCE_FOR_LEVEL, XP_GROWTH,
};
pub use reward::{
    compute_task_reward, daily_undo_penalty, habit_failure_penalty, routine_reward, Reward,
    RewardKind,
};
pub use state::ProgressionState;
pub use tracker::{MemoryStore, ProgressEvent, ProgressTracker, StatsStore, MESSAGE_TTL_SECS};

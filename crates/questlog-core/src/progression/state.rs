use serde::{Deserialize, Serialize};

use super::level::{required_xp, MAX_HEALTH, MAX_LEVEL};

/// A player's progression: level, experience, health and currencies.
///
/// The same record is kept locally by the client and authoritatively by the
/// server; the two are reconciled by overwriting whichever is older.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionState {
    pub level: u32,
    pub experience: u32,
    /// Cached `required_xp(level)`.
    pub experience_to_next_level: u32,
    pub health: u32,
    pub max_health: u32,
    pub coins: u64,
    pub gems: u64,
    pub current_streak: u32,
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0,
            experience_to_next_level: required_xp(1),
            health: MAX_HEALTH,
            max_health: MAX_HEALTH,
            coins: 0,
            gems: 0,
            current_streak: 0,
        }
    }
}

impl ProgressionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required_xp(&self) -> u32 {
        required_xp(self.level)
    }

    /// Repair a state that arrived from outside the engine.
    ///
    /// Recomputes the cached requirement from `level` and clamps the bounded
    /// fields. Experience is left as-is apart from capping it below the
    /// requirement.
    pub fn normalized(mut self) -> Self {
        self.level = self.level.clamp(1, MAX_LEVEL);
        if self.max_health == 0 {
            self.max_health = MAX_HEALTH;
        }
        self.health = self.health.min(self.max_health);
        self.experience_to_next_level = required_xp(self.level);
        if self.experience >= self.experience_to_next_level {
            self.experience = self.experience_to_next_level - 1;
        }
        self
    }
}

//! Leveling curve and transition constants.

/// Experience required to leave level 1.
pub const BASE_REQUIRED_XP: u32 = 60;

/// Per-level compounding growth of the required experience.
pub const XP_GROWTH: f64 = 1.15;

/// Experience a player starts a fresh level with after leveling up.
pub const LEVEL_UP_BONUS_XP: u32 = 15;

/// Below this much experience a penalty drops the player a level.
pub const MIN_EXPERIENCE_FOR_LEVEL: i64 = 10;

/// Fraction of the lower level's requirement kept after a level-down.
pub const LEVEL_DOWN_RETAIN: f64 = 0.8;

pub const MAX_HEALTH: u32 = 50;

/// Highest reachable level. The requirement saturates long before this.
pub const MAX_LEVEL: u32 = 999;

/// Experience required to advance from `level` to `level + 1`.
///
/// Each step is rounded before the next one compounds, so the curve matches
/// a running total rather than `60 * 1.15^(n-1)`.
pub fn required_xp(level: u32) -> u32 {
    let mut required = BASE_REQUIRED_XP;
    for _ in 1..level.min(MAX_LEVEL) {
        required = (required as f64 * XP_GROWTH).round() as u32;
        if required == u32::MAX {
            break;
        }
    }
    required
}

/// Experience a player lands on after dropping to `level`.
pub fn level_down_experience(level: u32) -> u32 {
    (required_xp(level) as f64 * LEVEL_DOWN_RETAIN).round() as u32
}

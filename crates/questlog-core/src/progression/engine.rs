//! Progression engine.
//!
//! Pure transforms of a [`ProgressionState`]. Nothing here performs I/O or
//! can fail; callers persist the returned state themselves.
//!
//! ## Transitions
//!
//! ```text
//! experience >= required           -> level + 1, experience = 15
//! penalty, experience < 10, L > 1  -> level - 1, experience = 80% of required
//! health hits 0, L > 1             -> level - 1, health = max
//! ```
//!
//! At most one transition happens per call, even if the resulting experience
//! is still outside `[0, required)`.

use serde::{Deserialize, Serialize};

use super::level::{
    level_down_experience, required_xp, LEVEL_UP_BONUS_XP, MAX_LEVEL, MIN_EXPERIENCE_FOR_LEVEL,
};
use super::reward::Reward;
use super::state::ProgressionState;

/// A level transition produced by a single update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelChange {
    LevelUp,
    LevelDown,
    HealthDepleted,
}

impl LevelChange {
    /// User-facing message for this transition.
    pub fn message(&self) -> &'static str {
        match self {
            LevelChange::LevelUp => "Level Up! 🎉",
            LevelChange::LevelDown => "Level Down! 😢",
            LevelChange::HealthDepleted => "Health depleted! Level Down! 😢",
        }
    }
}

/// Result of applying one reward or penalty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub state: ProgressionState,
    pub reward: Reward,
    pub change: Option<LevelChange>,
}

impl Outcome {
    pub fn message(&self) -> Option<&'static str> {
        self.change.map(|c| c.message())
    }
}

/// Add `amount` experience, leveling up or down at most once.
pub fn apply_experience_delta(
    mut state: ProgressionState,
    amount: i32,
) -> (ProgressionState, Option<LevelChange>) {
    if amount == 0 {
        return (state, None);
    }

    let experience = i64::from(state.experience) + i64::from(amount);

    let required = i64::from(required_xp(state.level));
    if experience >= required && state.level < MAX_LEVEL {
        state.level += 1;
        state.experience = LEVEL_UP_BONUS_XP;
        state.experience_to_next_level = required_xp(state.level);
        return (state, Some(LevelChange::LevelUp));
    }

    if amount < 0 && experience < MIN_EXPERIENCE_FOR_LEVEL && state.level > 1 {
        drop_level(&mut state);
        return (state, Some(LevelChange::LevelDown));
    }

    state.experience = experience.clamp(0, required - 1) as u32;
    (state, None)
}

/// Add `amount` health, clamped to `[0, max_health]`.
///
/// Running out of health above level 1 costs a level and refills health.
pub fn apply_health_delta(
    mut state: ProgressionState,
    amount: i32,
) -> (ProgressionState, Option<LevelChange>) {
    if amount == 0 {
        return (state, None);
    }

    let health = (i64::from(state.health) + i64::from(amount))
        .clamp(0, i64::from(state.max_health));
    state.health = health as u32;

    if state.health == 0 && state.level > 1 {
        drop_level(&mut state);
        state.health = state.max_health;
        return (state, Some(LevelChange::HealthDepleted));
    }

    (state, None)
}

/// Apply a full reward as one update.
///
/// Health goes first. When it triggers a level-down, that transition owns
/// the level and experience fields and the experience delta is not applied.
/// Currencies are added either way.
pub fn apply_reward(state: ProgressionState, reward: Reward) -> Outcome {
    let (state, health_change) = apply_health_delta(state, reward.health);
    let (mut state, change) = match health_change {
        Some(change) => (state, Some(change)),
        None => apply_experience_delta(state, reward.experience),
    };

    state.coins = state.coins.saturating_add_signed(reward.coins);
    state.gems = state.gems.saturating_add_signed(reward.gems);

    Outcome {
        state,
        reward,
        change,
    }
}

fn drop_level(state: &mut ProgressionState) {
    state.level -= 1;
    state.experience_to_next_level = required_xp(state.level);
    state.experience = level_down_experience(state.level);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(level: u32, experience: u32) -> ProgressionState {
        ProgressionState {
            level,
            experience,
            experience_to_next_level: required_xp(level),
            ..Default::default()
        }
    }

    #[test]
    fn zero_experience_is_noop() {
        let s = at(3, 40);
        let (next, change) = apply_experience_delta(s.clone(), 0);
        assert_eq!(next, s);
        assert!(change.is_none());
    }

    #[test]
    fn level_up_resets_to_bonus() {
        let (s, change) = apply_experience_delta(at(1, 55), 10);
        assert_eq!(s.level, 2);
        assert_eq!(s.experience, 15);
        assert_eq!(s.experience_to_next_level, 69);
        assert_eq!(change, Some(LevelChange::LevelUp));
        assert_eq!(change.unwrap().message(), "Level Up! 🎉");
    }

    #[test]
    fn exact_threshold_levels_up() {
        let (s, change) = apply_experience_delta(at(1, 50), 10);
        assert_eq!(s.level, 2);
        assert_eq!(change, Some(LevelChange::LevelUp));
    }

    #[test]
    fn huge_gain_only_levels_once() {
        let (s, change) = apply_experience_delta(at(1, 0), 10_000);
        assert_eq!(s.level, 2);
        assert_eq!(s.experience, 15);
        assert_eq!(change, Some(LevelChange::LevelUp));
    }

    #[test]
    fn penalty_below_minimum_levels_down() {
        let (s, change) = apply_experience_delta(at(2, 12), -5);
        assert_eq!(s.level, 1);
        assert_eq!(s.experience_to_next_level, 60);
        assert_eq!(s.experience, 48);
        assert_eq!(change.unwrap().message(), "Level Down! 😢");
    }

    #[test]
    fn penalty_above_minimum_just_subtracts() {
        let (s, change) = apply_experience_delta(at(2, 30), -7);
        assert_eq!(s.level, 2);
        assert_eq!(s.experience, 23);
        assert!(change.is_none());
    }

    #[test]
    fn level_one_floors_at_zero() {
        let (s, change) = apply_experience_delta(at(1, 4), -12);
        assert_eq!(s.level, 1);
        assert_eq!(s.experience, 0);
        assert!(change.is_none());
    }

    #[test]
    fn small_gain_below_minimum_does_not_level_down() {
        let (s, change) = apply_experience_delta(at(2, 2), 3);
        assert_eq!(s.level, 2);
        assert_eq!(s.experience, 5);
        assert!(change.is_none());
    }

    #[test]
    fn health_depletion_costs_a_level() {
        let s = ProgressionState {
            health: 4,
            ..at(3, 20)
        };
        let (s, change) = apply_health_delta(s, -5);
        assert_eq!(s.level, 2);
        assert_eq!(s.health, 50);
        assert_eq!(s.experience_to_next_level, 69);
        assert_eq!(s.experience, 55);
        assert_eq!(change.unwrap().message(), "Health depleted! Level Down! 😢");
    }

    #[test]
    fn health_depletion_at_level_one_stays_empty() {
        let s = ProgressionState {
            health: 3,
            ..at(1, 20)
        };
        let (s, change) = apply_health_delta(s, -5);
        assert_eq!(s.level, 1);
        assert_eq!(s.health, 0);
        assert!(change.is_none());
    }

    #[test]
    fn health_gain_is_capped() {
        let s = ProgressionState {
            health: 49,
            ..at(1, 0)
        };
        let (s, _) = apply_health_delta(s, 2);
        assert_eq!(s.health, 50);
    }

    #[test]
    fn health_level_down_skips_experience_delta() {
        let s = ProgressionState {
            health: 5,
            ..at(3, 12)
        };
        let penalty = Reward {
            experience: -12,
            health: -5,
            ..Default::default()
        };
        let outcome = apply_reward(s, penalty);
        assert_eq!(outcome.state.level, 2);
        assert_eq!(outcome.state.experience, 55);
        assert_eq!(outcome.state.health, 50);
        assert_eq!(outcome.change, Some(LevelChange::HealthDepleted));
    }

    #[test]
    fn reward_adds_currencies_and_surfaces_one_message() {
        let s = ProgressionState {
            health: 40,
            coins: 7,
            ..at(1, 55)
        };
        let reward = Reward {
            experience: 10,
            coins: 5,
            gems: 0,
            health: 2,
        };
        let outcome = apply_reward(s, reward);
        assert_eq!(outcome.state.level, 2);
        assert_eq!(outcome.state.health, 42);
        assert_eq!(outcome.state.coins, 12);
        assert_eq!(outcome.message(), Some("Level Up! 🎉"));
    }

    #[test]
    fn experience_stops_at_the_level_cap() {
        let (s, change) = apply_experience_delta(at(MAX_LEVEL, u32::MAX - 1), 5);
        assert_eq!(change, None);
        assert_eq!(s.level, MAX_LEVEL);
        assert_eq!(s.experience, u32::MAX - 1);

        let (s, change) = apply_experience_delta(at(MAX_LEVEL - 1, u32::MAX - 1), i32::MAX);
        assert_eq!(change, Some(LevelChange::LevelUp));
        assert_eq!(s.level, MAX_LEVEL);
        assert_eq!(s.experience, LEVEL_UP_BONUS_XP);
    }
}

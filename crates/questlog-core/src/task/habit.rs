use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{completed_on, Difficulty};
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub notes: Option<String>,
    pub difficulty: Difficulty,
    pub streak: u32,
    pub best_streak: u32,
    pub completed: bool,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Habit {
    pub fn new(
        user_id: &str,
        title: String,
        notes: Option<String>,
        difficulty: Difficulty,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title,
            notes,
            difficulty,
            streak: 0,
            best_streak: 0,
            completed: false,
            last_completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed_on(&self, now: DateTime<Utc>) -> bool {
        self.completed && completed_on(self.last_completed_at, now.date_naive())
    }

    /// Clear a completion flag left over from a previous day.
    ///
    /// Returns true when the habit changed.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> bool {
        if self.completed && !self.is_completed_on(now) {
            self.completed = false;
            return true;
        }
        false
    }

    /// Mark the habit done for today and return the new streak.
    ///
    /// The streak continues when the previous completion was yesterday and
    /// restarts at 1 otherwise.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<u32, ValidationError> {
        if self.is_completed_on(now) {
            return Err(ValidationError::InvalidState(
                "Habit already completed today".into(),
            ));
        }
        let yesterday = (now - Duration::days(1)).date_naive();
        self.streak = if completed_on(self.last_completed_at, yesterday) {
            self.streak + 1
        } else {
            1
        };
        self.best_streak = self.best_streak.max(self.streak);
        self.completed = true;
        self.last_completed_at = Some(now);
        self.updated_at = now;
        Ok(self.streak)
    }

    /// Record a failure: the streak is lost.
    pub fn fail(&mut self, now: DateTime<Utc>) {
        self.streak = 0;
        self.completed = false;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn habit(now: DateTime<Utc>) -> Habit {
        Habit::new("u1", "Stretch".into(), None, Difficulty::Easy, now)
    }

    #[test]
    fn first_completion_starts_streak() {
        let now = Utc::now();
        let mut h = habit(now);
        assert_eq!(h.complete(now).unwrap(), 1);
        assert!(h.is_completed_on(now));
        assert_eq!(h.best_streak, 1);
    }

    #[test]
    fn second_completion_same_day_is_rejected() {
        let now = Utc::now();
        let mut h = habit(now);
        h.complete(now).unwrap();
        assert!(h.complete(now).is_err());
        assert_eq!(h.streak, 1);
    }

    #[test]
    fn consecutive_days_extend_streak() {
        let day1 = Utc::now() - Duration::days(1);
        let day2 = day1 + Duration::days(1);
        let mut h = habit(day1);
        h.complete(day1).unwrap();
        assert_eq!(h.complete(day2).unwrap(), 2);
    }

    #[test]
    fn gap_restarts_streak_but_keeps_best() {
        let day1 = Utc::now() - Duration::days(5);
        let mut h = habit(day1);
        h.complete(day1).unwrap();
        h.complete(day1 + Duration::days(1)).unwrap();
        assert_eq!(h.complete(day1 + Duration::days(4)).unwrap(), 1);
        assert_eq!(h.best_streak, 2);
    }

    #[test]
    fn refresh_clears_yesterdays_flag() {
        let yesterday = Utc::now() - Duration::days(1);
        let mut h = habit(yesterday);
        h.complete(yesterday).unwrap();
        assert!(h.refresh(Utc::now()));
        assert!(!h.completed);
        assert_eq!(h.streak, 1);
    }

    #[test]
    fn fail_resets_streak() {
        let now = Utc::now();
        let mut h = habit(now);
        h.complete(now).unwrap();
        h.fail(now);
        assert_eq!(h.streak, 0);
        assert_eq!(h.best_streak, 1);
    }
}

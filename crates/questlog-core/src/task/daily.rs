use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{completed_on, Difficulty, Priority};
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Daily {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub notes: Option<String>,
    pub difficulty: Difficulty,
    pub priority: Priority,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Daily {
    pub fn new(
        user_id: &str,
        title: String,
        notes: Option<String>,
        difficulty: Difficulty,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title,
            notes,
            difficulty,
            priority,
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed_on(&self, now: DateTime<Utc>) -> bool {
        self.completed && completed_on(self.completed_at, now.date_naive())
    }

    /// Clear a completion left over from a previous day.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> bool {
        if self.completed && !self.is_completed_on(now) {
            self.completed = false;
            self.completed_at = None;
            return true;
        }
        false
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.is_completed_on(now) {
            return Err(ValidationError::InvalidState(
                "Daily already completed today".into(),
            ));
        }
        self.completed = true;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn uncomplete(&mut self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if !self.is_completed_on(now) {
            return Err(ValidationError::InvalidState(
                "Daily is not completed today".into(),
            ));
        }
        self.completed = false;
        self.completed_at = None;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn daily(now: DateTime<Utc>) -> Daily {
        Daily::new(
            "u1",
            "Inbox zero".into(),
            None,
            Difficulty::Medium,
            Priority::High,
            now,
        )
    }

    #[test]
    fn complete_then_uncomplete() {
        let now = Utc::now();
        let mut d = daily(now);
        d.complete(now).unwrap();
        assert!(d.is_completed_on(now));
        assert!(d.complete(now).is_err());
        d.uncomplete(now).unwrap();
        assert!(!d.completed);
        assert!(d.uncomplete(now).is_err());
    }

    #[test]
    fn yesterdays_completion_does_not_count_today() {
        let yesterday = Utc::now() - Duration::days(1);
        let mut d = daily(yesterday);
        d.complete(yesterday).unwrap();
        let now = Utc::now();
        assert!(!d.is_completed_on(now));
        assert!(d.refresh(now));
        assert!(d.complete(now).is_ok());
    }
}

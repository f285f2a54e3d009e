use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::completed_on;
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineTask {
    pub id: String,
    pub title: String,
    pub completed: bool,
}

impl RoutineTask {
    pub fn new(title: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            completed: false,
        }
    }
}

/// A multi-step routine. Task checkmarks persist until [`Routine::reset`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub tasks: Vec<RoutineTask>,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Routine {
    pub fn new(user_id: &str, title: String, task_titles: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title,
            tasks: task_titles.into_iter().map(RoutineTask::new).collect(),
            last_completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn completed_tasks(&self) -> u32 {
        self.tasks.iter().filter(|t| t.completed).count() as u32
    }

    /// Fraction of tasks checked off, 0.0 for an empty routine.
    pub fn completion_rate(&self) -> f64 {
        if self.tasks.is_empty() {
            return 0.0;
        }
        self.completed_tasks() as f64 / self.tasks.len() as f64
    }

    /// Completion rate as a whole percentage.
    pub fn completion_percent(&self) -> u32 {
        (self.completion_rate() * 100.0).round() as u32
    }

    /// Flip one task's checkmark and return its new value.
    pub fn toggle_task(&mut self, task_id: &str, now: DateTime<Utc>) -> Option<bool> {
        let task = self.tasks.iter_mut().find(|t| t.id == task_id)?;
        task.completed = !task.completed;
        self.updated_at = now;
        Some(task.completed)
    }

    /// Finish the routine and return how many tasks were done.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<u32, ValidationError> {
        if self.tasks.is_empty() {
            return Err(ValidationError::InvalidState("Routine has no tasks".into()));
        }
        if completed_on(self.last_completed_at, now.date_naive()) {
            return Err(ValidationError::InvalidState(
                "Routine already completed today".into(),
            ));
        }
        let done = self.completed_tasks();
        if done == 0 {
            return Err(ValidationError::InvalidState(
                "Complete at least one task before finishing the routine".into(),
            ));
        }
        self.last_completed_at = Some(now);
        self.updated_at = now;
        Ok(done)
    }

    pub fn reset(&mut self, now: DateTime<Utc>) {
        for task in &mut self.tasks {
            task.completed = false;
        }
        self.updated_at = now;
    }
}

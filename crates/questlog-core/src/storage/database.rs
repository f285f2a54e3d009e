//! SQLite storage for the server's authoritative copy.
//!
//! Holds one row per user in `users` and `user_stats`, plus the user's
//! habits, dailies and routines. Every task query is scoped by `user_id`, so
//! an entity owned by someone else reads as absent.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use super::{migrations, parse_datetime_fallback, parse_datetime_opt};
use crate::error::{CoreError, DatabaseError, Result, ValidationError};
use crate::progression::{ProgressionState, StatsStore};
use crate::task::{Daily, Habit, Routine, RoutineTask};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// SQLite database for users, stats and tasks.
pub struct Database {
    conn: Connection,
}

const HABIT_COLUMNS: &str = "id, user_id, title, notes, difficulty, streak, best_streak,
     completed, last_completed_at, created_at, updated_at";

const DAILY_COLUMNS: &str = "id, user_id, title, notes, difficulty, priority, completed,
     completed_at, created_at, updated_at";

fn row_to_habit(row: &rusqlite::Row) -> Result<Habit, rusqlite::Error> {
    let difficulty: String = row.get(4)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(Habit {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        notes: row.get(3)?,
        difficulty: difficulty.parse().unwrap_or_default(),
        streak: row.get(5)?,
        best_streak: row.get(6)?,
        completed: row.get(7)?,
        last_completed_at: parse_datetime_opt(row.get(8)?),
        created_at: parse_datetime_fallback(&created_at),
        updated_at: parse_datetime_fallback(&updated_at),
    })
}

fn row_to_daily(row: &rusqlite::Row) -> Result<Daily, rusqlite::Error> {
    let difficulty: String = row.get(4)?;
    let priority: String = row.get(5)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    Ok(Daily {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        notes: row.get(3)?,
        difficulty: difficulty.parse().unwrap_or_default(),
        priority: priority.parse().unwrap_or_default(),
        completed: row.get(6)?,
        completed_at: parse_datetime_opt(row.get(7)?),
        created_at: parse_datetime_fallback(&created_at),
        updated_at: parse_datetime_fallback(&updated_at),
    })
}

fn row_to_routine(row: &rusqlite::Row) -> Result<Routine, rusqlite::Error> {
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;
    Ok(Routine {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        tasks: Vec::new(),
        last_completed_at: parse_datetime_opt(row.get(3)?),
        created_at: parse_datetime_fallback(&created_at),
        updated_at: parse_datetime_fallback(&updated_at),
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Database {
    /// Open (creating if needed) and migrate the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside a transaction, committing only when it succeeds.
    ///
    /// Nested calls join the outer transaction.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        if !self.conn.is_autocommit() {
            return f(self);
        }
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    // ── Users ────────────────────────────────────────────────────────

    /// Create a user together with a fresh stats row.
    pub fn create_user(&self, username: &str, now: DateTime<Utc>) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationError::MissingField("username".into()).into());
        }
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            created_at: now,
        };

        self.with_transaction(|db| {
            db.conn
                .execute(
                    "INSERT INTO users (id, username, created_at) VALUES (?1, ?2, ?3)",
                    params![user.id, user.username, user.created_at.to_rfc3339()],
                )
                .map_err(|e| {
                    if is_constraint_violation(&e) {
                        CoreError::Validation(ValidationError::InvalidValue {
                            field: "username".into(),
                            message: "already taken".into(),
                        })
                    } else {
                        e.into()
                    }
                })?;
            db.save_stats(&user.id, &ProgressionState::default())?;
            Ok(())
        })?;
        Ok(user)
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE id = ?1",
                params![id],
                |row| {
                    let created_at: String = row.get(2)?;
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        created_at: parse_datetime_fallback(&created_at),
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    // ── Stats ────────────────────────────────────────────────────────

    pub fn get_stats(&self, user_id: &str) -> Result<ProgressionState> {
        self.conn
            .query_row(
                "SELECT level, experience, experience_to_next_level, health, max_health,
                        coins, gems, current_streak
                 FROM user_stats WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(ProgressionState {
                        level: row.get(0)?,
                        experience: row.get(1)?,
                        experience_to_next_level: row.get(2)?,
                        health: row.get(3)?,
                        max_health: row.get(4)?,
                        coins: row.get(5)?,
                        gems: row.get(6)?,
                        current_streak: row.get(7)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| CoreError::not_found("Stats", user_id))
    }

    /// Overwrite the user's stats row.
    pub fn save_stats(&self, user_id: &str, state: &ProgressionState) -> Result<()> {
        self.conn.execute(
            "INSERT INTO user_stats (user_id, level, experience, experience_to_next_level,
                                     health, max_health, coins, gems, current_streak, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(user_id) DO UPDATE SET
                level = excluded.level,
                experience = excluded.experience,
                experience_to_next_level = excluded.experience_to_next_level,
                health = excluded.health,
                max_health = excluded.max_health,
                coins = excluded.coins,
                gems = excluded.gems,
                current_streak = excluded.current_streak,
                updated_at = excluded.updated_at",
            params![
                user_id,
                state.level,
                state.experience,
                state.experience_to_next_level,
                state.health,
                state.max_health,
                state.coins,
                state.gems,
                state.current_streak,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ── Habits ───────────────────────────────────────────────────────

    pub fn create_habit(&self, habit: &Habit) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO habits ({HABIT_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                habit.id,
                habit.user_id,
                habit.title,
                habit.notes,
                habit.difficulty.as_str(),
                habit.streak,
                habit.best_streak,
                habit.completed,
                habit.last_completed_at.map(|t| t.to_rfc3339()),
                habit.created_at.to_rfc3339(),
                habit.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_habit(&self, user_id: &str, id: &str) -> Result<Option<Habit>> {
        let habit = self
            .conn
            .query_row(
                &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1 AND user_id = ?2"),
                params![id, user_id],
                row_to_habit,
            )
            .optional()?;
        Ok(habit)
    }

    pub fn list_habits(&self, user_id: &str) -> Result<Vec<Habit>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HABIT_COLUMNS} FROM habits WHERE user_id = ?1 ORDER BY created_at, id"
        ))?;
        let habits = stmt
            .query_map(params![user_id], row_to_habit)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(habits)
    }

    pub fn update_habit(&self, habit: &Habit) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE habits SET title = ?3, notes = ?4, difficulty = ?5, streak = ?6,
                    best_streak = ?7, completed = ?8, last_completed_at = ?9, updated_at = ?10
             WHERE id = ?1 AND user_id = ?2",
            params![
                habit.id,
                habit.user_id,
                habit.title,
                habit.notes,
                habit.difficulty.as_str(),
                habit.streak,
                habit.best_streak,
                habit.completed,
                habit.last_completed_at.map(|t| t.to_rfc3339()),
                habit.updated_at.to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found("Habit", &habit.id));
        }
        Ok(())
    }

    /// Returns false when no such habit belongs to the user.
    pub fn delete_habit(&self, user_id: &str, id: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM habits WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }

    // ── Dailies ──────────────────────────────────────────────────────

    pub fn create_daily(&self, daily: &Daily) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO dailies ({DAILY_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                daily.id,
                daily.user_id,
                daily.title,
                daily.notes,
                daily.difficulty.as_str(),
                daily.priority.as_str(),
                daily.completed,
                daily.completed_at.map(|t| t.to_rfc3339()),
                daily.created_at.to_rfc3339(),
                daily.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_daily(&self, user_id: &str, id: &str) -> Result<Option<Daily>> {
        let daily = self
            .conn
            .query_row(
                &format!("SELECT {DAILY_COLUMNS} FROM dailies WHERE id = ?1 AND user_id = ?2"),
                params![id, user_id],
                row_to_daily,
            )
            .optional()?;
        Ok(daily)
    }

    pub fn list_dailies(&self, user_id: &str) -> Result<Vec<Daily>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DAILY_COLUMNS} FROM dailies WHERE user_id = ?1 ORDER BY created_at, id"
        ))?;
        let dailies = stmt
            .query_map(params![user_id], row_to_daily)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dailies)
    }

    pub fn update_daily(&self, daily: &Daily) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE dailies SET title = ?3, notes = ?4, difficulty = ?5, priority = ?6,
                    completed = ?7, completed_at = ?8, updated_at = ?9
             WHERE id = ?1 AND user_id = ?2",
            params![
                daily.id,
                daily.user_id,
                daily.title,
                daily.notes,
                daily.difficulty.as_str(),
                daily.priority.as_str(),
                daily.completed,
                daily.completed_at.map(|t| t.to_rfc3339()),
                daily.updated_at.to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            return Err(CoreError::not_found("Daily", &daily.id));
        }
        Ok(())
    }

    pub fn delete_daily(&self, user_id: &str, id: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM dailies WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }

    // ── Routines ─────────────────────────────────────────────────────

    pub fn create_routine(&self, routine: &Routine) -> Result<()> {
        self.with_transaction(|db| {
            db.conn.execute(
                "INSERT INTO routines (id, user_id, title, last_completed_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    routine.id,
                    routine.user_id,
                    routine.title,
                    routine.last_completed_at.map(|t| t.to_rfc3339()),
                    routine.created_at.to_rfc3339(),
                    routine.updated_at.to_rfc3339(),
                ],
            )?;
            db.insert_routine_tasks(&routine.id, &routine.tasks)
        })
    }

    fn insert_routine_tasks(&self, routine_id: &str, tasks: &[RoutineTask]) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO routine_tasks (id, routine_id, position, title, completed)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (position, task) in tasks.iter().enumerate() {
            stmt.execute(params![
                task.id,
                routine_id,
                position as i64,
                task.title,
                task.completed
            ])?;
        }
        Ok(())
    }

    fn load_routine_tasks(&self, routine: &mut Routine) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, completed FROM routine_tasks
             WHERE routine_id = ?1 ORDER BY position",
        )?;
        routine.tasks = stmt
            .query_map(params![routine.id], |row| {
                Ok(RoutineTask {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    completed: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(())
    }

    pub fn get_routine(&self, user_id: &str, id: &str) -> Result<Option<Routine>> {
        let routine = self
            .conn
            .query_row(
                "SELECT id, user_id, title, last_completed_at, created_at, updated_at
                 FROM routines WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                row_to_routine,
            )
            .optional()?;
        match routine {
            Some(mut routine) => {
                self.load_routine_tasks(&mut routine)?;
                Ok(Some(routine))
            }
            None => Ok(None),
        }
    }

    pub fn list_routines(&self, user_id: &str) -> Result<Vec<Routine>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, last_completed_at, created_at, updated_at
             FROM routines WHERE user_id = ?1 ORDER BY created_at, id",
        )?;
        let mut routines = stmt
            .query_map(params![user_id], row_to_routine)?
            .collect::<Result<Vec<_>, _>>()?;
        for routine in &mut routines {
            self.load_routine_tasks(routine)?;
        }
        Ok(routines)
    }

    /// Update a routine and replace its task list.
    pub fn update_routine(&self, routine: &Routine) -> Result<()> {
        self.with_transaction(|db| {
            let changed = db.conn.execute(
                "UPDATE routines SET title = ?3, last_completed_at = ?4, updated_at = ?5
                 WHERE id = ?1 AND user_id = ?2",
                params![
                    routine.id,
                    routine.user_id,
                    routine.title,
                    routine.last_completed_at.map(|t| t.to_rfc3339()),
                    routine.updated_at.to_rfc3339(),
                ],
            )?;
            if changed == 0 {
                return Err(CoreError::not_found("Routine", &routine.id));
            }
            db.conn.execute(
                "DELETE FROM routine_tasks WHERE routine_id = ?1",
                params![routine.id],
            )?;
            db.insert_routine_tasks(&routine.id, &routine.tasks)
        })
    }

    pub fn delete_routine(&self, user_id: &str, id: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM routines WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }
}

/// [`StatsStore`] backed by one user's `user_stats` row.
pub struct UserStatsStore<'a> {
    db: &'a Database,
    user_id: &'a str,
}

impl<'a> UserStatsStore<'a> {
    pub fn new(db: &'a Database, user_id: &'a str) -> Self {
        Self { db, user_id }
    }
}

impl StatsStore for UserStatsStore<'_> {
    fn load(&mut self) -> Result<Option<ProgressionState>> {
        self.db.get_stats(self.user_id).map(Some)
    }

    fn save(&mut self, state: &ProgressionState) -> Result<()> {
        self.db.save_stats(self.user_id, state)
    }
}

//! Database schema migrations for the server database.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::warn;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: users, their stats row and the three task tables.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id         TEXT PRIMARY KEY,
            username   TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_stats (
            user_id                  TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
            level                    INTEGER NOT NULL DEFAULT 1,
            experience               INTEGER NOT NULL DEFAULT 0,
            experience_to_next_level INTEGER NOT NULL DEFAULT 60,
            health                   INTEGER NOT NULL DEFAULT 50,
            max_health               INTEGER NOT NULL DEFAULT 50,
            coins                    INTEGER NOT NULL DEFAULT 0,
            gems                     INTEGER NOT NULL DEFAULT 0,
            current_streak           INTEGER NOT NULL DEFAULT 0,
            updated_at               TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habits (
            id                TEXT PRIMARY KEY,
            user_id           TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title             TEXT NOT NULL,
            notes             TEXT,
            difficulty        TEXT NOT NULL DEFAULT 'medium',
            streak            INTEGER NOT NULL DEFAULT 0,
            best_streak       INTEGER NOT NULL DEFAULT 0,
            completed         INTEGER NOT NULL DEFAULT 0,
            last_completed_at TEXT,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS dailies (
            id           TEXT PRIMARY KEY,
            user_id      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title        TEXT NOT NULL,
            notes        TEXT,
            difficulty   TEXT NOT NULL DEFAULT 'medium',
            priority     TEXT NOT NULL DEFAULT 'low',
            completed    INTEGER NOT NULL DEFAULT 0,
            completed_at TEXT,
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS routines (
            id                TEXT PRIMARY KEY,
            user_id           TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title             TEXT NOT NULL,
            last_completed_at TEXT,
            created_at        TEXT NOT NULL,
            updated_at        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS routine_tasks (
            id         TEXT PRIMARY KEY,
            routine_id TEXT NOT NULL REFERENCES routines(id) ON DELETE CASCADE,
            position   INTEGER NOT NULL,
            title      TEXT NOT NULL,
            completed  INTEGER NOT NULL DEFAULT 0
        );",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: indexes for the per-user list queries.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_habits_user ON habits(user_id, created_at);
         CREATE INDEX IF NOT EXISTS idx_dailies_user ON dailies(user_id, created_at);
         CREATE INDEX IF NOT EXISTS idx_routines_user ON routines(user_id, created_at);
         CREATE INDEX IF NOT EXISTS idx_routine_tasks_routine ON routine_tasks(routine_id, position);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

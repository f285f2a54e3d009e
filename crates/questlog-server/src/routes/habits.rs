use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use questlog_core::task::validate_title;
use questlog_core::{CoreError, Difficulty, Habit, ProgressEvent};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{apply_event, normalize_notes, ApiJson, RewardOutcome};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::server::SharedState;

#[derive(Debug, Deserialize)]
pub struct CreateHabit {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateHabit {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Serialize)]
pub struct HabitActionResponse {
    pub habit: Habit,
    #[serde(flatten)]
    pub outcome: RewardOutcome,
}

pub fn habit_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/habits", get(list_habits).post(create_habit))
        .route(
            "/api/habits/:id",
            get(get_habit).put(update_habit).delete(delete_habit),
        )
        .route("/api/habits/:id/complete", post(complete_habit))
        .route("/api/habits/:id/fail", post(fail_habit))
}

async fn list_habits(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Habit>>, ApiError> {
    let db = state.db.lock().await;
    let now = Utc::now();
    let mut habits = db.list_habits(&user.id)?;
    for habit in &mut habits {
        if habit.refresh(now) {
            db.update_habit(habit)?;
        }
    }
    Ok(Json(habits))
}

async fn create_habit(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<CreateHabit>,
) -> Result<(StatusCode, Json<Habit>), ApiError> {
    let title = validate_title(&req.title).map_err(CoreError::from)?;
    let habit = Habit::new(
        &user.id,
        title,
        normalize_notes(req.notes),
        req.difficulty,
        Utc::now(),
    );
    let db = state.db.lock().await;
    db.create_habit(&habit)?;
    info!("  Created habit {} for {}", habit.id, user.id);
    Ok((StatusCode::CREATED, Json(habit)))
}

async fn get_habit(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Habit>, ApiError> {
    let db = state.db.lock().await;
    let mut habit = db
        .get_habit(&user.id, &id)?
        .ok_or_else(|| CoreError::not_found("Habit", &id))?;
    if habit.refresh(Utc::now()) {
        db.update_habit(&habit)?;
    }
    Ok(Json(habit))
}

async fn update_habit(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateHabit>,
) -> Result<Json<Habit>, ApiError> {
    let title = req
        .title
        .as_deref()
        .map(validate_title)
        .transpose()
        .map_err(CoreError::from)?;

    let db = state.db.lock().await;
    let mut habit = db
        .get_habit(&user.id, &id)?
        .ok_or_else(|| CoreError::not_found("Habit", &id))?;
    if let Some(title) = title {
        habit.title = title;
    }
    if req.notes.is_some() {
        habit.notes = normalize_notes(req.notes);
    }
    if let Some(difficulty) = req.difficulty {
        habit.difficulty = difficulty;
    }
    let now = Utc::now();
    habit.refresh(now);
    habit.updated_at = now;
    db.update_habit(&habit)?;
    Ok(Json(habit))
}

async fn delete_habit(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let db = state.db.lock().await;
    if !db.delete_habit(&user.id, &id)? {
        return Err(CoreError::not_found("Habit", &id).into());
    }
    info!("  Deleted habit {}", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn complete_habit(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<HabitActionResponse>, ApiError> {
    let db = state.db.lock().await;
    let now = Utc::now();
    let response = db.with_transaction(|db| {
        let mut habit = db
            .get_habit(&user.id, &id)?
            .ok_or_else(|| CoreError::not_found("Habit", &id))?;
        let new_streak = habit.complete(now)?;
        db.update_habit(&habit)?;
        let event = ProgressEvent::HabitCompleted {
            difficulty: habit.difficulty,
            new_streak,
        };
        let outcome = apply_event(db, &user, event, now)?;
        Ok(HabitActionResponse { habit, outcome })
    })?;
    info!(
        "  Habit {} completed (streak {}, +{} xp)",
        id, response.habit.streak, response.outcome.rewards.experience
    );
    Ok(Json(response))
}

async fn fail_habit(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<HabitActionResponse>, ApiError> {
    let db = state.db.lock().await;
    let now = Utc::now();
    let response = db.with_transaction(|db| {
        let mut habit = db
            .get_habit(&user.id, &id)?
            .ok_or_else(|| CoreError::not_found("Habit", &id))?;
        habit.fail(now);
        db.update_habit(&habit)?;
        let event = ProgressEvent::HabitFailed {
            difficulty: habit.difficulty,
        };
        let outcome = apply_event(db, &user, event, now)?;
        Ok(HabitActionResponse { habit, outcome })
    })?;
    info!("  Habit {} failed", id);
    Ok(Json(response))
}

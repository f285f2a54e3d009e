use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use questlog_core::task::validate_title;
use questlog_core::{CoreError, ProgressEvent, Routine, RoutineTask};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{apply_event, ApiJson, RewardOutcome};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::server::SharedState;

#[derive(Debug, Deserialize)]
pub struct CreateRoutine {
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<String>,
}

/// `tasks`, when present, replaces the task list with fresh unchecked
/// tasks.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRoutine {
    pub title: Option<String>,
    pub tasks: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct RoutineCompleteResponse {
    pub routine: Routine,
    #[serde(flatten)]
    pub outcome: RewardOutcome,
    /// Share of tasks done, 0..=100.
    #[serde(rename = "completionRate")]
    pub completion_rate: u32,
}

pub fn routine_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/routines", get(list_routines).post(create_routine))
        .route(
            "/api/routines/:id",
            get(get_routine).put(update_routine).delete(delete_routine),
        )
        .route(
            "/api/routines/:id/tasks/:task_id/toggle",
            post(toggle_task),
        )
        .route("/api/routines/:id/complete", post(complete_routine))
        .route("/api/routines/:id/reset", post(reset_routine))
}

fn validate_tasks(titles: &[String]) -> Result<Vec<String>, ApiError> {
    titles
        .iter()
        .map(|t| validate_title(t).map_err(|e| ApiError::from(CoreError::from(e))))
        .collect()
}

async fn list_routines(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Routine>>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_routines(&user.id)?))
}

async fn create_routine(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<CreateRoutine>,
) -> Result<(StatusCode, Json<Routine>), ApiError> {
    let title = validate_title(&req.title).map_err(CoreError::from)?;
    let tasks = validate_tasks(&req.tasks)?;
    let routine = Routine::new(&user.id, title, tasks, Utc::now());
    let db = state.db.lock().await;
    db.create_routine(&routine)?;
    info!(
        "  Created routine {} with {} tasks",
        routine.id,
        routine.tasks.len()
    );
    Ok((StatusCode::CREATED, Json(routine)))
}

async fn get_routine(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Routine>, ApiError> {
    let db = state.db.lock().await;
    let routine = db
        .get_routine(&user.id, &id)?
        .ok_or_else(|| CoreError::not_found("Routine", &id))?;
    Ok(Json(routine))
}

async fn update_routine(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateRoutine>,
) -> Result<Json<Routine>, ApiError> {
    let title = req
        .title
        .as_deref()
        .map(validate_title)
        .transpose()
        .map_err(CoreError::from)?;
    let tasks = req.tasks.as_deref().map(validate_tasks).transpose()?;

    let db = state.db.lock().await;
    let mut routine = db
        .get_routine(&user.id, &id)?
        .ok_or_else(|| CoreError::not_found("Routine", &id))?;
    if let Some(title) = title {
        routine.title = title;
    }
    if let Some(tasks) = tasks {
        routine.tasks = tasks.into_iter().map(RoutineTask::new).collect();
    }
    routine.updated_at = Utc::now();
    db.update_routine(&routine)?;
    Ok(Json(routine))
}

async fn delete_routine(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let db = state.db.lock().await;
    if !db.delete_routine(&user.id, &id)? {
        return Err(CoreError::not_found("Routine", &id).into());
    }
    info!("  Deleted routine {}", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_task(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path((id, task_id)): Path<(String, String)>,
) -> Result<Json<Routine>, ApiError> {
    let db = state.db.lock().await;
    let mut routine = db
        .get_routine(&user.id, &id)?
        .ok_or_else(|| CoreError::not_found("Routine", &id))?;
    if routine.toggle_task(&task_id, Utc::now()).is_none() {
        return Err(CoreError::not_found("RoutineTask", &task_id).into());
    }
    db.update_routine(&routine)?;
    Ok(Json(routine))
}

async fn complete_routine(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<RoutineCompleteResponse>, ApiError> {
    let db = state.db.lock().await;
    let now = Utc::now();
    let response = db.with_transaction(|db| {
        let mut routine = db
            .get_routine(&user.id, &id)?
            .ok_or_else(|| CoreError::not_found("Routine", &id))?;
        let completed_tasks = routine.complete(now)?;
        db.update_routine(&routine)?;
        let outcome = apply_event(
            db,
            &user,
            ProgressEvent::RoutineCompleted { completed_tasks },
            now,
        )?;
        Ok(RoutineCompleteResponse {
            completion_rate: routine.completion_percent(),
            routine,
            outcome,
        })
    })?;
    info!(
        "  Routine {} completed ({}%)",
        id, response.completion_rate
    );
    Ok(Json(response))
}

async fn reset_routine(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Routine>, ApiError> {
    let db = state.db.lock().await;
    let mut routine = db
        .get_routine(&user.id, &id)?
        .ok_or_else(|| CoreError::not_found("Routine", &id))?;
    routine.reset(Utc::now());
    db.update_routine(&routine)?;
    Ok(Json(routine))
}

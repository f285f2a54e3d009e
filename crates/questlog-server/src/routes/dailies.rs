use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use questlog_core::task::validate_title;
use questlog_core::{CoreError, Daily, Difficulty, Priority, ProgressEvent};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{apply_event, normalize_notes, ApiJson, RewardOutcome};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::server::SharedState;

#[derive(Debug, Deserialize)]
pub struct CreateDaily {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDaily {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Serialize)]
pub struct DailyActionResponse {
    pub daily: Daily,
    #[serde(flatten)]
    pub outcome: RewardOutcome,
}

pub fn daily_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/dailies", get(list_dailies).post(create_daily))
        .route(
            "/api/dailies/:id",
            get(get_daily).put(update_daily).delete(delete_daily),
        )
        .route("/api/dailies/:id/complete", post(complete_daily))
        .route("/api/dailies/:id/uncomplete", post(uncomplete_daily))
}

async fn list_dailies(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Daily>>, ApiError> {
    let db = state.db.lock().await;
    let now = Utc::now();
    let mut dailies = db.list_dailies(&user.id)?;
    for daily in &mut dailies {
        if daily.refresh(now) {
            db.update_daily(daily)?;
        }
    }
    Ok(Json(dailies))
}

async fn create_daily(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<CreateDaily>,
) -> Result<(StatusCode, Json<Daily>), ApiError> {
    let title = validate_title(&req.title).map_err(CoreError::from)?;
    let daily = Daily::new(
        &user.id,
        title,
        normalize_notes(req.notes),
        req.difficulty,
        req.priority,
        Utc::now(),
    );
    let db = state.db.lock().await;
    db.create_daily(&daily)?;
    info!("  Created daily {} for {}", daily.id, user.id);
    Ok((StatusCode::CREATED, Json(daily)))
}

async fn get_daily(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Daily>, ApiError> {
    let db = state.db.lock().await;
    let mut daily = db
        .get_daily(&user.id, &id)?
        .ok_or_else(|| CoreError::not_found("Daily", &id))?;
    if daily.refresh(Utc::now()) {
        db.update_daily(&daily)?;
    }
    Ok(Json(daily))
}

async fn update_daily(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateDaily>,
) -> Result<Json<Daily>, ApiError> {
    let title = req
        .title
        .as_deref()
        .map(validate_title)
        .transpose()
        .map_err(CoreError::from)?;

    let db = state.db.lock().await;
    let mut daily = db
        .get_daily(&user.id, &id)?
        .ok_or_else(|| CoreError::not_found("Daily", &id))?;
    if let Some(title) = title {
        daily.title = title;
    }
    if req.notes.is_some() {
        daily.notes = normalize_notes(req.notes);
    }
    if let Some(difficulty) = req.difficulty {
        daily.difficulty = difficulty;
    }
    if let Some(priority) = req.priority {
        daily.priority = priority;
    }
    let now = Utc::now();
    daily.refresh(now);
    daily.updated_at = now;
    db.update_daily(&daily)?;
    Ok(Json(daily))
}

async fn delete_daily(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let db = state.db.lock().await;
    if !db.delete_daily(&user.id, &id)? {
        return Err(CoreError::not_found("Daily", &id).into());
    }
    info!("  Deleted daily {}", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn complete_daily(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<DailyActionResponse>, ApiError> {
    let db = state.db.lock().await;
    let now = Utc::now();
    let response = db.with_transaction(|db| {
        let mut daily = db
            .get_daily(&user.id, &id)?
            .ok_or_else(|| CoreError::not_found("Daily", &id))?;
        daily.complete(now)?;
        db.update_daily(&daily)?;
        let event = ProgressEvent::DailyCompleted {
            difficulty: daily.difficulty,
            priority: daily.priority,
        };
        let outcome = apply_event(db, &user, event, now)?;
        Ok(DailyActionResponse { daily, outcome })
    })?;
    info!(
        "  Daily {} completed (+{} xp)",
        id, response.outcome.rewards.experience
    );
    Ok(Json(response))
}

/// Take back today's completion together with the experience it earned.
async fn uncomplete_daily(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<DailyActionResponse>, ApiError> {
    let db = state.db.lock().await;
    let now = Utc::now();
    let response = db.with_transaction(|db| {
        let mut daily = db
            .get_daily(&user.id, &id)?
            .ok_or_else(|| CoreError::not_found("Daily", &id))?;
        daily.uncomplete(now)?;
        db.update_daily(&daily)?;
        let event = ProgressEvent::DailyUncompleted {
            difficulty: daily.difficulty,
            priority: daily.priority,
        };
        let outcome = apply_event(db, &user, event, now)?;
        Ok(DailyActionResponse { daily, outcome })
    })?;
    info!("  Daily {} uncompleted", id);
    Ok(Json(response))
}

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use questlog_core::{ProgressTracker, ProgressionState, UserStatsStore};
use tracing::info;

use super::ApiJson;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::server::SharedState;

pub fn stats_routes() -> Router<SharedState> {
    Router::new().route("/api/stats", get(get_stats).post(put_stats))
}

async fn get_stats(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ProgressionState>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.get_stats(&user.id)?))
}

/// Last write wins: the posted state replaces the stored one.
async fn put_stats(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    ApiJson(incoming): ApiJson<ProgressionState>,
) -> Result<Json<ProgressionState>, ApiError> {
    let db = state.db.lock().await;
    let mut tracker = ProgressTracker::load(UserStatsStore::new(&db, &user.id))?;
    tracker.overwrite(incoming)?;
    let stored = tracker.state().clone();
    info!("  Stats overwritten for {} (level {})", user.id, stored.level);
    Ok(Json(stored))
}

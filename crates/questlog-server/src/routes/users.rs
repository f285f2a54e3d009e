use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use questlog_core::User;
use serde::Deserialize;
use tracing::info;

use super::ApiJson;
use crate::error::ApiError;
use crate::server::SharedState;

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
}

pub fn user_routes() -> Router<SharedState> {
    Router::new().route("/api/users", post(create_user))
}

async fn create_user(
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<CreateUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let db = state.db.lock().await;
    let user = db.create_user(&req.username, Utc::now())?;
    info!("  Created user {} ({})", user.username, user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

//! API routes.

mod dailies;
mod habits;
mod routines;
mod stats;
mod users;

use axum::extract::FromRequest;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use questlog_core::error::Result;
use questlog_core::{
    Database, LevelChange, Outcome, ProgressEvent, ProgressTracker, ProgressionState, Reward,
    User, UserStatsStore,
};
use serde::Serialize;

use crate::error::ApiError;
use crate::server::SharedState;

pub use dailies::daily_routes;
pub use habits::habit_routes;
pub use routines::routine_routes;
pub use stats::stats_routes;
pub use users::user_routes;

/// JSON body extractor whose rejections are reported as 400s.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// A user together with their current stats.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: String,
    pub username: String,
    #[serde(flatten)]
    pub stats: ProgressionState,
}

impl UserView {
    pub fn new(user: &User, stats: ProgressionState) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            stats,
        }
    }
}

/// Fields shared by every reward endpoint's response.
#[derive(Debug, Serialize)]
pub struct RewardOutcome {
    pub user: UserView,
    pub rewards: Reward,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl RewardOutcome {
    fn new(user: &User, outcome: Outcome) -> Self {
        Self {
            message: outcome.change.as_ref().map(LevelChange::message),
            rewards: outcome.reward,
            user: UserView::new(user, outcome.state),
        }
    }
}

/// Run one event through the user's tracker. Callers wrap this in the
/// same transaction as the task update.
pub(crate) fn apply_event(
    db: &Database,
    user: &User,
    event: ProgressEvent,
    now: DateTime<Utc>,
) -> Result<RewardOutcome> {
    let mut tracker = ProgressTracker::load(UserStatsStore::new(db, &user.id))?;
    let outcome = tracker.apply_at(event, now)?;
    Ok(RewardOutcome::new(user, outcome))
}

/// Blank notes are stored as none.
pub(crate) fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

// ── Health ─────────────────────────────────────────────────────────

pub fn health_routes() -> Router<SharedState> {
    Router::new().route("/api/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}

//! Caller identity.
//!
//! There is no token scheme. The caller names itself with the
//! `x-user-id` header and the id must belong to an existing user.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use questlog_core::sync::USER_HEADER;
use questlog_core::User;

use crate::error::ApiError;
use crate::server::SharedState;

/// The user named by the request's `x-user-id` header.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_HEADER} header")))?
            .to_string();

        let db = state.db.lock().await;
        match db.get_user(&id)? {
            Some(user) => Ok(CurrentUser(user)),
            None => Err(ApiError::Unauthorized(format!("unknown user: {id}"))),
        }
    }
}

use reqwest::{Client, Response};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::{CoreError, Result};
use crate::progression::ProgressionState;
use crate::storage::{SyncConfig, User};

/// Header the server reads the caller's user id from.
pub const USER_HEADER: &str = "x-user-id";

/// HTTP client for the progression endpoints.
pub struct SyncClient {
    base_url: Url,
    user_id: String,
    http_client: Client,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
}

impl SyncClient {
    pub fn new(base_url: &str, user_id: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CoreError::Sync(format!("invalid server url '{base_url}': {e}")))?;
        Ok(Self {
            base_url,
            user_id: user_id.into(),
            http_client: Client::new(),
        })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Self::new(&config.server_url, config.user_id.clone())
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| CoreError::Sync(format!("invalid endpoint '{path}': {e}")))
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(CoreError::Sync(format!("server returned {status}: {body}")))
    }

    /// Create a user on the server. Does not need a user id.
    pub async fn register(&self, username: &str) -> Result<User> {
        let resp = self
            .http_client
            .post(self.endpoint("/api/users")?)
            .json(&RegisterRequest { username })
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Overwrite the server's copy with `state`.
    pub async fn push_stats(&self, state: &ProgressionState) -> Result<ProgressionState> {
        debug!(level = state.level, "pushing stats");
        let resp = self
            .http_client
            .post(self.endpoint("/api/stats")?)
            .header(USER_HEADER, &self.user_id)
            .json(state)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Fetch the server's copy.
    pub async fn pull_stats(&self) -> Result<ProgressionState> {
        let resp = self
            .http_client
            .get(self.endpoint("/api/stats")?)
            .header(USER_HEADER, &self.user_id)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}

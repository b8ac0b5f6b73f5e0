//! Mastodon REST client: login, direct replies, and the user stream.

use crate::stream::NotificationStream;
use crate::types::{CredentialAccount, PostedStatus};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Timeout for one-shot REST calls (login, post). The streaming request is
/// exempt: heartbeats keep it alive indefinitely.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum MastoError {
    #[error("Unable to connect to instance {url}: {reason}")]
    Connection { url: String, reason: String },

    #[error("Failed to post status: {0}")]
    Post(String),

    #[error("Notification stream error: {0}")]
    Stream(String),
}

/// The reply-posting collaborator: sends `text` as a direct status in reply
/// to an existing one and returns the new status (its id keys the recorded
/// conversation turn).
#[async_trait]
pub trait StatusPoster: Send + Sync {
    async fn post_direct_reply(
        &self,
        text: &str,
        in_reply_to_id: &str,
    ) -> Result<PostedStatus, MastoError>;
}

/// Authenticated client for one Mastodon instance.
#[derive(Clone)]
pub struct MastoClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl MastoClient {
    /// Logs in by verifying the access token against the instance. Returns
    /// the client and the bot's own account. Failure here is fatal to the
    /// relay: there is no event loop without a session.
    pub async fn connect(
        instance_url: &str,
        access_token: &str,
    ) -> Result<(Self, CredentialAccount), MastoError> {
        let connection = |reason: String| MastoError::Connection {
            url: instance_url.to_string(),
            reason,
        };

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| connection(e.to_string()))?;

        let client = Self {
            http,
            base_url: instance_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        };

        let account: CredentialAccount = client
            .http
            .get(format!("{}/api/v1/accounts/verify_credentials", client.base_url))
            .bearer_auth(&client.access_token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| connection(e.to_string()))?
            .error_for_status()
            .map_err(|e| connection(e.to_string()))?
            .json()
            .await
            .map_err(|e| connection(e.to_string()))?;

        info!(instance = %client.base_url, username = %account.username, "logged in");
        Ok((client, account))
    }

    /// Opens the user notification stream. Infinite and not restartable: on
    /// error or EOF the caller must tear down and reconnect from scratch.
    pub async fn stream_user_notifications(&self) -> Result<NotificationStream, MastoError> {
        let response = self
            .http
            .get(format!("{}/api/v1/streaming/user", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| MastoError::Stream(e.to_string()))?
            .error_for_status()
            .map_err(|e| MastoError::Stream(e.to_string()))?;

        info!(instance = %self.base_url, "user notification stream open");
        Ok(NotificationStream::new(response.bytes_stream().boxed()))
    }
}

#[async_trait]
impl StatusPoster for MastoClient {
    async fn post_direct_reply(
        &self,
        text: &str,
        in_reply_to_id: &str,
    ) -> Result<PostedStatus, MastoError> {
        let posted: PostedStatus = self
            .http
            .post(format!("{}/api/v1/statuses", self.base_url))
            .bearer_auth(&self.access_token)
            .timeout(REQUEST_TIMEOUT)
            .json(&json!({
                "status": text,
                "visibility": "direct",
                "in_reply_to_id": in_reply_to_id,
            }))
            .send()
            .await
            .map_err(|e| MastoError::Post(e.to_string()))?
            .error_for_status()
            .map_err(|e| MastoError::Post(e.to_string()))?
            .json()
            .await
            .map_err(|e| MastoError::Post(e.to_string()))?;

        info!(status_id = %posted.id, in_reply_to_id = %in_reply_to_id, "direct reply posted");
        Ok(posted)
    }
}

//! Forwarding tweets to the external posting API.
//!
//! One POST per call, no retries. Anything other than HTTP 200 is reported
//! back as a failure carrying the remote status and body verbatim.

use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::{Client, StatusCode};
use serde_json::json;

use crate::config::PostingConfig;
use crate::error::Result;

/// Result of a single posting attempt that reached the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Success,
    Failure { status: u16, body: String },
}

/// Sends tweet text to an external posting service.
#[async_trait]
pub trait TweetPoster: Send + Sync {
    /// Network failures are returned as `Err(TweetError::Transport)`.
    async fn post(&self, content: &str) -> Result<PostOutcome>;
}

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// Newlines and tabs become spaces, other control characters become `?`, and
/// anything past `max_len` characters is cut off with a note of the original
/// byte length.
pub fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    if sanitized.chars().count() > max_len {
        let truncated: String = sanitized.chars().take(max_len).collect();
        format!("{}... [truncated, {} total bytes]", truncated, text.len())
    } else {
        sanitized
    }
}

/// Client for the twitter-clone `post tweet` endpoint.
pub struct CloneApiPoster {
    client: Client,
    url: String,
    api_key: String,
    username: String,
}

impl CloneApiPoster {
    pub fn new(client: Client, config: &PostingConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            username: config.username.clone(),
        }
    }
}

#[async_trait]
impl TweetPoster for CloneApiPoster {
    async fn post(&self, content: &str) -> Result<PostOutcome> {
        info!(
            "Posting tweet as '{}': '{}'",
            self.username,
            sanitize_for_logging(content, 80)
        );

        let payload = json!({
            "username": self.username,
            "text": content,
        });
        debug!("Request URL: {}", self.url);
        debug!("Request headers: api-key: [REDACTED], Content-Type: application/json");

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!("Posting API request failed: {}", e);
                e
            })?;

        let status = response.status();
        info!("Posting API responded with status: {}", status);

        if status == StatusCode::OK {
            return Ok(PostOutcome::Success);
        }

        let body = response.text().await?;
        error!("Posting API rejected tweet - Status: {}", status);
        debug!(
            "Posting API error response: {}",
            sanitize_for_logging(&body, 200)
        );
        Ok(PostOutcome::Failure {
            status: status.as_u16(),
            body,
        })
    }
}

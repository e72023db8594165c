//! Error types for the tweetsmith service.
//!
//! A single error enum covers every failure the service layer can report.
//! The HTTP layer maps each variant to a status code (see `handlers::ApiError`).

use thiserror::Error;

/// Errors produced by the store, the outbound clients and the tweet service.
#[derive(Debug, Error)]
pub enum TweetError {
    /// The referenced tweet id does not exist.
    #[error("Tweet {0} not found")]
    NotFound(i64),

    /// The operation is not allowed in the tweet's current lifecycle state.
    #[error("{0}")]
    InvalidState(String),

    /// A required request field was missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The posting API answered with something other than HTTP 200.
    #[error("Posting API returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Network failure while talking to an external API.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The text-generation API failed or returned an unusable response.
    #[error("Error generating tweet: {0}")]
    Generation(String),

    /// Startup configuration was missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<reqwest::Error> for TweetError {
    fn from(err: reqwest::Error) -> Self {
        TweetError::Transport(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TweetError>;

//! Configuration module for the tweetsmith service.
//!
//! All settings are read once at startup into an [`AppConfig`] which is then
//! handed to the component constructors. Nothing re-reads the environment
//! after that.

use log::{debug, error, info, warn};
use std::env;

use crate::error::{Result, TweetError};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_POSTING_USERNAME: &str = "dipayan";
pub const DEFAULT_FRONTEND_URL: &str = "*";

/// Settings for the Gemini text-generation API.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// Settings for the external tweet-posting API.
#[derive(Debug, Clone)]
pub struct PostingConfig {
    /// Full URL of the post-tweet endpoint.
    pub url: String,
    pub api_key: String,
    /// Username sent along with every posted tweet.
    pub username: String,
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub posting: PostingConfig,
    /// PostgreSQL connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Origin allowed by CORS in addition to the local dev frontend.
    pub frontend_url: String,
    /// Store the hashtag-stripped body instead of the full generated text.
    pub strip_hashtags: bool,
}

/// Masks a secret for logging, keeping only its first four characters.
pub fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    format!("{}...", prefix)
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => {
            info!("Found {} with length: {}", key, value.len());
            Ok(value)
        }
        None => {
            error!("Missing {} environment variable", key);
            Err(TweetError::Config(format!(
                "Missing {} environment variable",
                key
            )))
        }
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(TweetError::Config(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

impl AppConfig {
    /// Loads the configuration from process environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `GEMINI_API_KEY`: API key for Google Gemini
    /// - `TWITTER_CLONE_URL`: URL of the post-tweet endpoint
    /// - `TWITTER_CLONE_API_KEY`: API key sent in the `api-key` header
    ///
    /// # Optional Environment Variables
    ///
    /// - `GEMINI_MODEL`: defaults to `gemini-2.0-flash`
    /// - `GEMINI_BASE_URL`: defaults to the public v1beta endpoint
    /// - `TWITTER_CLONE_USERNAME`: defaults to `dipayan`
    /// - `DATABASE_URL` (or `DB_URL`): PostgreSQL connection string
    /// - `FRONTEND_URL`: allowed CORS origin, defaults to `*`
    /// - `STRIP_HASHTAGS`: defaults to `true`
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let gemini_key = required(&lookup, "GEMINI_API_KEY")?;
        debug!("Gemini API key (masked): {}", mask_secret(&gemini_key));

        let gemini = GeminiConfig {
            api_key: gemini_key,
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: lookup("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
        };
        url::Url::parse(&gemini.base_url).map_err(|e| {
            TweetError::Config(format!("GEMINI_BASE_URL is not a valid URL: {}", e))
        })?;

        let posting_url = required(&lookup, "TWITTER_CLONE_URL")?;
        url::Url::parse(&posting_url).map_err(|e| {
            TweetError::Config(format!("TWITTER_CLONE_URL is not a valid URL: {}", e))
        })?;
        let posting_key = required(&lookup, "TWITTER_CLONE_API_KEY")?;
        debug!("Posting API key (masked): {}", mask_secret(&posting_key));

        let posting = PostingConfig {
            url: posting_url,
            api_key: posting_key,
            username: lookup("TWITTER_CLONE_USERNAME")
                .unwrap_or_else(|| DEFAULT_POSTING_USERNAME.to_string()),
        };

        let database_url = lookup("DATABASE_URL")
            .or_else(|| lookup("DB_URL"))
            .filter(|v| !v.trim().is_empty());
        if database_url.is_none() {
            warn!("No DATABASE_URL or DB_URL set - tweets will be kept in memory only");
        }

        let frontend_url =
            lookup("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string());

        let strip_hashtags = match lookup("STRIP_HASHTAGS") {
            Some(raw) => parse_flag("STRIP_HASHTAGS", &raw)?,
            None => true,
        };

        info!(
            "Configuration loaded (model: {}, strip hashtags: {}, frontend: {})",
            gemini.model, strip_hashtags, frontend_url
        );

        Ok(AppConfig {
            gemini,
            posting,
            database_url,
            frontend_url,
            strip_hashtags,
        })
    }
}

/// Gets the server port from environment variables or returns the default.
///
/// This function reads the `PORT` environment variable and parses it as a u16.
/// If the environment variable is not set it defaults to 3000; an unparsable
/// value is logged and also falls back to 3000.
pub fn get_server_port() -> u16 {
    match env::var("PORT") {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("PORT '{}' is not a valid port number, using 3000", raw);
            3000
        }),
        Err(_) => 3000,
    }
}

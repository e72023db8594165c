//! # Tweetsmith Library
//!
//! A Rust web service library that generates short tweets about a topic with
//! Google Gemini, keeps them in PostgreSQL, lets them be edited while they are
//! drafts, and forwards them to an external tweet-posting API.
//!
//! ## Features
//!
//! - Tweet generation with hashtag extraction
//! - Draft/posted lifecycle with atomic, at-most-once posting
//! - PostgreSQL storage, or an in-memory store when no database is configured
//! - Structured logging
//! - Health check endpoint
//!
//! ## Configuration
//!
//! See [`config::AppConfig::from_env`] for the recognised environment
//! variables. `PORT` selects the listening port (defaults to 3000).
//!
//! ## API Endpoints
//!
//! - `GET /`: Returns a welcome message
//! - `POST /tweet/generate`: Generates and stores a tweet for `{"topic": ...}`
//! - `POST /tweet/post/:id`: Forwards a draft tweet to the posting API
//! - `PUT /tweet/edit/:id`: Edits topic and/or content of a draft tweet
//! - `GET /tweet/all`: Lists all tweets, newest first
//! - `GET /tweet/tweets?limit=&offset=&posted=`: Lists one page of tweets
//! - `GET /tweet/health`: Returns service health status

pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod handlers;
pub mod models;
pub mod posting;
pub mod service;
pub mod store;

// Re-export commonly used types and functions
pub use config::{get_server_port, AppConfig};
pub use error::TweetError;
pub use generation::{split_hashtags, GeminiGenerator, TweetGenerator};
pub use handlers::{build_cors_layer, build_router, AppState};
pub use models::{GeneratedText, PageQuery, Tweet, TweetPage, TweetUpdate};
pub use posting::{CloneApiPoster, PostOutcome, TweetPoster};
pub use service::TweetService;
pub use store::{MemoryTweetStore, TweetStore};

//! Data types shared by the store, the service and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored tweet.
///
/// `id` and `created_at` are assigned by the store and never change. Once
/// `posted` is true the `topic` and `content` fields are frozen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tweet {
    pub id: i64,
    pub topic: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub posted: bool,
}

/// Lifecycle state of a tweet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweetState {
    Draft,
    Posted,
}

impl Tweet {
    pub fn state(&self) -> TweetState {
        if self.posted {
            TweetState::Posted
        } else {
            TweetState::Draft
        }
    }
}

/// Output of the generation step, split into body and hashtags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedText {
    /// Generated text with hashtags removed and whitespace collapsed.
    pub content: String,
    /// Hashtag words without the leading `#`, in order of appearance.
    pub hashtags: Vec<String>,
    /// The raw text returned by the model.
    pub full_tweet: String,
}

/// Result of `generate_and_store`.
#[derive(Debug, Clone, Serialize)]
pub struct StoredGeneration {
    pub id: i64,
    /// The content that was persisted.
    pub tweet: String,
    #[serde(flatten)]
    pub generated: GeneratedText,
}

/// Result of a successful or idempotent `post`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostReceipt {
    pub status: PostStatus,
    pub tweet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PostStatus {
    #[serde(rename = "posted")]
    Posted,
    #[serde(rename = "already posted")]
    AlreadyPosted,
}

/// Partial update of a draft tweet. Absent or empty fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetUpdate {
    pub topic: Option<String>,
    pub content: Option<String>,
}

impl TweetUpdate {
    /// Drops empty strings so that only supplied, non-empty fields remain.
    pub fn normalized(self) -> Self {
        TweetUpdate {
            topic: self.topic.filter(|t| !t.is_empty()),
            content: self.content.filter(|c| !c.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.topic.is_none() && self.content.is_none()
    }
}

/// Pagination window with an optional `posted` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: i64,
    pub offset: i64,
    pub posted: Option<bool>,
}

impl Default for PageQuery {
    fn default() -> Self {
        PageQuery {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
            posted: None,
        }
    }
}

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// One page of tweets, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct TweetPage {
    pub tweets: Vec<Tweet>,
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
}

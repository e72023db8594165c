//! Tweet persistence abstraction.
//!
//! The service talks to storage only through the [`TweetStore`] trait. Two
//! implementations exist: [`crate::db::PgTweetStore`] for PostgreSQL and
//! [`MemoryTweetStore`], which is used by the test suite and when the service
//! is started without a database.

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

use crate::error::{Result, TweetError};
use crate::models::{PageQuery, Tweet, TweetUpdate};

/// Durable mapping from tweet id to tweet record.
///
/// Every write is committed before the method returns.
#[async_trait]
pub trait TweetStore: Send + Sync {
    /// Inserts a new draft tweet and returns it with its assigned id.
    async fn create(&self, topic: &str, content: &str) -> Result<Tweet>;

    async fn get(&self, id: i64) -> Result<Option<Tweet>>;

    /// Applies the present fields of `changes` to a draft tweet.
    ///
    /// Empty strings count as absent and leave the stored field unchanged.
    /// Fails with `NotFound` when the id is unknown and with `InvalidState`
    /// when the tweet has already been posted. The posted check and the write
    /// happen atomically.
    async fn update(&self, id: i64, changes: &TweetUpdate) -> Result<Tweet>;

    /// All tweets, newest (highest id) first.
    async fn list(&self) -> Result<Vec<Tweet>>;

    /// One page of tweets, newest first, plus the number of tweets matching
    /// the `posted` filter.
    async fn list_page(&self, query: PageQuery) -> Result<(Vec<Tweet>, i64)>;

    /// Sets `posted = true`. Posting an already posted tweet is a no-op.
    async fn mark_posted(&self, id: i64) -> Result<Tweet>;

    /// Claims a draft tweet for forwarding to the posting API.
    ///
    /// While the returned [`PendingPost`] is alive no other caller can claim
    /// the same tweet; a concurrent claim waits and then observes the outcome.
    /// Other tweets stay readable and writable meanwhile.
    async fn begin_post(&self, id: i64) -> Result<PostClaim>;
}

/// Outcome of [`TweetStore::begin_post`].
pub enum PostClaim {
    NotFound,
    AlreadyPosted(Tweet),
    Pending(Box<dyn PendingPost>),
}

/// An exclusive claim on a draft tweet.
#[async_trait]
pub trait PendingPost: Send {
    fn tweet(&self) -> &Tweet;

    /// Marks the tweet as posted and releases the claim.
    async fn commit(self: Box<Self>) -> Result<Tweet>;

    /// Releases the claim and leaves the tweet as a draft.
    async fn abort(self: Box<Self>) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    tweets: BTreeMap<i64, Tweet>,
}

/// Ids of tweets currently claimed for posting.
///
/// Kept outside [`MemoryState`] so a claim can be released from `Drop` and
/// the map lock is never held across a posting call.
#[derive(Debug, Default)]
struct PostingClaims {
    ids: std::sync::Mutex<HashSet<i64>>,
    released: Notify,
}

impl PostingClaims {
    fn try_claim(&self, id: i64) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id)
    }

    fn release(&self, id: i64) {
        self.ids
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&id);
        self.released.notify_waiters();
    }
}

/// In-process tweet store backed by a `BTreeMap`.
///
/// Contents are lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryTweetStore {
    state: Arc<Mutex<MemoryState>>,
    claims: Arc<PostingClaims>,
}

impl MemoryTweetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_filter(tweet: &Tweet, posted: Option<bool>) -> bool {
    posted.map_or(true, |p| tweet.posted == p)
}

#[async_trait]
impl TweetStore for MemoryTweetStore {
    async fn create(&self, topic: &str, content: &str) -> Result<Tweet> {
        let mut state = self.state.lock().await;
        state.last_id += 1;
        let tweet = Tweet {
            id: state.last_id,
            topic: topic.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            posted: false,
        };
        state.tweets.insert(tweet.id, tweet.clone());
        debug!("Stored tweet {} in memory", tweet.id);
        Ok(tweet)
    }

    async fn get(&self, id: i64) -> Result<Option<Tweet>> {
        Ok(self.state.lock().await.tweets.get(&id).cloned())
    }

    async fn update(&self, id: i64, changes: &TweetUpdate) -> Result<Tweet> {
        let changes = changes.clone().normalized();
        let mut state = self.state.lock().await;
        let tweet = state.tweets.get_mut(&id).ok_or(TweetError::NotFound(id))?;
        if tweet.posted {
            return Err(TweetError::InvalidState(
                "Tweet already posted and cannot be edited".to_string(),
            ));
        }
        if let Some(topic) = changes.topic {
            tweet.topic = topic;
        }
        if let Some(content) = changes.content {
            tweet.content = content;
        }
        Ok(tweet.clone())
    }

    async fn list(&self) -> Result<Vec<Tweet>> {
        let state = self.state.lock().await;
        Ok(state.tweets.values().rev().cloned().collect())
    }

    async fn list_page(&self, query: PageQuery) -> Result<(Vec<Tweet>, i64)> {
        let state = self.state.lock().await;
        let matching: Vec<&Tweet> = state
            .tweets
            .values()
            .rev()
            .filter(|t| matches_filter(t, query.posted))
            .collect();
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn mark_posted(&self, id: i64) -> Result<Tweet> {
        let mut state = self.state.lock().await;
        let tweet = state.tweets.get_mut(&id).ok_or(TweetError::NotFound(id))?;
        tweet.posted = true;
        Ok(tweet.clone())
    }

    async fn begin_post(&self, id: i64) -> Result<PostClaim> {
        loop {
            // Registered before the check so a release in between is not missed.
            let released = self.claims.released.notified();
            {
                let state = self.state.lock().await;
                match state.tweets.get(&id) {
                    None => return Ok(PostClaim::NotFound),
                    Some(tweet) if tweet.posted => {
                        return Ok(PostClaim::AlreadyPosted(tweet.clone()))
                    }
                    Some(tweet) if self.claims.try_claim(id) => {
                        info!("Claimed tweet {} for posting", id);
                        return Ok(PostClaim::Pending(Box::new(MemoryPendingPost {
                            state: Arc::clone(&self.state),
                            claims: Arc::clone(&self.claims),
                            tweet: tweet.clone(),
                        })));
                    }
                    Some(_) => debug!("Tweet {} is being posted, waiting for the claim", id),
                }
            }
            released.await;
        }
    }
}

/// Claim on a single tweet id. The store stays unlocked while it is held;
/// dropping it releases the id.
struct MemoryPendingPost {
    state: Arc<Mutex<MemoryState>>,
    claims: Arc<PostingClaims>,
    tweet: Tweet,
}

#[async_trait]
impl PendingPost for MemoryPendingPost {
    fn tweet(&self) -> &Tweet {
        &self.tweet
    }

    async fn commit(self: Box<Self>) -> Result<Tweet> {
        let mut state = self.state.lock().await;
        let stored = state
            .tweets
            .get_mut(&self.tweet.id)
            .ok_or(TweetError::NotFound(self.tweet.id))?;
        stored.posted = true;
        Ok(stored.clone())
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        debug!("Released posting claim on tweet {}", self.tweet.id);
        Ok(())
    }
}

impl Drop for MemoryPendingPost {
    fn drop(&mut self) {
        self.claims.release(self.tweet.id);
    }
}

//! Tweet service: the business rules around generating, posting, editing and
//! listing tweets.
//!
//! A tweet starts as a draft and becomes posted exactly once, after the
//! posting API accepts it. Posted tweets can no longer be edited.

use log::{error, info, warn};
use std::sync::Arc;

use crate::error::{Result, TweetError};
use crate::generation::{split_hashtags, TweetGenerator};
use crate::models::{
    PageQuery, PostReceipt, PostStatus, StoredGeneration, Tweet, TweetPage, TweetState,
    TweetUpdate, MAX_PAGE_LIMIT,
};
use crate::posting::{PostOutcome, TweetPoster};
use crate::store::{PendingPost, PostClaim, TweetStore};

/// Orchestrates the store and the two outbound clients.
#[derive(Clone)]
pub struct TweetService {
    store: Arc<dyn TweetStore>,
    generator: Arc<dyn TweetGenerator>,
    poster: Arc<dyn TweetPoster>,
    strip_hashtags: bool,
}

impl TweetService {
    pub fn new(
        store: Arc<dyn TweetStore>,
        generator: Arc<dyn TweetGenerator>,
        poster: Arc<dyn TweetPoster>,
        strip_hashtags: bool,
    ) -> Self {
        Self {
            store,
            generator,
            poster,
            strip_hashtags,
        }
    }

    /// Generates a tweet for `topic` and stores it as a draft.
    ///
    /// Generation failures propagate and nothing is stored. If storing fails
    /// the generated text is discarded with the error.
    pub async fn generate_and_store(&self, topic: &str) -> Result<StoredGeneration> {
        if topic.trim().is_empty() {
            return Err(TweetError::Validation("Topic must not be empty".to_string()));
        }

        info!("Generating tweet for topic '{}'", topic);
        let text = self.generator.generate(topic).await.map_err(|e| {
            error!("Tweet generation failed for topic '{}': {}", topic, e);
            e
        })?;

        let generated = split_hashtags(&text);
        let content = if self.strip_hashtags {
            generated.content.clone()
        } else {
            generated.full_tweet.clone()
        };

        let tweet = self.store.create(topic, &content).await?;
        info!("Stored generated tweet {} for topic '{}'", tweet.id, topic);

        Ok(StoredGeneration {
            id: tweet.id,
            tweet: tweet.content,
            generated,
        })
    }

    /// Forwards a draft tweet to the posting API and marks it posted.
    ///
    /// Posting an already posted tweet returns `AlreadyPosted` without
    /// contacting the API. A rejected post leaves the tweet a draft and
    /// returns `TweetError::Upstream` with the remote status and body.
    pub async fn post(&self, id: i64) -> Result<PostReceipt> {
        info!("Posting tweet {}", id);

        let pending = match self.store.begin_post(id).await? {
            PostClaim::NotFound => return Err(TweetError::NotFound(id)),
            PostClaim::AlreadyPosted(tweet) => {
                info!("Tweet {} was already posted", id);
                return Ok(PostReceipt {
                    status: PostStatus::AlreadyPosted,
                    tweet: tweet.content,
                });
            }
            PostClaim::Pending(pending) => pending,
        };

        let content = pending.tweet().content.clone();
        match self.poster.post(&content).await {
            Ok(PostOutcome::Success) => {
                let tweet = pending.commit().await?;
                info!("Tweet {} posted", id);
                Ok(PostReceipt {
                    status: PostStatus::Posted,
                    tweet: tweet.content,
                })
            }
            Ok(PostOutcome::Failure { status, body }) => {
                release(pending).await;
                warn!("Posting API rejected tweet {} with status {}", id, status);
                Err(TweetError::Upstream { status, body })
            }
            Err(e) => {
                release(pending).await;
                error!("Failed to reach posting API for tweet {}: {}", id, e);
                Err(e)
            }
        }
    }

    /// All tweets, newest first.
    pub async fn list_all(&self) -> Result<Vec<Tweet>> {
        self.store.list().await
    }

    /// One page of tweets, newest first, optionally filtered by `posted`.
    pub async fn list_paginated(&self, query: PageQuery) -> Result<TweetPage> {
        if query.limit < 1 || query.limit > MAX_PAGE_LIMIT {
            return Err(TweetError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        if query.offset < 0 {
            return Err(TweetError::Validation(
                "offset must not be negative".to_string(),
            ));
        }

        let (tweets, total) = self.store.list_page(query).await?;
        Ok(TweetPage {
            tweets,
            limit: query.limit,
            offset: query.offset,
            total,
        })
    }

    /// Edits the topic and/or content of a draft tweet.
    ///
    /// Fields that are absent or empty are left unchanged.
    pub async fn update(&self, id: i64, changes: TweetUpdate) -> Result<Tweet> {
        let tweet = self
            .store
            .get(id)
            .await?
            .ok_or(TweetError::NotFound(id))?;

        if tweet.state() == TweetState::Posted {
            warn!("Attempt to edit posted tweet {}", id);
            return Err(TweetError::InvalidState(
                "Tweet already posted and cannot be edited".to_string(),
            ));
        }

        let changes = changes.normalized();
        if changes.is_empty() {
            return Ok(tweet);
        }

        let updated = self.store.update(id, &changes).await?;
        info!("Updated tweet {}", id);
        Ok(updated)
    }
}

async fn release(pending: Box<dyn PendingPost>) {
    if let Err(e) = pending.abort().await {
        warn!("Failed to release posting claim: {}", e);
    }
}

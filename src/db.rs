//! Database module for storing and retrieving tweets.
//!
//! This module provides the PostgreSQL implementation of [`TweetStore`]. All
//! tweets live in a single `tweets` table which is created at startup if it
//! does not exist yet.

use async_trait::async_trait;
use log::{debug, info, warn};
use sqlx::{PgPool, Postgres, Transaction};

use crate::config::mask_secret;
use crate::error::{Result, TweetError};
use crate::models::{PageQuery, Tweet, TweetUpdate};
use crate::store::{PendingPost, PostClaim, TweetStore};

const TWEET_COLUMNS: &str = "id, topic, content, created_at, posted";

/// Establishes a connection pool to the PostgreSQL database.
///
/// # Parameters
///
/// - `database_url`: PostgreSQL connection string
///
/// # Returns
///
/// - `Ok(PgPool)`: A connection pool to the database
/// - `Err(TweetError::Database)`: If the connection fails
pub async fn get_db_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL database");
    debug!("Database URL (masked): {}", mask_secret(database_url));

    let pool = PgPool::connect(database_url).await?;
    info!("Successfully connected to PostgreSQL database");

    Ok(pool)
}

/// Creates the `tweets` table if it does not exist.
pub async fn create_tweets_table(pool: &PgPool) -> Result<()> {
    info!("Ensuring tweets table exists");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tweets (
            id BIGSERIAL PRIMARY KEY,
            topic TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            posted BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// PostgreSQL-backed tweet store.
#[derive(Debug, Clone)]
pub struct PgTweetStore {
    pool: PgPool,
}

impl PgTweetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TweetStore for PgTweetStore {
    async fn create(&self, topic: &str, content: &str) -> Result<Tweet> {
        info!("Storing new tweet for topic '{}'", topic);

        let tweet = sqlx::query_as::<_, Tweet>(&format!(
            r#"
            INSERT INTO tweets (topic, content, created_at, posted)
            VALUES ($1, $2, NOW(), FALSE)
            RETURNING {TWEET_COLUMNS}
            "#
        ))
        .bind(topic)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        info!("Successfully stored tweet {}", tweet.id);
        Ok(tweet)
    }

    async fn get(&self, id: i64) -> Result<Option<Tweet>> {
        let tweet = sqlx::query_as::<_, Tweet>(&format!(
            "SELECT {TWEET_COLUMNS} FROM tweets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tweet)
    }

    async fn update(&self, id: i64, changes: &TweetUpdate) -> Result<Tweet> {
        info!("Updating tweet {}", id);
        let changes = changes.clone().normalized();

        // The posted check is part of the WHERE clause so a concurrent post
        // cannot slip in between check and write.
        let updated = sqlx::query_as::<_, Tweet>(&format!(
            r#"
            UPDATE tweets
            SET topic = COALESCE($2, topic),
                content = COALESCE($3, content)
            WHERE id = $1 AND posted = FALSE
            RETURNING {TWEET_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.topic.as_deref())
        .bind(changes.content.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(tweet) => Ok(tweet),
            None => match self.get(id).await? {
                None => Err(TweetError::NotFound(id)),
                Some(_) => {
                    warn!("Refusing to update posted tweet {}", id);
                    Err(TweetError::InvalidState(
                        "Tweet already posted and cannot be edited".to_string(),
                    ))
                }
            },
        }
    }

    async fn list(&self) -> Result<Vec<Tweet>> {
        let tweets = sqlx::query_as::<_, Tweet>(&format!(
            "SELECT {TWEET_COLUMNS} FROM tweets ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!("Loaded {} tweets", tweets.len());
        Ok(tweets)
    }

    async fn list_page(&self, query: PageQuery) -> Result<(Vec<Tweet>, i64)> {
        let tweets = sqlx::query_as::<_, Tweet>(&format!(
            r#"
            SELECT {TWEET_COLUMNS}
            FROM tweets
            WHERE ($1::BOOLEAN IS NULL OR posted = $1)
            ORDER BY id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(query.posted)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM tweets
            WHERE ($1::BOOLEAN IS NULL OR posted = $1)
            "#,
        )
        .bind(query.posted)
        .fetch_one(&self.pool)
        .await?;

        debug!(
            "Loaded page of {} tweets (limit {}, offset {}, total {})",
            tweets.len(),
            query.limit,
            query.offset,
            total
        );
        Ok((tweets, total))
    }

    async fn mark_posted(&self, id: i64) -> Result<Tweet> {
        let tweet = sqlx::query_as::<_, Tweet>(&format!(
            "UPDATE tweets SET posted = TRUE WHERE id = $1 RETURNING {TWEET_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        tweet.ok_or(TweetError::NotFound(id))
    }

    async fn begin_post(&self, id: i64) -> Result<PostClaim> {
        let mut tx = self.pool.begin().await?;

        // Row lock held until the transaction commits or rolls back.
        let tweet = sqlx::query_as::<_, Tweet>(&format!(
            "SELECT {TWEET_COLUMNS} FROM tweets WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        match tweet {
            None => {
                tx.rollback().await?;
                Ok(PostClaim::NotFound)
            }
            Some(tweet) if tweet.posted => {
                tx.rollback().await?;
                Ok(PostClaim::AlreadyPosted(tweet))
            }
            Some(tweet) => {
                info!("Claimed tweet {} for posting", id);
                Ok(PostClaim::Pending(Box::new(PgPendingPost { tx, tweet })))
            }
        }
    }
}

/// A locked tweet row inside an open transaction.
struct PgPendingPost {
    tx: Transaction<'static, Postgres>,
    tweet: Tweet,
}

#[async_trait]
impl PendingPost for PgPendingPost {
    fn tweet(&self) -> &Tweet {
        &self.tweet
    }

    async fn commit(self: Box<Self>) -> Result<Tweet> {
        let PgPendingPost { mut tx, tweet } = *self;

        let posted = sqlx::query_as::<_, Tweet>(&format!(
            "UPDATE tweets SET posted = TRUE WHERE id = $1 AND posted = FALSE RETURNING {TWEET_COLUMNS}"
        ))
        .bind(tweet.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(TweetError::NotFound(tweet.id))?;

        tx.commit().await?;
        info!("Marked tweet {} as posted", posted.id);
        Ok(posted)
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        let PgPendingPost { tx, tweet } = *self;
        tx.rollback().await?;
        debug!("Released posting claim on tweet {}", tweet.id);
        Ok(())
    }
}

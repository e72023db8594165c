//! Tweet text generation via Google Gemini.
//!
//! The [`TweetGenerator`] trait is the seam the service depends on;
//! [`GeminiGenerator`] is the production implementation. Hashtag extraction
//! lives here too since it only ever applies to generated text.

use async_trait::async_trait;
use log::{debug, error, info};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::config::GeminiConfig;
use crate::error::{Result, TweetError};
use crate::models::GeneratedText;
use crate::posting::sanitize_for_logging;

const TEMPERATURE: f32 = 0.7;

/// Prompt sent to the model. `{topic}` is replaced with the caller's topic.
pub const TWEET_PROMPT_TEMPLATE: &str = "Write a short, interesting & factual tweet about {topic} in under 250 characters.
Include relevant hashtags at the end.
Format: Tweet content followed by hashtags separated by spaces.
Example: \"This is my tweet content #hashtag1 #hashtag2 #hashtag3\"";

pub fn build_prompt(topic: &str) -> String {
    TWEET_PROMPT_TEMPLATE.replace("{topic}", topic)
}

/// Produces raw tweet text for a topic.
#[async_trait]
pub trait TweetGenerator: Send + Sync {
    /// Returns the model's text. The topic is passed through unvalidated.
    async fn generate(&self, topic: &str) -> Result<String>;
}

fn hashtag_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#(\w+)").ok()).as_ref()
}

/// Splits generated text into a hashtag-free body and its hashtags.
///
/// Hashtags are `#` followed by one or more word characters. The body has
/// them removed, whitespace runs collapsed to single spaces, and is trimmed.
///
/// ```
/// use tweetsmith::generation::split_hashtags;
///
/// let split = split_hashtags("Rust is fast #rustlang #speed");
/// assert_eq!(split.content, "Rust is fast");
/// assert_eq!(split.hashtags, vec!["rustlang", "speed"]);
/// ```
pub fn split_hashtags(text: &str) -> GeneratedText {
    let (hashtags, stripped) = match hashtag_pattern() {
        Some(re) => (
            re.captures_iter(text)
                .filter_map(|cap| cap.get(1))
                .map(|m| m.as_str().to_string())
                .collect(),
            re.replace_all(text, "").into_owned(),
        ),
        None => (Vec::new(), text.to_string()),
    };

    GeneratedText {
        content: stripped.split_whitespace().collect::<Vec<_>>().join(" "),
        hashtags,
        full_tweet: text.to_string(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

/// Google Gemini `generateContent` client.
pub struct GeminiGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    pub fn new(client: Client, config: &GeminiConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TweetGenerator for GeminiGenerator {
    async fn generate(&self, topic: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        info!("Generating tweet for topic '{}' with {}", topic, self.model);
        debug!("Sending Gemini request to: {}", url);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: build_prompt(topic),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: TEMPERATURE,
            },
        };

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini request failed: {}", e);
                TweetError::Generation(format!("Gemini request failed: {}", e))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            error!("Gemini API returned status {}", status);
            debug!(
                "Gemini error response: {}",
                sanitize_for_logging(&error_text, 200)
            );
            return Err(TweetError::Generation(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = resp.json().await.map_err(|e| {
            TweetError::Generation(format!("Failed to parse Gemini response: {}", e))
        })?;

        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| TweetError::Generation("No candidates returned from Gemini".into()))?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(TweetError::Generation(
                "Content blocked by Gemini safety filters".into(),
            ));
        }

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(TweetError::Generation(
                "No content parts in Gemini response".into(),
            ));
        }

        info!("Gemini returned {} characters", text.len());
        Ok(text)
    }
}

//! HTTP route handlers for the tweetsmith service.
//!
//! This module contains the HTTP route handler functions, the router that
//! wires them to paths, and the mapping from service errors to status codes.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::error::TweetError;
use crate::models::{
    PageQuery, PostReceipt, StoredGeneration, Tweet, TweetPage, TweetUpdate, DEFAULT_PAGE_LIMIT,
};
use crate::service::TweetService;

/// Origin of the local development frontend, always allowed by CORS.
pub const DEV_FRONTEND_ORIGIN: &str = "http://localhost:5173";

/// Shared handler state.
pub type AppState = Arc<TweetService>;

/// Error response with a JSON `{"detail": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<TweetError> for ApiError {
    fn from(err: TweetError) -> Self {
        let status = match &err {
            TweetError::NotFound(_) => StatusCode::NOT_FOUND,
            TweetError::InvalidState(_) | TweetError::Validation(_) => StatusCode::BAD_REQUEST,
            TweetError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            TweetError::Transport(_)
            | TweetError::Generation(_)
            | TweetError::Config(_)
            | TweetError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", err);
        } else {
            warn!("Request rejected: {}", err);
        }

        let detail = match err {
            TweetError::Upstream { body, .. } => body,
            TweetError::NotFound(_) => "Tweet not found".to_string(),
            other => other.to_string(),
        };
        ApiError { status, detail }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

/// Body of `POST /tweet/generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub topic: Option<String>,
}

/// Query string of `GET /tweet/tweets`.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub posted: Option<bool>,
}

impl From<PageParams> for PageQuery {
    fn from(params: PageParams) -> Self {
        PageQuery {
            limit: params.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
            offset: params.offset.unwrap_or(0),
            posted: params.posted,
        }
    }
}

/// Handles GET requests to the root `/` endpoint.
pub async fn handle_root() -> Json<Value> {
    Json(json!({"message": "Welcome to Tweetsmith API"}))
}

/// Handles GET requests to the `/tweet/health` endpoint.
///
/// Always answers `{"status": "ok"}` while the process is serving requests.
pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Handles POST requests to `/tweet/generate`.
///
/// Expects `{"topic": "..."}`. A missing or blank topic is rejected with 400
/// before any model call is made.
///
/// # Success Response
///
/// ```json
/// {
///   "id": 1,
///   "tweet": "Mars has the tallest volcano in the solar system.",
///   "content": "Mars has the tallest volcano in the solar system.",
///   "hashtags": ["Mars", "Space"],
///   "full_tweet": "Mars has the tallest volcano in the solar system. #Mars #Space"
/// }
/// ```
pub async fn handle_generate(
    State(service): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<StoredGeneration>, ApiError> {
    let Json(request) = payload?;
    let topic = request
        .topic
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Field 'topic' is required"))?;

    let generated = service.generate_and_store(&topic).await?;
    info!("Generated tweet {}", generated.id);
    Ok(Json(generated))
}

/// Handles POST requests to `/tweet/post/:id`.
///
/// Returns `{"status": "posted" | "already posted", "tweet": "..."}`. When the
/// posting API rejects the tweet its status code and body are passed through.
pub async fn handle_post_tweet(
    State(service): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<PostReceipt>, ApiError> {
    let Path(id) = path?;
    Ok(Json(service.post(id).await?))
}

/// Handles PUT requests to `/tweet/edit/:id`.
///
/// Accepts `{"topic"?: string, "content"?: string}` and answers
/// `{"message": "Updated", "tweet": {...}}`. Posted tweets cannot be edited.
pub async fn handle_edit(
    State(service): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TweetUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = path?;
    let Json(changes) = payload?;
    let tweet = service.update(id, changes).await?;
    Ok(Json(json!({"message": "Updated", "tweet": tweet})))
}

/// Handles GET requests to `/tweet/all`: every tweet, newest first.
pub async fn handle_list_all(
    State(service): State<AppState>,
) -> Result<Json<Vec<Tweet>>, ApiError> {
    Ok(Json(service.list_all().await?))
}

/// Handles GET requests to `/tweet/tweets?limit=&offset=&posted=`.
pub async fn handle_list_paginated(
    State(service): State<AppState>,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<TweetPage>, ApiError> {
    let Query(params) = query?;
    Ok(Json(service.list_paginated(params.into()).await?))
}

/// Builds the application router with all tweet routes.
///
/// Middleware (CORS, tracing) is added by the caller.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/tweet/health", get(handle_health))
        .route("/tweet/generate", post(handle_generate))
        .route("/tweet/post/:id", post(handle_post_tweet))
        .route("/tweet/edit/:id", put(handle_edit))
        .route("/tweet/all", get(handle_list_all))
        .route("/tweet/tweets", get(handle_list_paginated))
        .with_state(state)
}

/// Builds the CORS layer for the configured frontend origin.
///
/// `*` allows any origin; otherwise the local dev frontend and the given
/// origin are allowed.
pub fn build_cors_layer(frontend_url: &str) -> CorsLayer {
    let origin = if frontend_url.trim() == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = [DEV_FRONTEND_ORIGIN, frontend_url.trim()]
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin '{}'", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
}

//! # Tweetsmith
//!
//! A Rust web service that generates tweets about a topic with Google Gemini,
//! stores them, and forwards them to an external tweet-posting API.
//!
//! ## Environment Variables
//!
//! - `GEMINI_API_KEY`, `TWITTER_CLONE_URL`, `TWITTER_CLONE_API_KEY`: required
//! - `DATABASE_URL`: PostgreSQL connection string (in-memory store if unset)
//! - `FRONTEND_URL`: allowed CORS origin (defaults to `*`)
//! - `PORT`: Server port (defaults to 3000)
//! - `RUST_LOG`: log filter for `env_logger`

use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use tweetsmith::db::{create_tweets_table, get_db_pool, PgTweetStore};
use tweetsmith::{
    build_cors_layer, build_router, get_server_port, AppConfig, CloneApiPoster, GeminiGenerator,
    MemoryTweetStore, TweetService, TweetStore,
};

/// Main entry point for the tweetsmith web service.
///
/// Initializes logging, loads the configuration, connects the store, and
/// serves HTTP until Ctrl-C is received. Exits with status 1 if the
/// configuration is invalid, the database is unreachable, or the port cannot
/// be bound.
#[tokio::main]
async fn main() {
    // Initialize the logging system
    env_logger::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn TweetStore> = match &config.database_url {
        Some(url) => {
            let pool = match get_db_pool(url).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("Failed to connect to database: {}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = create_tweets_table(&pool).await {
                error!("Failed to create tweets table: {}", e);
                std::process::exit(1);
            }
            Arc::new(PgTweetStore::new(pool))
        }
        None => {
            warn!("Running with in-memory tweet store; data is lost on restart");
            Arc::new(MemoryTweetStore::new())
        }
    };

    let http = reqwest::Client::new();
    let service = TweetService::new(
        store,
        Arc::new(GeminiGenerator::new(http.clone(), &config.gemini)),
        Arc::new(CloneApiPoster::new(http, &config.posting)),
        config.strip_hashtags,
    );

    // Build the HTTP application with all routes and middleware
    let app = build_router(Arc::new(service)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(build_cors_layer(&config.frontend_url)),
    );

    let port = get_server_port();
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    info!("Starting tweetsmith server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("HTTP server error: {}", e);
    }
    info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

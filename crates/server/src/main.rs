//! Meme Museum server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use museum_api::AppState;
use museum_common::{Config, config::ServerConfig};
use museum_core::{CommentService, MemeService, TagService, TokenService, UserService, VoteService};
use museum_db::repositories::{
    CommentRepository, MemeRepository, TagRepository, UserRepository, VoteRepository,
};
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// CORS policy from the configured origins. No origins means any origin.
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if server.cors_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "meme_museum=debug,museum_core=debug,tower_http=debug".into()
            }),
        )
        .init();

    info!("Starting meme-museum server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = museum_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    museum_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let meme_repo = MemeRepository::new(Arc::clone(&db));
    let tag_repo = TagRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let vote_repo = VoteRepository::new(Arc::clone(&db));

    // Initialize services
    let tokens = TokenService::new(&config.auth)?;
    let user_service = UserService::new(user_repo.clone(), tokens);
    let meme_service = MemeService::new(
        meme_repo.clone(),
        tag_repo.clone(),
        user_repo.clone(),
        comment_repo.clone(),
        config.listing.clone(),
    );
    let comment_service = CommentService::new(comment_repo, meme_repo, user_repo);
    let tag_service = TagService::new(tag_repo);
    let vote_service = VoteService::new(vote_repo, config.votes.forbid_self_vote);

    if config.votes.forbid_self_vote {
        info!("Self-votes are forbidden");
    }

    let state = AppState {
        user_service,
        meme_service,
        comment_service,
        tag_service,
        vote_service,
    };

    // Build router
    let app = museum_api::app(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server));

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

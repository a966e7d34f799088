//! HTTP API layer for meme-museum.
//!
//! - **Endpoints**: accounts, memes, votes, comments and tags
//! - **Extractors**: authentication and JSON/query parsing with uniform errors
//! - **Middleware**: bearer token authentication
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::Router;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};

/// The API router with authentication applied and state attached.
pub fn app(state: AppState) -> Router {
    router()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

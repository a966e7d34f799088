//! API endpoints.

mod auth;
mod comments;
mod memes;
mod meta;
mod tags;

use axum::Router;

use crate::middleware::AppState;

pub use memes::VoteRequest;

/// Create the API router.
pub fn router() -> Router<AppState> {
    let api = Router::new()
        .nest("/memes", memes::router())
        .nest("/comments", comments::router())
        .nest("/tags", tags::router());

    Router::new()
        .merge(meta::router())
        .merge(auth::router())
        .nest("/api", api)
}

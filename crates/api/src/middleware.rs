//! API middleware.

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use museum_core::{CommentService, MemeService, TagService, UserService, VoteService};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub meme_service: MemeService,
    pub comment_service: CommentService,
    pub tag_service: TagService,
    pub vote_service: VoteService,
}

/// Authentication middleware.
///
/// Resolves a `Bearer` token to its user and stores the user in the request
/// extensions. Requests without a valid token pass through anonymously;
/// handlers that need a user reject them via [`crate::extractors::AuthUser`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    if let Some(token) = token {
        match state.user_service.authenticate_by_token(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring bearer token"),
        }
    }

    next.run(req).await
}

//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, post},
};
use museum_common::AppResult;
use museum_core::CommentResponse;
use museum_db::repositories::VoteTargetKind;

use crate::{
    endpoints::memes::VoteRequest,
    extractors::{ApiJson, AuthUser},
    middleware::AppState,
    response::MessageResponse,
};

/// Delete a comment.
async fn remove(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<MessageResponse> {
    state.comment_service.delete(&user, &id).await?;
    Ok(MessageResponse::new("Comment deleted successfully"))
}

/// Vote on a comment and return it with refreshed counters.
async fn vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> AppResult<Json<CommentResponse>> {
    state
        .vote_service
        .apply_vote(&user.id, VoteTargetKind::Comment, &id, req.direction()?)
        .await?;

    let comment = state.comment_service.get(&id).await?;
    Ok(Json(comment))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", delete(remove))
        .route("/{id}/vote", post(vote))
}

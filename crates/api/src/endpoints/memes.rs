//! Meme endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
};
use museum_common::{AppError, AppResult};
use museum_core::{
    CommentPage, CreateCommentInput, CreateMemeInput, ListMemesParams, MemeDetail, MemePage,
    VoteStatus,
};
use museum_db::{entities::VoteDirection, repositories::VoteTargetKind};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{ApiJson, ApiQuery, AuthUser},
    middleware::AppState,
    response::{MessageResponse, created},
};

// ==================== Request/Response Types ====================

/// Vote request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub is_upvote: Option<bool>,
}

impl VoteRequest {
    pub fn direction(&self) -> AppResult<VoteDirection> {
        self.is_upvote
            .map(VoteDirection::from_is_upvote)
            .ok_or_else(|| AppError::Validation("isUpvote must be a boolean".to_string()))
    }
}

/// Meme vote response.
#[derive(Debug, Serialize)]
pub struct MemeVoteResponse {
    pub message: String,
    pub upvotes: i32,
    pub downvotes: i32,
}

/// Comment listing parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CommentListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

// ==================== Handlers ====================

/// List memes.
async fn list(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListMemesParams>,
) -> AppResult<Json<MemePage>> {
    let page = state.meme_service.list(&params).await?;
    Ok(Json(page))
}

/// Upload a meme.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateMemeInput>,
) -> AppResult<Response> {
    let meme = state.meme_service.create(&user.id, input).await?;
    Ok(created(meme))
}

/// Meme of the day, or a message when there are no memes at all.
async fn meme_of_the_day(State(state): State<AppState>) -> AppResult<Response> {
    let meme = state.meme_service.meme_of_the_day().await?;
    Ok(match meme {
        Some(meme) => Json(meme).into_response(),
        None => MessageResponse::new("No memes available").into_response(),
    })
}

/// Show a meme and count the view.
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MemeDetail>> {
    let meme = state.meme_service.view(&id).await?;
    Ok(Json(meme))
}

/// Delete a meme.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<MessageResponse> {
    state.meme_service.delete(&user.id, &id).await?;
    Ok(MessageResponse::new("Meme deleted successfully"))
}

/// Vote on a meme.
async fn vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> AppResult<Json<MemeVoteResponse>> {
    let outcome = state
        .vote_service
        .apply_vote(&user.id, VoteTargetKind::Meme, &id, req.direction()?)
        .await?;

    Ok(Json(MemeVoteResponse {
        message: format!("Vote {}", outcome.action.as_str()),
        upvotes: outcome.counts.upvotes,
        downvotes: outcome.counts.downvotes,
    }))
}

/// The caller's vote on a meme.
async fn my_vote(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<VoteStatus>> {
    let status = state
        .vote_service
        .status(&user.id, VoteTargetKind::Meme, &id)
        .await?;
    Ok(Json(status))
}

/// Comments on a meme.
async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<CommentListParams>,
) -> AppResult<Json<CommentPage>> {
    let page = state
        .comment_service
        .list(&id, params.page, params.limit)
        .await?;
    Ok(Json(page))
}

/// Comment on a meme.
async fn create_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<CreateCommentInput>,
) -> AppResult<Response> {
    let comment = state.comment_service.create(&user, &id, input).await?;
    Ok(created(comment))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/meme-of-the-day", get(meme_of_the_day))
        .route("/{id}", get(show).delete(delete))
        .route("/{id}/vote", get(my_vote).post(vote))
        .route("/{id}/comments", get(list_comments).post(create_comment))
}

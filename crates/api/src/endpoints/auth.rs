//! Authentication endpoints.

use axum::{Json, Router, extract::State, response::Response, routing::post};
use museum_common::AppResult;
use museum_core::{LoginInput, LoginResponse, SignupInput, UserResponse};

use crate::{extractors::ApiJson, middleware::AppState, response::created};

/// Create a new user account.
async fn signup(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SignupInput>,
) -> AppResult<Response> {
    let user = state.user_service.signup(input).await?;
    Ok(created(UserResponse::from(user)))
}

/// Log in and receive an access token.
async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> AppResult<Json<LoginResponse>> {
    let response = state.user_service.login(input).await?;
    Ok(Json(response))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

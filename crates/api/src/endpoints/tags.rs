//! Tag endpoints.

use axum::{Json, Router, extract::State, routing::get};
use museum_common::AppResult;
use museum_core::TagSummary;

use crate::middleware::AppState;

/// All tags, ordered by name.
async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<TagSummary>>> {
    let tags = state.tag_service.list().await?;
    Ok(Json(tags))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list))
}

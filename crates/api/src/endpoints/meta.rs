//! Meta endpoints.

use axum::{Router, routing::get};

use crate::{middleware::AppState, response::MessageResponse};

/// Welcome message.
async fn welcome() -> MessageResponse {
    MessageResponse::new("Welcome to the Meme Museum API")
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(welcome))
}

//! Text message endpoint

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use super::{ApiError, ApiState};
use crate::pipeline::{Inbound, Reply};

/// Build messages router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/v1/messages", post(send_message))
        .with_state(state)
}

/// Inbound text message
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    pub text: String,
    #[serde(default)]
    pub speak: bool,
}

/// Handle a text message and return the bot's reply
async fn send_message(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<Reply>, ApiError> {
    if request.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text is required".to_string()));
    }

    let inbound = Inbound::text(
        request.user_id,
        request.user_name.unwrap_or_default(),
        request.text,
    )
    .speak(request.speak);

    let reply = state.pipeline.handle(inbound).await?;
    Ok(Json(reply))
}

//! Voice message endpoint

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::{ApiError, ApiState};
use crate::pipeline::{Inbound, Reply};

/// Largest clip accepted, matching the Whisper upload limit
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/v1/voice", post(voice_message))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Query parameters for a voice upload
#[derive(Debug, Deserialize)]
pub struct VoiceQuery {
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub speak: bool,
}

/// Handle a voice message
///
/// Accepts a raw OGG/Opus body. The clip is stored under the user's input
/// directory and removed once it has been transcribed.
async fn voice_message(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<VoiceQuery>,
    body: Bytes,
) -> Result<Json<Reply>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty audio data".to_string()));
    }

    let dir = crate::voice::user_dir(&state.audio_input_dir, &query.user_id)?;

    if !state.pipeline.accepts_voice() {
        return Err(ApiError::NotConfigured("voice messages are not enabled"));
    }

    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to create input directory: {e}")))?;

    let path = dir.join(format!("{}.oga", uuid::Uuid::new_v4()));
    tokio::fs::write(&path, &body)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to store audio: {e}")))?;

    tracing::debug!(
        user_id = %query.user_id,
        path = %path.display(),
        bytes = body.len(),
        "stored voice message"
    );

    let inbound = Inbound::voice(query.user_id, query.user_name.unwrap_or_default(), path)
        .speak(query.speak);

    let reply = state.pipeline.handle(inbound).await?;
    Ok(Json(reply))
}

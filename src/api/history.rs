//! Conversation history endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState};
use crate::db::Turn;

/// Build history router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/v1/history/{user_id}", get(get_history))
        .with_state(state)
}

/// Query parameters for history
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// A user's windowed history
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub user_id: String,
    pub exists: bool,
    pub turns: Vec<Turn>,
}

/// Return the last `limit` turns of a user's log, oldest first
async fn get_history(
    State(state): State<Arc<ApiState>>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query.limit.unwrap_or(state.history_window);

    let exists = state.history.exists(&user_id)?;
    let turns = if exists {
        state.history.window(&user_id, limit)?
    } else {
        Vec::new()
    };

    Ok(Json(HistoryResponse {
        user_id,
        exists,
        turns,
    }))
}

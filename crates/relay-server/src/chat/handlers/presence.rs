use crate::core::AppState;
use axum::{extract::State, Json};
use tracing::debug;

/// GET /api/v1/presence
pub async fn list_online(State(state): State<AppState>) -> Json<Vec<String>> {
    let online = state.engine.online_users();
    debug!("GET /api/v1/presence - {} online", online.len());
    Json(online)
}

use crate::core::models::ChatMessage;
use crate::core::{AppState, Ctx, Error, Result};
use axum::{extract::State, Json};
use tracing::info;

/// POST /api/v1/message
pub async fn send_message(
    State(state): State<AppState>,
    ctx: Ctx,
    Json(message): Json<ChatMessage>,
) -> Result<&'static str> {
    if message.user_name.trim().is_empty() {
        return Err(Error::BadRequest("userName is required".to_string()));
    }

    info!(
        "POST /api/v1/message - {} -> {}",
        ctx.username(),
        message.user_name
    );

    let sent = state.engine.submit_message(&message, ctx.username()).await?;
    Ok(if sent {
        "Message sent!"
    } else {
        "Message not sent!"
    })
}

/// POST /api/v1/logout
pub async fn logout(State(state): State<AppState>, ctx: Ctx) -> Result<&'static str> {
    state.engine.disconnect_user(ctx.username()).await?;
    Ok("Logged out")
}

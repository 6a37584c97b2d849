use crate::core::models::{NewUser, UserProfile};
use crate::core::{AppState, Error, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};

/// POST /public/register
///
/// Profile only; credentials live with the upstream identity provider.
pub async fn register(
    State(state): State<AppState>,
    Json(user): Json<NewUser>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    info!("POST /public/register - {}", user.username);

    if let Some(problem) = user.validation_error() {
        warn!("Registration rejected for {}: {}", user.username, problem);
        return Err(Error::BadRequest(problem.to_string()));
    }

    let profile = state.engine.register_user(user).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /api/v1/users/:username
pub async fn get_user(
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.engine.user_profile(&username).await?))
}

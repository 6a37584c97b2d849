//! Relay Handlers and Router
//!
//! Thin HTTP transport over the delivery engine. Every `/api/v1` route
//! needs an authenticated caller; registration is public.

use crate::core::auth::mw_require_user;
use crate::core::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod events;
pub mod messages;
pub mod presence;
pub mod users;

pub fn router() -> Router<AppState> {
    Router::new()
        // Live delivery stream
        .route("/api/v1/events", get(events::subscribe_events))
        // Messaging
        .route("/api/v1/message", post(messages::send_message))
        .route("/api/v1/logout", post(messages::logout))
        // Presence and profiles
        .route("/api/v1/presence", get(presence::list_online))
        .route("/api/v1/users/{username}", get(users::get_user))
        .route_layer(middleware::from_fn(mw_require_user))
        // Public
        .route("/public/register", post(users::register))
}

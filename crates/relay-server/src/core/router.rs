//! Core Router
//!
//! Infrastructure routes that need no caller identity.

use crate::core::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "online": state.engine.registry().len(),
    }))
}

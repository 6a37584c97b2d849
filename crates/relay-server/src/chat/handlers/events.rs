//! Live event stream
//!
//! `GET /api/v1/events` connects the caller, replays whatever was pending
//! for them, then streams each delivery event as SSE. Dropping the stream
//! completes the session.

use crate::chat::engine::Connection;
use crate::chat::session::SessionGuard;
use crate::core::models::DeliveryEvent;
use crate::core::{AppState, Ctx, Result};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use std::convert::Infallible;
use tracing::{info, warn};

pub async fn subscribe_events(
    State(state): State<AppState>,
    ctx: Ctx,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    info!("[Events] GET /api/v1/events for {}", ctx.username());

    let Connection {
        session,
        mut events,
    } = state.engine.connect_user(ctx.username()).await?;
    let guard = SessionGuard::new(session);

    let stream = async_stream::stream! {
        let _guard = guard;
        while let Some(event) = events.recv().await {
            match to_sse_event(&event) {
                Ok(sse) => yield Ok::<_, Infallible>(sse),
                Err(e) => warn!("[Events] Failed to encode event {}: {}", event.id, e),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(state.config.keepalive)))
}

pub fn to_sse_event(event: &DeliveryEvent) -> std::result::Result<Event, axum::Error> {
    Event::default()
        .id(event.id.to_string())
        .event(event.event_type.as_str())
        .json_data(&event.payload)
}

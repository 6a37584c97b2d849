//! Presence-aware Message Relay
//!
//! Pushes messages live to users holding an open event stream and stores
//! them as pending (with an out-of-band notice) for everyone else.

pub mod chat;
pub mod core;

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat::DeliveryEngine;
use crate::core::directory::SqliteUserDirectory;
use crate::core::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::core::store::SqliteMessageStore;
use crate::core::{AppState, RelayConfig};

/// Build the full router over an existing state
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(crate::core::router())
        .merge(chat::router())
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Wire the collaborators and the delivery engine from `config`
pub async fn build_state(config: RelayConfig) -> anyhow::Result<AppState> {
    config.ensure_dirs().await?;

    let pool = crate::core::db::open_pool(&config.database_path()).await?;
    let directory = Arc::new(SqliteUserDirectory::new(pool.clone()).await?);
    let store = Arc::new(SqliteMessageStore::new(pool).await?);

    let notifier: Arc<dyn Notifier> = match &config.notify_url {
        Some(url) => {
            info!("Notifications via webhook {}", url);
            Arc::new(WebhookNotifier::new(url.clone())?)
        }
        None => {
            info!("Notifications are logged only");
            Arc::new(LogNotifier)
        }
    };

    let engine = Arc::new(DeliveryEngine::new(
        directory,
        store,
        notifier,
        config.engine_settings(),
    ));

    Ok(AppState { config, engine })
}

pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        // Already set, ignore
    }

    info!("=== Relay Server ===");

    let config = RelayConfig::default();
    info!("Data directory: {:?}", config.data_dir);
    match config.session_timeout {
        Some(timeout) => info!("Session timeout: {:?}", timeout),
        None => info!("Session timeout: none"),
    }

    let port = config.port;
    let state = build_state(config).await?;
    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Relay listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

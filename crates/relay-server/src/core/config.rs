//! Relay server configuration

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::chat::engine::{DeliveryEngine, EngineSettings};

/// Configuration for the relay server
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Data directory holding the database
    pub data_dir: PathBuf,
    /// Port to listen on
    pub port: u16,
    /// Live session lifetime; `None` means sessions never time out
    pub session_timeout: Option<Duration>,
    /// Webhook receiving pending-message notices
    pub notify_url: Option<String>,
    /// Signature for notification bodies
    pub app_name: String,
    /// SSE keep-alive interval
    pub keepalive: Duration,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            data_dir: std::env::var("RELAY_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("relay_data")),
            port: env_parse("RELAY_PORT").unwrap_or(8080),
            session_timeout: env_parse::<u64>("RELAY_SESSION_TIMEOUT_SECS")
                .map(Duration::from_secs),
            notify_url: std::env::var("RELAY_NOTIFY_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            app_name: std::env::var("RELAY_APP_NAME").unwrap_or_else(|_| "Relay Chat".to_string()),
            keepalive: Duration::from_secs(env_parse("RELAY_KEEPALIVE_SECS").unwrap_or(15)),
        }
    }
}

impl RelayConfig {
    /// Create config with custom base directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("relay.sqlite")
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            session_timeout: self.session_timeout,
            app_name: self.app_name.clone(),
        }
    }

    /// Ensure all directories exist
    pub async fn ensure_dirs(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        Ok(())
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub engine: Arc<DeliveryEngine>,
}

//! Core Service Layer
//!
//! Shared infrastructure for the relay: configuration, caller identity,
//! data models and the storage and notification collaborators.

pub mod auth;
pub mod config;
pub mod ctx;
pub mod db;
pub mod directory;
pub mod error;
pub mod models;
pub mod notify;
pub mod router;
pub mod store;

// Re-exports for convenience
pub use config::{AppState, RelayConfig};
pub use ctx::Ctx;
pub use error::{Error, Result};
pub use router::router;

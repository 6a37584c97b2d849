//! Delivery Core
//!
//! Presence tracking, live sessions and the push-or-persist decision.

pub mod engine;
pub mod error;
pub mod handlers;
pub mod presence;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use engine::{Connection, DeliveryEngine, EngineSettings};
pub use error::{DeliveryError, DeliveryResult};
pub use handlers::router;
pub use presence::PresenceRegistry;
pub use session::{CloseReason, EventSequence, LiveSession, SessionGuard, SessionState};

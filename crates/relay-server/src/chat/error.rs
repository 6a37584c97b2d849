use thiserror::Error;

/// Failures surfaced by the delivery engine.
///
/// Transport failures on a live session never appear here: they degrade
/// to pending persistence. Notification failures are logged and dropped.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("receiver not found: {0}")]
    ReceiverNotFound(String),

    #[error("sender not found: {0}")]
    SenderNotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("username already taken: {0}")]
    UsernameTaken(String),

    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type DeliveryResult<T> = std::result::Result<T, DeliveryError>;

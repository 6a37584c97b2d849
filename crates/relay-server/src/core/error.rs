use crate::chat::error::DeliveryError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum Error {
    // Identity Errors
    AuthFailNoUser,
    AuthFailCtxNotInRequestExt,

    // Delivery Errors
    ReceiverNotFound(String),
    SenderNotFound(String),
    UserNotFound(String),

    // Registration Errors
    UsernameTaken(String),

    // Generic
    BadRequest(String),
    Internal(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Error::AuthFailNoUser => (
                StatusCode::UNAUTHORIZED,
                "No authenticated user".to_string(),
            ),
            Error::AuthFailCtxNotInRequestExt => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Auth context missing".to_string(),
            ),
            Error::ReceiverNotFound(_) => (
                StatusCode::NOT_FOUND,
                "You are trying to send a message to a not existing user!".to_string(),
            ),
            Error::SenderNotFound(name) => (
                StatusCode::NOT_FOUND,
                format!("Sender {} is not a registered user", name),
            ),
            Error::UserNotFound(name) => (
                StatusCode::NOT_FOUND,
                format!("User with userName: {} not found!", name),
            ),
            Error::UsernameTaken(name) => (
                StatusCode::CONFLICT,
                format!("The userName {} is already taken!", name),
            ),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(json!({
            "error": {
                "message": error_message
            }
        }));

        (status, body).into_response()
    }
}

impl From<DeliveryError> for Error {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::ReceiverNotFound(name) => Error::ReceiverNotFound(name),
            DeliveryError::SenderNotFound(name) => Error::SenderNotFound(name),
            DeliveryError::UserNotFound(name) => Error::UserNotFound(name),
            DeliveryError::UsernameTaken(name) => Error::UsernameTaken(name),
            DeliveryError::Storage(e) => Error::Internal(e.to_string()),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

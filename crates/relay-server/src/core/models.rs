//! Relay data models
//!
//! Users, stored messages and the live delivery events pushed to
//! connected clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse presence status kept by the user directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    Online,
    Offline,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Online => "ONLINE",
            UserStatus::Offline => "OFFLINE",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "ONLINE" => Ok(UserStatus::Online),
            "OFFLINE" => Ok(UserStatus::Offline),
            other => Err(anyhow::anyhow!("Unknown user status: {}", other)),
        }
    }
}

/// User record as held by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub status: UserStatus,
}

/// Public user profile (no presence data)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            first_name: user.first_name,
            last_name: user.last_name,
            user_name: user.username,
            email: user.email,
        }
    }
}

/// Fields needed to create a directory entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(rename = "userName")]
    pub username: String,
}

impl NewUser {
    /// First problem found with the submitted fields, if any
    pub fn validation_error(&self) -> Option<&'static str> {
        if self.first_name.trim().is_empty() {
            return Some("firstName is required");
        }
        if self.last_name.trim().is_empty() {
            return Some("lastName is required");
        }
        if self.username.trim().is_empty() {
            return Some("userName is required");
        }
        if self.username.chars().any(char::is_whitespace) {
            return Some("userName must not contain whitespace");
        }
        match self.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => None,
            _ => Some("email is not valid"),
        }
    }
}

/// Delivery status of a stored message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageStatus {
    Pending,
    Sent,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "PENDING",
            MessageStatus::Sent => "SENT",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "PENDING" => Ok(MessageStatus::Pending),
            "SENT" => Ok(MessageStatus::Sent),
            other => Err(anyhow::anyhow!("Unknown message status: {}", other)),
        }
    }
}

/// A stored message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub content: String,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub status: MessageStatus,
    /// Time of the last status change
    pub timestamp: DateTime<Utc>,
}

/// Inbound submission: content plus the receiver's username
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub message_content: String,
    pub user_name: String,
}

impl ChatMessage {
    pub fn new(content: impl Into<String>, receiver: impl Into<String>) -> Self {
        Self {
            message_content: content.into(),
            user_name: receiver.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Chat,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Chat => "chat",
        }
    }
}

/// Payload carried inside a delivery event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    pub message_content: String,
    /// Username of the sender
    pub user_name: String,
}

/// Unit pushed over a live stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryEvent {
    pub id: u64,
    pub event_type: EventType,
    pub payload: ChatPayload,
}

impl DeliveryEvent {
    pub fn chat(id: u64, content: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            id,
            event_type: EventType::Chat,
            payload: ChatPayload {
                message_content: content.into(),
                user_name: sender.into(),
            },
        }
    }
}

//! In-memory collaborators for unit tests

use crate::core::directory::UserDirectory;
use crate::core::models::{Message, MessageStatus, NewUser, User, UserStatus};
use crate::core::notify::{Notice, Notifier};
use crate::core::store::MessageStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
pub struct FakeDirectory {
    users: Mutex<Vec<User>>,
    offline_transitions: Mutex<HashMap<String, usize>>,
}

impl FakeDirectory {
    pub fn with_users(usernames: &[&str]) -> Self {
        let users = usernames
            .iter()
            .enumerate()
            .map(|(i, name)| User {
                id: i as i64 + 1,
                first_name: name.to_string(),
                last_name: format!("{}son", name),
                email: format!("{}@example.com", name),
                username: name.to_string(),
                status: UserStatus::Offline,
            })
            .collect();
        Self {
            users: Mutex::new(users),
            offline_transitions: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_status_now(&self, username: &str, status: UserStatus) {
        if let Some(user) = self.users.lock().iter_mut().find(|u| u.username == username) {
            user.status = status;
        }
    }

    pub fn status_of(&self, username: &str) -> Option<UserStatus> {
        self.users
            .lock()
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.status)
    }

    pub fn id_of(&self, username: &str) -> i64 {
        self.users
            .lock()
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.id)
            .unwrap_or_default()
    }

    pub fn offline_transitions(&self, username: &str) -> usize {
        self.offline_transitions
            .lock()
            .get(username)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl UserDirectory for FakeDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.lock().iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.users.lock().iter().find(|u| u.id == id).cloned())
    }

    async fn set_status(&self, username: &str, status: UserStatus) -> Result<()> {
        if status == UserStatus::Offline {
            *self
                .offline_transitions
                .lock()
                .entry(username.to_string())
                .or_default() += 1;
        }
        self.set_status_now(username, status);
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<Option<User>> {
        let mut users = self.users.lock();
        if users.iter().any(|u| u.username == user.username) {
            return Ok(None);
        }
        let created = User {
            id: users.len() as i64 + 1,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            username: user.username,
            status: UserStatus::Offline,
        };
        users.push(created.clone());
        Ok(Some(created))
    }
}

#[derive(Default)]
pub struct FakeStore {
    messages: Mutex<Vec<Message>>,
}

impl FakeStore {
    pub fn all(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    pub fn seed_pending(&self, content: &str, sender_id: i64, receiver_id: i64) -> i64 {
        let mut messages = self.messages.lock();
        let id = messages.len() as i64 + 1;
        messages.push(Message {
            id,
            content: content.to_string(),
            sender_id,
            receiver_id,
            status: MessageStatus::Pending,
            timestamp: Utc::now() - chrono::Duration::hours(1),
        });
        id
    }
}

#[async_trait]
impl MessageStore for FakeStore {
    async fn insert(
        &self,
        content: &str,
        sender_id: i64,
        receiver_id: i64,
        status: MessageStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<i64> {
        let mut messages = self.messages.lock();
        let id = messages.len() as i64 + 1;
        messages.push(Message {
            id,
            content: content.to_string(),
            sender_id,
            receiver_id,
            status,
            timestamp,
        });
        Ok(id)
    }

    async fn find_pending_for(&self, receiver_id: i64) -> Result<Vec<Message>> {
        Ok(self
            .messages
            .lock()
            .iter()
            .filter(|m| m.receiver_id == receiver_id && m.status == MessageStatus::Pending)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: i64,
        status: MessageStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(message) = self.messages.lock().iter_mut().find(|m| m.id == id) {
            message.status = status;
            message.timestamp = timestamp;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notice>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notice> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notice: &Notice) -> Result<()> {
        self.sent.lock().push(notice.clone());
        if self.fail {
            return Err(anyhow::anyhow!("mail gateway unavailable"));
        }
        Ok(())
    }
}

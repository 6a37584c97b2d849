//! Presence Registry
//!
//! In-memory map from username to the session currently able to receive
//! live pushes. At most one session per user; registering replaces.
//!
//! Every membership change writes the user's directory status while a
//! per-user lock is held, so the last status written always matches
//! whether the user is registered.

use crate::chat::session::LiveSession;
use crate::core::directory::UserDirectory;
use crate::core::models::UserStatus;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct PresenceRegistry {
    sessions: RwLock<HashMap<String, Arc<LiveSession>>>,
    status_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    directory: Arc<dyn UserDirectory>,
}

impl PresenceRegistry {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            status_locks: Mutex::new(HashMap::new()),
            directory,
        }
    }

    fn status_lock(&self, username: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.status_locks
            .lock()
            .entry(username.to_string())
            .or_default()
            .clone()
    }

    async fn write_status(&self, username: &str, status: UserStatus) {
        if let Err(e) = self.directory.set_status(username, status).await {
            warn!("[Presence] Failed to mark {} {}: {}", username, status, e);
        }
    }

    /// Add `session` and mark its user ONLINE, returning the session it
    /// replaced if any.
    pub async fn register(&self, session: Arc<LiveSession>) -> Option<Arc<LiveSession>> {
        let username = session.username().to_string();
        let lock = self.status_lock(&username);
        let _held = lock.lock().await;

        let replaced = self.sessions.write().insert(username.clone(), session);
        if replaced.is_some() {
            info!("[Presence] Replaced existing session for {}", username);
        } else {
            debug!("[Presence] Registered {}", username);
        }
        self.write_status(&username, UserStatus::Online).await;
        replaced
    }

    /// Remove the entry for `username` only if it still belongs to
    /// `session_id`, then mark the user OFFLINE.
    ///
    /// A stale session's cleanup leaves a newer session (and the user's
    /// ONLINE status) untouched.
    pub async fn remove(&self, username: &str, session_id: Uuid) -> bool {
        let lock = self.status_lock(username);
        let _held = lock.lock().await;

        let removed = {
            let mut sessions = self.sessions.write();
            let is_current = sessions
                .get(username)
                .is_some_and(|current| current.id() == session_id);
            if is_current {
                sessions.remove(username);
            }
            is_current
        };

        if !removed {
            debug!("[Presence] Stale removal for {} ignored", username);
            return false;
        }

        info!("[Presence] {} left", username);
        self.write_status(username, UserStatus::Offline).await;
        true
    }

    /// Rewrite the user's status from current membership: ONLINE while a
    /// session is registered, OFFLINE otherwise.
    pub async fn sync_status(&self, username: &str) -> UserStatus {
        let lock = self.status_lock(username);
        let _held = lock.lock().await;

        let status = if self.sessions.read().contains_key(username) {
            UserStatus::Online
        } else {
            UserStatus::Offline
        };
        self.write_status(username, status).await;
        status
    }

    pub fn lookup(&self, username: &str) -> Option<Arc<LiveSession>> {
        self.sessions.read().get(username).cloned()
    }

    /// Point-in-time copy, safe to iterate while pushes block
    pub fn snapshot(&self) -> Vec<Arc<LiveSession>> {
        self.sessions.read().values().cloned().collect()
    }

    pub fn online_usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

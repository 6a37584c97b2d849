//! Delivery Engine
//!
//! Decides for every submission whether to push it live or store it as
//! pending, and replays pending messages when a user connects.
//!
//! Replay happens synchronously inside [`DeliveryEngine::connect_user`]:
//! the caller gets the session back only after every pending message has
//! been pushed, so connect latency grows with the backlog. Pushes into a
//! freshly opened session never block on the client because the channel
//! is unbounded.

use crate::chat::error::{DeliveryError, DeliveryResult};
use crate::chat::presence::PresenceRegistry;
use crate::chat::session::{CloseReason, EventReceiver, EventSequence, LiveSession};
use crate::core::directory::UserDirectory;
use crate::core::models::{
    ChatMessage, DeliveryEvent, Message, MessageStatus, NewUser, User, UserProfile, UserStatus,
};
use crate::core::notify::{Notice, Notifier};
use crate::core::store::MessageStore;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables for the engine
#[derive(Clone, Debug)]
pub struct EngineSettings {
    /// `None` keeps sessions open until the client leaves
    pub session_timeout: Option<Duration>,
    /// Signature used in pending-message notifications
    pub app_name: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            session_timeout: None,
            app_name: "Relay Chat".to_string(),
        }
    }
}

/// A freshly connected user: the session plus the stream of its events
pub struct Connection {
    pub session: Arc<LiveSession>,
    pub events: EventReceiver,
}

pub struct DeliveryEngine {
    directory: Arc<dyn UserDirectory>,
    store: Arc<dyn MessageStore>,
    notifier: Arc<dyn Notifier>,
    registry: Arc<PresenceRegistry>,
    events: EventSequence,
    settings: EngineSettings,
}

impl DeliveryEngine {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn MessageStore>,
        notifier: Arc<dyn Notifier>,
        settings: EngineSettings,
    ) -> Self {
        let registry = Arc::new(PresenceRegistry::new(directory.clone()));
        Self {
            directory,
            store,
            notifier,
            registry,
            events: EventSequence::new(),
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<PresenceRegistry> {
        &self.registry
    }

    /// Open a live session for `username` and replay its pending messages.
    pub async fn connect_user(&self, username: &str) -> DeliveryResult<Connection> {
        let user = self
            .directory
            .find_by_username(username)
            .await?
            .ok_or_else(|| DeliveryError::UserNotFound(username.to_string()))?;

        let (session, events) =
            LiveSession::open(username, &self.registry, self.settings.session_timeout);

        if let Some(previous) = self.registry.register(session.clone()).await {
            previous.close(CloseReason::Completion).await;
        }

        if let Err(e) = self.replay_pending(&user, &session).await {
            session.close(CloseReason::Error).await;
            return Err(e);
        }

        info!("[Delivery] New user logged in: {}", username);
        Ok(Connection { session, events })
    }

    async fn replay_pending(&self, user: &User, session: &LiveSession) -> DeliveryResult<()> {
        let pending = self.store.find_pending_for(user.id).await?;
        if !pending.is_empty() {
            self.replay(session, pending).await?;
        }
        Ok(())
    }

    /// Push each pending message in store order, marking it SENT as it
    /// goes. A failed push closes the session and stops the replay.
    async fn replay(&self, session: &LiveSession, pending: Vec<Message>) -> DeliveryResult<usize> {
        let total = pending.len();
        let mut sender_names: HashMap<i64, String> = HashMap::new();
        let mut replayed = 0;

        for message in pending {
            let sender = self.sender_name(message.sender_id, &mut sender_names).await?;
            let pushed = session
                .push(&self.events, |id| DeliveryEvent::chat(id, &message.content, sender))
                .await;

            if !pushed {
                warn!(
                    "[Delivery] Replay to {} aborted after {}/{} messages",
                    session.username(),
                    replayed,
                    total
                );
                break;
            }

            self.store
                .update_status(message.id, MessageStatus::Sent, Utc::now())
                .await?;
            replayed += 1;
        }

        info!(
            "[Delivery] Replayed {} pending message(s) to {}",
            replayed,
            session.username()
        );
        Ok(replayed)
    }

    async fn sender_name(
        &self,
        sender_id: i64,
        cache: &mut HashMap<i64, String>,
    ) -> DeliveryResult<String> {
        if let Some(name) = cache.get(&sender_id) {
            return Ok(name.clone());
        }
        let name = match self.directory.find_by_id(sender_id).await? {
            Some(user) => user.username,
            None => {
                warn!("[Delivery] Sender id {} no longer resolves", sender_id);
                String::new()
            }
        };
        cache.insert(sender_id, name.clone());
        Ok(name)
    }

    /// Deliver `message` from `sender`.
    ///
    /// Returns `true` when it was pushed live, `false` when it was stored
    /// as pending.
    pub async fn submit_message(&self, message: &ChatMessage, sender: &str) -> DeliveryResult<bool> {
        let receiver = self
            .directory
            .find_by_username(&message.user_name)
            .await?
            .ok_or_else(|| DeliveryError::ReceiverNotFound(message.user_name.clone()))?;

        let sender = self
            .directory
            .find_by_username(sender)
            .await?
            .ok_or_else(|| DeliveryError::SenderNotFound(sender.to_string()))?;

        if receiver.status == UserStatus::Online {
            if self.push_live(&receiver, &message.message_content, &sender).await {
                self.store
                    .insert(
                        &message.message_content,
                        sender.id,
                        receiver.id,
                        MessageStatus::Sent,
                        Utc::now(),
                    )
                    .await?;
                info!("[Delivery] Notified user {} of a new message", receiver.username);
                return Ok(true);
            }
            debug!(
                "[Delivery] {} is ONLINE but has no reachable session",
                receiver.username
            );
        }

        self.store_pending(&message.message_content, &sender, &receiver)
            .await?;
        Ok(false)
    }

    async fn push_live(&self, receiver: &User, content: &str, sender: &User) -> bool {
        let target = self
            .registry
            .snapshot()
            .into_iter()
            .find(|session| session.username() == receiver.username);

        match target {
            Some(session) => {
                session
                    .push(&self.events, |id| {
                        DeliveryEvent::chat(id, content, &sender.username)
                    })
                    .await
            }
            None => false,
        }
    }

    async fn store_pending(&self, content: &str, sender: &User, receiver: &User) -> DeliveryResult<()> {
        self.store
            .insert(
                content,
                sender.id,
                receiver.id,
                MessageStatus::Pending,
                Utc::now(),
            )
            .await?;

        let notice = Notice::pending_message(
            &receiver.email,
            &receiver.last_name,
            &sender.username,
            &self.settings.app_name,
        );
        if let Err(e) = self.notifier.notify(&notice).await {
            warn!(
                "[Delivery] Failed to notify {} about a pending message: {}",
                receiver.username, e
            );
        }

        info!(
            "[Delivery] Message stored as PENDING for {}",
            receiver.username
        );
        Ok(())
    }

    /// Close the user's live session, if any, and mark them OFFLINE.
    ///
    /// A session registered by a reconnect racing the logout survives and
    /// keeps the user ONLINE.
    pub async fn disconnect_user(&self, username: &str) -> DeliveryResult<()> {
        if let Some(session) = self.registry.lookup(username) {
            session.close(CloseReason::Completion).await;
        }
        self.registry.sync_status(username).await;
        info!("[Delivery] User {} logged out", username);
        Ok(())
    }

    /// Create a directory entry for a new user, OFFLINE until they connect.
    pub async fn register_user(&self, user: NewUser) -> DeliveryResult<UserProfile> {
        let username = user.username.clone();
        match self.directory.create_user(user).await? {
            Some(created) => {
                info!("[Delivery] Registered user {}", created.username);
                Ok(UserProfile::from(created))
            }
            None => Err(DeliveryError::UsernameTaken(username)),
        }
    }

    pub fn online_users(&self) -> Vec<String> {
        self.registry.online_usernames()
    }

    pub async fn user_profile(&self, username: &str) -> DeliveryResult<UserProfile> {
        self.directory
            .find_by_username(username)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| DeliveryError::UserNotFound(username.to_string()))
    }
}

//! Live Channel Session
//!
//! One user's open event stream. The session is ACTIVE while it owns the
//! sending half of its channel and CLOSED once that half has been taken.
//! Every termination path (completion, transport error, timeout, failed
//! push) funnels through [`LiveSession::close`], which runs its cleanup at
//! most once.

use crate::chat::presence::PresenceRegistry;
use crate::core::models::DeliveryEvent;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client went away cleanly
    Completion,
    /// Transport write failed
    Error,
    Timeout,
}

pub struct LiveSession {
    id: Uuid,
    username: String,
    sender: Mutex<Option<mpsc::UnboundedSender<DeliveryEvent>>>,
    registry: Weak<PresenceRegistry>,
}

/// Receiving half handed to the transport layer
pub type EventReceiver = mpsc::UnboundedReceiver<DeliveryEvent>;

impl LiveSession {
    /// Allocate an ACTIVE session for `username`.
    ///
    /// With `timeout` set to `None` the session never expires on its own;
    /// it lives until the client or transport tears it down.
    pub fn open(
        username: &str,
        registry: &Arc<PresenceRegistry>,
        timeout: Option<Duration>,
    ) -> (Arc<Self>, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            sender: Mutex::new(Some(tx)),
            registry: Arc::downgrade(registry),
        });

        if let Some(timeout) = timeout {
            let weak = Arc::downgrade(&session);
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if let Some(session) = weak.upgrade() {
                    session.close(CloseReason::Timeout).await;
                }
            });
        }

        debug!("[Session] Opened {} for {}", session.id, session.username);
        (session, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn state(&self) -> SessionState {
        if self.sender.lock().is_some() {
            SessionState::Active
        } else {
            SessionState::Closed
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Deliver one event built around the next id from `sequence`.
    ///
    /// The id is drawn while the sequence lock is held across the send, so
    /// ids reach every receiver in the order they were assigned. Returns
    /// `false` if the session is already closed or the receiving stream is
    /// gone; in the latter case the session is closed with
    /// [`CloseReason::Error`] before returning.
    pub async fn push<F>(&self, sequence: &EventSequence, build: F) -> bool
    where
        F: FnOnce(u64) -> DeliveryEvent,
    {
        let (event_id, sent) = {
            let guard = self.sender.lock();
            let Some(tx) = guard.as_ref() else {
                return false;
            };
            let mut last = sequence.last.lock();
            *last += 1;
            (*last, tx.send(build(*last)).is_ok())
        };

        if !sent {
            warn!(
                "[Session] Push of event {} to {} failed, closing",
                event_id, self.username
            );
            self.close(CloseReason::Error).await;
        }
        sent
    }

    /// Move to CLOSED and leave the registry.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub async fn close(&self, reason: CloseReason) -> bool {
        let taken = self.sender.lock().take();
        if taken.is_none() {
            return false;
        }
        drop(taken);

        match reason {
            CloseReason::Completion => info!("[Session] {} disconnected", self.username),
            CloseReason::Error | CloseReason::Timeout => info!(
                "[Session] Error during communication ({:?}). The user {} is not logged in!",
                reason, self.username
            ),
        }

        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.username, self.id).await;
        }
        true
    }
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("state", &self.state())
            .finish()
    }
}

/// Process-wide event id source.
///
/// Starts at 1 and pre-increments, so the first assigned id is 2. Lock
/// order is session sender first, then the sequence.
pub struct EventSequence {
    last: Mutex<u64>,
}

impl EventSequence {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(1),
        }
    }

    /// Last id handed out
    pub fn current(&self) -> u64 {
        *self.last.lock()
    }
}

impl Default for EventSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Closes the session with [`CloseReason::Completion`] when the owning
/// stream is dropped.
pub struct SessionGuard {
    session: Arc<LiveSession>,
}

impl SessionGuard {
    pub fn new(session: Arc<LiveSession>) -> Self {
        Self { session }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.session.is_active() {
            return;
        }
        let session = self.session.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                session.close(CloseReason::Completion).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::test_support::FakeDirectory;
    use crate::core::models::UserStatus;

    fn registry_with(directory: &Arc<FakeDirectory>) -> Arc<PresenceRegistry> {
        Arc::new(PresenceRegistry::new(directory.clone()))
    }

    #[tokio::test]
    async fn test_push_reaches_receiver() {
        let directory = Arc::new(FakeDirectory::with_users(&["bob"]));
        let registry = registry_with(&directory);
        let (session, mut rx) = LiveSession::open("bob", &registry, None);
        let sequence = EventSequence::new();

        assert!(session.push(&sequence, |id| DeliveryEvent::chat(id, "hi", "alice")).await);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.id, 2);
        assert_eq!(event.payload.message_content, "hi");
        assert_eq!(sequence.current(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_ids_arrive_in_assignment_order_across_sessions() {
        let directory = Arc::new(FakeDirectory::with_users(&["alice", "bob"]));
        let registry = registry_with(&directory);
        let (alice, mut alice_rx) = LiveSession::open("alice", &registry, None);
        let (bob, mut bob_rx) = LiveSession::open("bob", &registry, None);
        let sequence = Arc::new(EventSequence::new());

        let handles: Vec<_> = (0..1000)
            .map(|i| {
                let session = if i % 2 == 0 { alice.clone() } else { bob.clone() };
                let sequence = sequence.clone();
                tokio::spawn(async move {
                    session
                        .push(&sequence, |id| DeliveryEvent::chat(id, "x", "carol"))
                        .await
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        for rx in [&mut alice_rx, &mut bob_rx] {
            let mut previous = 0;
            for _ in 0..500 {
                let event = rx.recv().await.unwrap();
                assert!(event.id > previous, "{} after {}", event.id, previous);
                previous = event.id;
            }
        }
        assert_eq!(sequence.current(), 1001);
    }

    #[tokio::test]
    async fn test_push_after_receiver_dropped_closes_session() {
        let directory = Arc::new(FakeDirectory::with_users(&["bob"]));
        let registry = registry_with(&directory);
        let (session, rx) = LiveSession::open("bob", &registry, None);
        registry.register(session.clone()).await;
        directory.set_status_now("bob", UserStatus::Online);
        drop(rx);

        let sequence = EventSequence::new();
        assert!(!session.push(&sequence, |id| DeliveryEvent::chat(id, "hi", "alice")).await);
        assert_eq!(session.state(), SessionState::Closed);
        assert!(registry.lookup("bob").is_none());
        assert_eq!(directory.status_of("bob"), Some(UserStatus::Offline));

        // Closed sessions reject further pushes without side effects
        assert!(!session.push(&sequence, |id| DeliveryEvent::chat(id, "again", "alice")).await);
    }

    #[tokio::test]
    async fn test_termination_is_idempotent() {
        let directory = Arc::new(FakeDirectory::with_users(&["bob"]));
        let registry = registry_with(&directory);
        let (session, _rx) = LiveSession::open("bob", &registry, None);
        registry.register(session.clone()).await;

        assert!(session.close(CloseReason::Completion).await);
        assert!(!session.close(CloseReason::Error).await);
        assert!(!session.close(CloseReason::Timeout).await);
        assert!(!session.close(CloseReason::Completion).await);

        assert!(registry.lookup("bob").is_none());
        assert_eq!(directory.offline_transitions("bob"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_termination_runs_cleanup_once() {
        let directory = Arc::new(FakeDirectory::with_users(&["bob"]));
        let registry = registry_with(&directory);
        let (session, _rx) = LiveSession::open("bob", &registry, None);
        registry.register(session.clone()).await;

        let reasons = [
            CloseReason::Completion,
            CloseReason::Error,
            CloseReason::Timeout,
            CloseReason::Error,
        ];
        let handles: Vec<_> = reasons
            .into_iter()
            .map(|reason| {
                let session = session.clone();
                tokio::spawn(async move { session.close(reason).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(directory.offline_transitions("bob"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_closes_session() {
        let directory = Arc::new(FakeDirectory::with_users(&["bob"]));
        let registry = registry_with(&directory);
        let (session, _rx) = LiveSession::open("bob", &registry, Some(Duration::from_secs(30)));
        registry.register(session.clone()).await;

        tokio::time::sleep(Duration::from_secs(31)).await;
        // Let the timer task finish its cleanup
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(session.state(), SessionState::Closed);
        assert!(registry.lookup("bob").is_none());
    }

    #[tokio::test]
    async fn test_guard_drop_completes_session() {
        let directory = Arc::new(FakeDirectory::with_users(&["bob"]));
        let registry = registry_with(&directory);
        let (session, _rx) = LiveSession::open("bob", &registry, None);
        registry.register(session.clone()).await;

        drop(SessionGuard::new(session.clone()));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(session.state(), SessionState::Closed);
        assert!(registry.lookup("bob").is_none());
    }
}

//! Connection manager for tracking and managing client sessions.
//!
//! Sessions are registered when a connection is accepted and removed by the
//! connection's teardown. A user can be logged in on at most one session; a
//! second login marks the older session dead.

use super::client::ClientConnection;
use bytes::Bytes;
use dashmap::DashMap;
use habitat_event_system::{
    DisconnectReason, Session, SessionId, SessionRef, UserId,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Central registry of open sessions.
///
/// # Architecture
///
/// * Uses `DashMap` for lock-free lookups from many handler tasks
/// * Implements atomic session ID generation
/// * Maintains the user to session mapping used for duplicate logins
#[derive(Debug)]
pub struct ConnectionManager {
    connections: DashMap<SessionId, ClientConnection>,
    users: DashMap<UserId, SessionId>,
    next_id: AtomicU64,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            users: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Creates and registers a session for a freshly accepted connection.
    /// The receiver is the session's outbound queue.
    pub fn open(
        &self,
        remote_addr: SocketAddr,
        queue_capacity: usize,
    ) -> (SessionRef, mpsc::Receiver<Bytes>) {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (session, outbound) = Session::channel(id, remote_addr, queue_capacity);
        self.connections
            .insert(id, ClientConnection::new(session.clone()));
        info!("🔗 Connection {} from {}", id, remote_addr);
        (session, outbound)
    }

    /// Records that `session` is now logged in as `user`. If another
    /// session held the same user it is marked dead and returned.
    pub fn bind_user(&self, session: &SessionRef, user: UserId) -> Option<SessionRef> {
        let previous = self.users.insert(user, session.id())?;
        if previous == session.id() {
            return None;
        }
        let older = self.get(previous)?;
        if older.mark_dead(DisconnectReason::DuplicateLogin) {
            info!("👥 User {} logged in again, closing {}", user, previous);
        }
        Some(older)
    }

    /// Forgets a session. The user mapping is only dropped when it still
    /// points at this session.
    pub fn remove(&self, session: &Session) {
        if let Some((id, connection)) = self.connections.remove(&session.id()) {
            info!(
                "❌ Connection {} from {} disconnected",
                id, connection.remote_addr
            );
        }
        if let Some(user) = session.user_id() {
            self.users
                .remove_if(&user, |_, current| *current == session.id());
        }
    }

    pub fn get(&self, id: SessionId) -> Option<SessionRef> {
        self.connections
            .get(&id)
            .map(|entry| entry.value().session.clone())
    }

    pub fn by_user(&self, user: UserId) -> Option<SessionRef> {
        let id = *self.users.get(&user)?;
        self.get(id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn online_users(&self) -> usize {
        self.users.len()
    }

    pub fn sessions(&self) -> Vec<SessionRef> {
        self.connections
            .iter()
            .map(|entry| entry.value().session.clone())
            .collect()
    }

    /// Queues an encoded frame on every open session. Returns how many
    /// accepted it.
    pub fn broadcast_to_all(&self, frame: Bytes) -> usize {
        let delivered = self
            .sessions()
            .into_iter()
            .filter(|session| session.send_frame(frame.clone()))
            .count();
        debug!("📡 Broadcasted frame to {} sessions", delivered);
        delivered
    }

    /// Marks the user's session dead; its connection task tears it down.
    pub fn kick_user(&self, user: UserId, reason: DisconnectReason) -> bool {
        match self.by_user(user) {
            Some(session) => session.mark_dead(reason),
            None => false,
        }
    }

    /// Marks every session dead, e.g. on shutdown.
    pub fn close_all(&self, reason: DisconnectReason) -> usize {
        self.sessions()
            .into_iter()
            .filter(|session| session.mark_dead(reason))
            .count()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitat_event_system::Identity;

    fn addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn login(session: &SessionRef, user: u32) {
        session.set_identity(Identity {
            user_id: UserId(user),
            username: format!("user{user}"),
            figure: String::new(),
            motto: String::new(),
            sex: "M".into(),
            rank: 1,
        });
    }

    #[test]
    fn second_login_closes_the_first_session() {
        let manager = ConnectionManager::new();
        let (first, _rx1) = manager.open(addr(), 8);
        let (second, _rx2) = manager.open(addr(), 8);
        login(&first, 7);
        login(&second, 7);

        assert!(manager.bind_user(&first, UserId(7)).is_none());
        let kicked = manager.bind_user(&second, UserId(7)).unwrap();

        assert_eq!(kicked.id(), first.id());
        assert_eq!(first.dead_reason(), Some(DisconnectReason::DuplicateLogin));
        assert!(!second.is_dead());
        assert_eq!(manager.by_user(UserId(7)).unwrap().id(), second.id());
    }

    #[test]
    fn removing_a_stale_session_keeps_the_newer_login() {
        let manager = ConnectionManager::new();
        let (first, _rx1) = manager.open(addr(), 8);
        let (second, _rx2) = manager.open(addr(), 8);
        login(&first, 7);
        login(&second, 7);
        manager.bind_user(&first, UserId(7));
        manager.bind_user(&second, UserId(7));

        manager.remove(&first);

        assert_eq!(manager.connection_count(), 1);
        assert_eq!(manager.by_user(UserId(7)).unwrap().id(), second.id());
        manager.remove(&second);
        assert_eq!(manager.online_users(), 0);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_open_session() {
        let manager = ConnectionManager::new();
        let (_a, mut rx_a) = manager.open(addr(), 8);
        let (_b, mut rx_b) = manager.open(addr(), 8);

        assert_eq!(manager.broadcast_to_all(Bytes::from_static(b"@@\x01")), 2);
        assert_eq!(&rx_a.recv().await.unwrap()[..], b"@@\x01");
        assert_eq!(&rx_b.recv().await.unwrap()[..], b"@@\x01");

        assert_eq!(manager.close_all(DisconnectReason::ServerShutdown), 2);
        assert_eq!(manager.close_all(DisconnectReason::ServerShutdown), 0);
    }
}

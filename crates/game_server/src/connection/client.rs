//! Client connection representation.

use habitat_event_system::SessionRef;
use std::net::SocketAddr;
use std::time::SystemTime;

/// One open connection as the connection manager sees it.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    /// Shared handle used by handlers and rooms
    pub session: SessionRef,

    /// The remote network address of the client
    pub remote_addr: SocketAddr,

    /// When this connection was established
    pub connected_at: SystemTime,
}

impl ClientConnection {
    pub fn new(session: SessionRef) -> Self {
        Self {
            remote_addr: session.remote_addr(),
            session,
            connected_at: SystemTime::now(),
        }
    }
}

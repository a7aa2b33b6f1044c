//! # Core Type Definitions
//!
//! Identifier newtypes shared by the session layer and the room engine, and
//! the authenticated identity a session may carry.
//!
//! - [`SessionId`] - one per accepted connection, never reused while running
//! - [`UserId`] - durable account id from the user repository
//! - [`RoomId`] - durable room id; `0` is reserved for "no room"
//! - [`Identity`] - the account bound to a session after login

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Durable account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable room identifier. Valid rooms start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub u32);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rank from which an identity counts as staff and holds rights everywhere.
pub const STAFF_RANK: u8 = 5;

/// Account bound to a session after a successful login.
///
/// Immutable once bound; a figure or motto change binds a fresh identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub figure: String,
    pub motto: String,
    /// `M` or `F`, as the client expects it.
    pub sex: String,
    pub rank: u8,
}

impl Identity {
    pub fn is_staff(&self) -> bool {
        self.rank >= STAFF_RANK
    }
}

/// Reason a session was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisconnectReason {
    /// Client closed the stream.
    ClientDisconnect,
    /// A write failed or the outbound queue overflowed.
    WriteFailure,
    /// No pong arrived in time.
    Timeout,
    /// Logged in from another connection.
    DuplicateLogin,
    /// The client sent a frame the server refuses to decode.
    ProtocolViolation,
    /// Server shutting down.
    ServerShutdown,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DisconnectReason::ClientDisconnect => "client disconnect",
            DisconnectReason::WriteFailure => "write failure",
            DisconnectReason::Timeout => "timeout",
            DisconnectReason::DuplicateLogin => "duplicate login",
            DisconnectReason::ProtocolViolation => "protocol violation",
            DisconnectReason::ServerShutdown => "server shutdown",
        };
        f.write_str(text)
    }
}

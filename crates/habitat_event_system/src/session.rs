//! Per-connection session handle.
//!
//! A [`Session`] is shared between the connection's read task, its write task,
//! packet handlers and every room the user is standing in. Sending never
//! blocks: frames go into a bounded queue drained by the write task, and a
//! full or closed queue marks the session dead instead of waiting. That keeps
//! room locks free of network back-pressure.

use crate::types::{DisconnectReason, Identity, RoomId, SessionId, UserId};
use crate::utils::current_timestamp;
use arc_swap::ArcSwapOption;
use bytes::Bytes;
use habitat_protocol::OutboundMessage;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tracing::debug;

pub type SessionRef = Arc<Session>;

const NO_ROOM: u32 = 0;
const ALIVE: u8 = u8::MAX;

pub struct Session {
    id: SessionId,
    remote_addr: SocketAddr,
    connected_at: u64,
    identity: ArcSwapOption<Identity>,
    room: AtomicU32,
    outbound: mpsc::Sender<Bytes>,
    dead_reason: AtomicU8,
    closed: Notify,
    torn_down: AtomicBool,
    last_pong: AtomicU64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("remote_addr", &self.remote_addr)
            .field("user_id", &self.user_id())
            .field("room", &self.current_room())
            .field("dead", &self.is_dead())
            .finish()
    }
}

impl Session {
    /// Creates a session together with the receiving end of its outbound
    /// queue, which the connection's write task drains.
    pub fn channel(
        id: SessionId,
        remote_addr: SocketAddr,
        capacity: usize,
    ) -> (SessionRef, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let now = current_timestamp();
        let session = Arc::new(Self {
            id,
            remote_addr,
            connected_at: now,
            identity: ArcSwapOption::empty(),
            room: AtomicU32::new(NO_ROOM),
            outbound: tx,
            dead_reason: AtomicU8::new(ALIVE),
            closed: Notify::new(),
            torn_down: AtomicBool::new(false),
            last_pong: AtomicU64::new(now),
        });
        (session, rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn connected_at(&self) -> u64 {
        self.connected_at
    }

    /// The bound account, if the session has logged in.
    pub fn identity(&self) -> Option<Arc<Identity>> {
        self.identity.load_full()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.identity.load().as_ref().map(|identity| identity.user_id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.load().is_some()
    }

    pub fn set_identity(&self, identity: Identity) {
        self.identity.store(Some(Arc::new(identity)));
    }

    pub fn current_room(&self) -> Option<RoomId> {
        match self.room.load(Ordering::SeqCst) {
            NO_ROOM => None,
            id => Some(RoomId(id)),
        }
    }

    pub fn set_current_room(&self, room: Option<RoomId>) {
        self.room
            .store(room.map_or(NO_ROOM, |id| id.0), Ordering::SeqCst);
    }

    /// Queues a message. Returns `false` when the session is (now) dead.
    pub fn send(&self, message: &OutboundMessage) -> bool {
        self.send_frame(message.encode())
    }

    /// Queues an already encoded frame, so broadcasts serialize once.
    pub fn send_frame(&self, frame: Bytes) -> bool {
        if self.is_dead() {
            return false;
        }
        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("📪 Outbound queue full for {}", self.id);
                self.mark_dead(DisconnectReason::WriteFailure);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead(DisconnectReason::WriteFailure);
                false
            }
        }
    }

    /// Flags the session dead and wakes its connection task. Only the first
    /// call records a reason; returns whether this call was the first.
    pub fn mark_dead(&self, reason: DisconnectReason) -> bool {
        if self
            .dead_reason
            .compare_exchange(ALIVE, encode_reason(reason), Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.closed.notify_one();
        true
    }

    /// Room and dead flag are both sequentially consistent: room entry
    /// publishes the room then checks the flag, teardown sets the flag then
    /// reads the room, and one of them must see the other.
    pub fn is_dead(&self) -> bool {
        self.dead_reason.load(Ordering::SeqCst) != ALIVE
    }

    pub fn dead_reason(&self) -> Option<DisconnectReason> {
        match self.dead_reason.load(Ordering::Acquire) {
            ALIVE => None,
            raw => Some(decode_reason(raw)),
        }
    }

    /// Resolves once the session has been marked dead.
    pub async fn closed(&self) {
        if self.is_dead() {
            return;
        }
        self.closed.notified().await;
    }

    /// Claims the right to tear this session down. Exactly one caller ever
    /// gets `true`.
    pub fn begin_teardown(&self) -> bool {
        !self.torn_down.swap(true, Ordering::AcqRel)
    }

    pub fn record_pong(&self) {
        self.last_pong.store(current_timestamp(), Ordering::Release);
    }

    pub fn seconds_since_pong(&self) -> u64 {
        current_timestamp().saturating_sub(self.last_pong.load(Ordering::Acquire))
    }
}

fn encode_reason(reason: DisconnectReason) -> u8 {
    match reason {
        DisconnectReason::ClientDisconnect => 0,
        DisconnectReason::WriteFailure => 1,
        DisconnectReason::Timeout => 2,
        DisconnectReason::DuplicateLogin => 3,
        DisconnectReason::ProtocolViolation => 4,
        DisconnectReason::ServerShutdown => 5,
    }
}

fn decode_reason(raw: u8) -> DisconnectReason {
    match raw {
        1 => DisconnectReason::WriteFailure,
        2 => DisconnectReason::Timeout,
        3 => DisconnectReason::DuplicateLogin,
        4 => DisconnectReason::ProtocolViolation,
        5 => DisconnectReason::ServerShutdown,
        _ => DisconnectReason::ClientDisconnect,
    }
}

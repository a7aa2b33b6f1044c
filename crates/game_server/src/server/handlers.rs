//! Connection handling logic for game clients.
//!
//! This module owns the lifecycle of a single TCP connection: admission,
//! the read loop that frames and dispatches packets, the write task that
//! drains the session's outbound queue, keep-alive pings and the one-time
//! teardown.

use crate::{
    config::ServerConfig, connection::ConnectionManager, error::ServerError,
    messaging::composers, security::SecurityManager,
};
use bytes::Bytes;
use habitat_event_system::{
    current_timestamp, DisconnectReason, EventSystem, PacketDispatcher, SessionClosedEvent,
    SessionOpenedEvent, SessionRef,
};
use habitat_protocol::{FrameReader, ProtocolError};
use room_engine::RoomManager;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

/// Everything a connection task needs, cloned once per accepted stream.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub config: Arc<ServerConfig>,
    pub events: Arc<EventSystem>,
    pub dispatcher: Arc<PacketDispatcher>,
    pub rooms: Arc<RoomManager>,
    pub connections: Arc<ConnectionManager>,
    pub security: Arc<SecurityManager>,
    /// Bounds how many packets are handled at once across all sessions.
    pub workers: Arc<Semaphore>,
}

/// Handles a single client connection from establishment to cleanup.
///
/// # Connection Flow
///
/// 1. Check the IP against bans and per-IP caps
/// 2. Register a session and send `HELLO`
/// 3. Emit `session_opened`
/// 4. Run the read loop until EOF, a protocol violation, a ping timeout or
///    until something else marks the session dead
/// 5. Tear the session down exactly once
///
/// # Message Handling
///
/// Frames of one session are dispatched strictly one after another, each
/// inside a permit of the shared worker pool. Outbound frames are written
/// by a separate task so a slow reader never blocks packet handling.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    context: ConnectionContext,
) -> Result<(), ServerError> {
    if let Err(e) = context.security.validate_connection(addr.ip()).await {
        warn!("🚫 Refusing connection from {}: {}", addr, e);
        return Ok(());
    }

    if let Err(e) = stream.set_nodelay(true) {
        trace!("Could not set TCP_NODELAY for {}: {}", addr, e);
    }
    let (read_half, write_half) = stream.into_split();
    let (session, outbound) = context
        .connections
        .open(addr, context.config.outbound_queue_capacity);

    let writer = tokio::spawn(write_frames(session.clone(), write_half, outbound));
    session.send(&composers::hello());

    let opened = SessionOpenedEvent {
        session_id: session.id(),
        remote_addr: addr.to_string(),
        timestamp: current_timestamp(),
    };
    if let Err(e) = context.events.emit_core("session_opened", &opened).await {
        warn!("⚠️ Failed to emit session_opened: {}", e);
    }

    let result = read_loop(&context, &session, read_half).await;
    if let Err(e) = &result {
        debug!("🔌 {} closed with error: {}", session.id(), e);
    }

    teardown(&context, &session).await;
    writer.abort();
    result
}

async fn read_loop(
    context: &ConnectionContext,
    session: &SessionRef,
    read_half: tokio::net::tcp::OwnedReadHalf,
) -> Result<(), ServerError> {
    let addr = session.remote_addr();
    let max_frame = context.security.config().max_message_size;
    let mut reader = FrameReader::new(read_half, max_frame);

    let ping_every = Duration::from_secs(context.config.ping_interval_secs.max(1));
    let mut ping = interval(ping_every);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately.
    ping.tick().await;

    loop {
        tokio::select! {
            frame = reader.read_message() => {
                let message = match frame {
                    Ok(Some(message)) => message,
                    Ok(None) => {
                        session.mark_dead(DisconnectReason::ClientDisconnect);
                        return Ok(());
                    }
                    Err(ProtocolError::FrameTooLarge { len, max }) => {
                        warn!("🚫 {} sent a {} byte frame (limit {})", session.id(), len, max);
                        session.mark_dead(DisconnectReason::ProtocolViolation);
                        return Ok(());
                    }
                    Err(e) => {
                        session.mark_dead(DisconnectReason::ClientDisconnect);
                        return Err(e.into());
                    }
                };

                if let Err(e) = context
                    .security
                    .validate_message(addr.ip(), message.body().len() + 2)
                    .await
                {
                    warn!("🚫 Dropping {} from {}: {}", session.id(), addr, e);
                    session.mark_dead(DisconnectReason::ProtocolViolation);
                    return Ok(());
                }

                let Ok(_permit) = context.workers.acquire().await else {
                    session.mark_dead(DisconnectReason::ServerShutdown);
                    return Ok(());
                };
                trace!("📨 {} -> header {}", session.id(), message.header());
                context.dispatcher.dispatch(session, message).await;
            }
            _ = session.closed() => {
                return Ok(());
            }
            _ = ping.tick() => {
                if session.seconds_since_pong() > context.config.connection_timeout {
                    info!("⏰ {} timed out waiting for a pong", session.id());
                    session.mark_dead(DisconnectReason::Timeout);
                    return Ok(());
                }
                session.send(&composers::ping());
            }
        }
    }
}

/// Drains the session's outbound queue onto the socket.
async fn write_frames(
    session: SessionRef,
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Bytes>,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = write_half.write_all(&frame).await {
            debug!("📪 Write to {} failed: {}", session.id(), e);
            session.mark_dead(DisconnectReason::WriteFailure);
            return;
        }
    }
}

/// Leaves the room, unregisters the session and emits `session_closed`.
/// Only the first caller for a session does anything.
pub async fn teardown(context: &ConnectionContext, session: &SessionRef) {
    if !session.begin_teardown() {
        return;
    }
    session.mark_dead(DisconnectReason::ClientDisconnect);
    let reason = session
        .dead_reason()
        .unwrap_or(DisconnectReason::ClientDisconnect);

    context.rooms.leave_room(session).await;
    context.connections.remove(session);
    context.security.on_disconnect(session.remote_addr().ip()).await;

    let closed = SessionClosedEvent {
        session_id: session.id(),
        user_id: session.user_id(),
        reason,
        timestamp: current_timestamp(),
    };
    if let Err(e) = context.events.emit_core("session_closed", &closed).await {
        error!("Failed to emit session_closed for {}: {}", session.id(), e);
    }
}

//! Core game server implementation.
//!
//! This module contains the main `GameServer` struct: it wires the packet
//! dispatcher to the room engine, accepts TCP clients and drives the room
//! tick scheduler until shutdown.

use crate::{
    config::ServerConfig,
    connection::ConnectionManager,
    error::ServerError,
    messaging::{register_handlers, HandlerContext},
    security::SecurityManager,
    server::handlers::{handle_connection, ConnectionContext},
};
use habitat_event_system::{
    DisconnectReason, EventSystem, PacketDispatcher, RoomLoadedEvent, RoomUnloadedEvent,
    SessionClosedEvent, SessionOpenedEvent, ShutdownState, UserLoggedInEvent,
};
use room_engine::RoomManager;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// How long shutdown waits for connection tasks to tear their sessions down.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The core game server structure.
///
/// `GameServer` orchestrates networking, packet dispatch and the room
/// scheduler. Game rules live in the room engine and the packet handlers;
/// the server only moves frames and time.
///
/// # Architecture
///
/// * **Event System**: lifecycle events for logging and observers
/// * **Packet Dispatcher**: header to handler routing with cancellable events
/// * **Room Manager**: loaded rooms, ticked by the scheduler
/// * **Connection Management**: session registry and duplicate logins
/// * **Worker Pool**: a semaphore bounding concurrent packet handling
pub struct GameServer {
    /// Server configuration settings
    config: Arc<ServerConfig>,

    /// Lifecycle event bus
    events: Arc<EventSystem>,

    /// Packet routing
    dispatcher: Arc<PacketDispatcher>,

    /// Loaded rooms and the repositories behind them
    rooms: Arc<RoomManager>,

    /// Manager for client sessions
    connections: Arc<ConnectionManager>,

    /// Connection admission and packet limits
    security: Arc<SecurityManager>,

    /// Inbound worker pool
    workers: Arc<Semaphore>,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl GameServer {
    /// Creates a new game server around an already built room manager.
    ///
    /// All built-in packet handlers are registered here, so observers may be
    /// attached to [`dispatcher`](Self::dispatcher) before the server starts.
    pub fn new(config: ServerConfig, rooms: Arc<RoomManager>, events: Arc<EventSystem>) -> Self {
        let connections = Arc::new(ConnectionManager::new());
        let dispatcher = Arc::new(PacketDispatcher::new());
        register_handlers(
            &dispatcher,
            HandlerContext {
                rooms: rooms.clone(),
                connections: connections.clone(),
                events: events.clone(),
                charset: config.charset(),
            },
        );

        let security = Arc::new(SecurityManager::new(config.security.clone()));
        let workers = Arc::new(Semaphore::new(config.worker_pool_size.max(1)));
        let (shutdown_sender, _) = broadcast::channel(1);

        Self {
            config: Arc::new(config),
            events,
            dispatcher,
            rooms,
            connections,
            security,
            workers,
            shutdown_sender,
        }
    }

    /// Starts the game server and runs until [`shutdown`](Self::shutdown).
    pub async fn start(&self) -> Result<(), ServerError> {
        self.start_with_shutdown_state(ShutdownState::new()).await
    }

    /// Starts the game server and begins accepting connections with graceful
    /// shutdown support.
    ///
    /// # Startup Sequence
    ///
    /// 1. Register core lifecycle event handlers
    /// 2. Bind the TCP listener
    /// 3. Start the room tick scheduler
    /// 4. Accept connections until shutdown is initiated
    /// 5. Close every session and flush dirty furniture
    pub async fn start_with_shutdown_state(&self, shutdown_state: ShutdownState) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_state).await
    }

    /// Binds the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let listener = TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| ServerError::Network(format!("Failed to bind {}: {e}", self.config.bind_address)))?;
        Ok(listener)
    }

    /// Runs the server on an already bound listener.
    pub async fn serve(&self, listener: TcpListener, shutdown_state: ShutdownState) -> Result<(), ServerError> {
        let local = listener
            .local_addr()
            .map_err(|e| ServerError::Network(e.to_string()))?;
        info!("🚀 Starting game server on {}", local);
        info!(
            "🧠 Worker pool: {} permits, {} packet handlers",
            self.config.worker_pool_size,
            self.dispatcher.handler_count()
        );

        self.register_core_handlers().await?;

        let scheduler = if self.config.tick_interval_ms > 0 {
            info!("🕒 Room tick started with interval: {}ms", self.config.tick_interval_ms);
            Some(self.start_room_tick(shutdown_state.clone()))
        } else {
            info!("⏸️ Room tick disabled (interval: 0ms)");
            None
        };

        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let context = self.connection_context();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };
                    if shutdown_state.is_shutdown_initiated() {
                        break;
                    }
                    if self.connections.connection_count() >= self.config.max_connections {
                        warn!("🚫 Refusing {}: {} connections open", addr, self.config.max_connections);
                        continue;
                    }

                    let context = context.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, context).await {
                            debug!("Connection error: {}", e);
                        }
                    });
                }
                _ = shutdown_state.wait_for_shutdown() => {
                    info!("🛑 Accept loop stopping - shutdown initiated");
                    break;
                }
                _ = shutdown_receiver.recv() => {
                    info!("Internal shutdown signal received");
                    shutdown_state.initiate_shutdown();
                    break;
                }
            }
        }
        drop(listener);

        info!("🧹 Performing server cleanup...");
        if let Some(scheduler) = scheduler {
            if let Err(e) = scheduler.await {
                error!("Room scheduler ended abnormally: {}", e);
            }
        }
        let closing = self.connections.close_all(DisconnectReason::ServerShutdown);
        info!("👋 Closing {} session(s)", closing);
        self.wait_for_sessions().await;
        self.rooms.flush_all().await;
        shutdown_state.complete_shutdown();

        info!("Server stopped");
        Ok(())
    }

    fn connection_context(&self) -> ConnectionContext {
        ConnectionContext {
            config: self.config.clone(),
            events: self.events.clone(),
            dispatcher: self.dispatcher.clone(),
            rooms: self.rooms.clone(),
            connections: self.connections.clone(),
            security: self.security.clone(),
            workers: self.workers.clone(),
        }
    }

    async fn wait_for_sessions(&self) {
        let deadline = Instant::now() + DRAIN_TIMEOUT;
        while self.connections.connection_count() > 0 {
            if Instant::now() >= deadline {
                warn!(
                    "⚠️ {} session(s) still open after {:?}",
                    self.connections.connection_count(),
                    DRAIN_TIMEOUT
                );
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Registers core lifecycle event handlers. They only log.
    async fn register_core_handlers(&self) -> Result<(), ServerError> {
        self.events
            .on_core("session_opened", |event: SessionOpenedEvent| {
                debug!("👋 {} opened from {}", event.session_id, event.remote_addr);
                Ok(())
            })
            .await?;

        self.events
            .on_core("session_closed", |event: SessionClosedEvent| {
                match event.user_id {
                    Some(user) => info!("👋 User {} left ({}): {}", user, event.session_id, event.reason),
                    None => debug!("👋 {} closed: {}", event.session_id, event.reason),
                }
                Ok(())
            })
            .await?;

        self.events
            .on_core("user_logged_in", |event: UserLoggedInEvent| {
                debug!("🔑 {} is user {}", event.session_id, event.user_id);
                Ok(())
            })
            .await?;

        self.events
            .on_core("room_loaded", |event: RoomLoadedEvent| {
                info!(
                    "🏠 Room {} loaded with {} item(s) and {} bot(s)",
                    event.room_id, event.furniture_count, event.bot_count
                );
                Ok(())
            })
            .await?;

        self.events
            .on_core("room_unloaded", |event: RoomUnloadedEvent| {
                info!("🏚️ Room {} unloaded", event.room_id);
                Ok(())
            })
            .await?;

        Ok(())
    }

    /// Starts the room scheduler: every loaded room ticks once per
    /// `tick_interval_ms`, and idle rooms are swept every
    /// `sweep_interval_secs`. Stops when shutdown is initiated.
    fn start_room_tick(&self, shutdown_state: ShutdownState) -> tokio::task::JoinHandle<()> {
        let rooms = self.rooms.clone();
        let security = self.security.clone();
        let tick_interval = self.config.tick_interval();
        let sweep_interval = Duration::from_secs(self.config.sweep_interval_secs.max(1));

        tokio::spawn(async move {
            let mut ticker = interval(tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut sweeper = interval(sweep_interval);
            sweeper.set_missed_tick_behavior(MissedTickBehavior::Delay);
            sweeper.tick().await;
            let mut tick_count: u64 = 0;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if shutdown_state.is_shutdown_initiated() {
                            break;
                        }
                        tick_count += 1;
                        rooms.tick_all().await;
                    }
                    _ = sweeper.tick() => {
                        let unloaded = rooms.sweep_idle().await;
                        if unloaded > 0 {
                            debug!("🧹 Swept {} idle room(s)", unloaded);
                        }
                        security.cleanup_stale_connections().await;
                    }
                    _ = shutdown_state.wait_for_shutdown() => break,
                }
            }

            info!("✅ Room tick loop completed gracefully after {} ticks", tick_count);
        })
    }

    /// Initiates server shutdown.
    ///
    /// Stops the accept loop and the scheduler; open sessions are closed and
    /// dirty furniture is flushed before [`start`](Self::start) returns.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        let _ = self.shutdown_sender.send(());
        Ok(())
    }

    pub fn get_event_system(&self) -> Arc<EventSystem> {
        self.events.clone()
    }

    pub fn dispatcher(&self) -> Arc<PacketDispatcher> {
        self.dispatcher.clone()
    }

    pub fn rooms(&self) -> Arc<RoomManager> {
        self.rooms.clone()
    }

    pub fn connections(&self) -> Arc<ConnectionManager> {
        self.connections.clone()
    }

    pub fn security(&self) -> Arc<SecurityManager> {
        self.security.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

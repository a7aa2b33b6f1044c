//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize and customize the game server behavior.

use habitat_protocol::Charset;
use room_engine::RoomSettings;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Configuration structure for the game server.
///
/// Contains the network settings, connection limits, worker pool size and
/// the room tick cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Seconds without a pong before a session is dropped
    pub connection_timeout: u64,

    /// Seconds between keep-alive pings
    pub ping_interval_secs: u64,

    /// Room tick interval in milliseconds (0 to disable)
    pub tick_interval_ms: u64,

    /// Seconds between sweeps for idle rooms
    pub sweep_interval_secs: u64,

    /// Permits of the inbound worker pool; at most this many packets are
    /// handled at the same time across all sessions
    pub worker_pool_size: usize,

    /// Frames buffered per session before it counts as stalled
    pub outbound_queue_capacity: usize,

    /// Decode client strings as Latin-1 instead of UTF-8
    #[serde(default)]
    pub latin1_text: bool,

    /// Room engine tunables
    pub rooms: RoomConfig,

    /// Security configuration settings
    pub security: SecurityConfig,
}

/// Room engine tunables in their serializable form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Tiles within which bots react to users
    pub reaction_radius: i32,

    /// Nodes the pathfinder may expand per request
    pub max_path_nodes: usize,

    /// Seconds an empty room stays loaded
    pub unload_grace_secs: u64,
}

/// Security configuration for connection and message limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable rate limiting
    pub enable_rate_limiting: bool,

    /// Maximum packets per minute per IP
    pub max_requests_per_minute: u32,

    /// Maximum frame size in bytes
    pub max_message_size: usize,

    /// Enable per-IP connection caps
    pub enable_ddos_protection: bool,

    /// Banned IP addresses
    pub banned_ips: Vec<IpAddr>,

    /// Maximum concurrent connections per IP
    pub max_connections_per_ip: u32,
}

impl ServerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn charset(&self) -> Charset {
        if self.latin1_text {
            Charset::Latin1
        } else {
            Charset::Utf8
        }
    }

    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            reaction_radius: self.rooms.reaction_radius,
            max_path_nodes: self.rooms.max_path_nodes,
            unload_grace: Duration::from_secs(self.rooms.unload_grace_secs),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 30000)),
            max_connections: 1000,
            connection_timeout: 60,
            ping_interval_secs: 30,
            tick_interval_ms: 500,
            sweep_interval_secs: 30,
            worker_pool_size: num_cpus::get() * 4,
            outbound_queue_capacity: 512,
            latin1_text: false,
            rooms: RoomConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        let settings = RoomSettings::default();
        Self {
            reaction_radius: settings.reaction_radius,
            max_path_nodes: settings.max_path_nodes,
            unload_grace_secs: settings.unload_grace.as_secs(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_rate_limiting: true,
            max_requests_per_minute: 600,
            max_message_size: 8 * 1024,
            enable_ddos_protection: true,
            banned_ips: Vec::new(),
            max_connections_per_ip: 10,
        }
    }
}

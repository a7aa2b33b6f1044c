//! Configuration management for the Habitat server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files and command-line arguments.

use game_server::{RoomConfig, SecurityConfig, ServerConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application configuration loaded from TOML file.
///
/// Every section may be omitted; missing values fall back to the server
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network and scheduler settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Room engine tunables
    #[serde(default)]
    pub rooms: RoomConfig,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Bans, per-IP caps and packet limits
    #[serde(default)]
    pub security: SecurityConfig,
    /// Where the world data lives
    #[serde(default)]
    pub world: WorldSettings,
}

/// Server-specific configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "127.0.0.1:30000")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Maximum number of concurrent client connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Seconds without a pong before a session is dropped
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
    /// Seconds between keep-alive pings
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    /// Room tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Seconds between idle room sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Packets handled concurrently across all sessions
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
    /// Frames buffered per session before it is dropped as stalled
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Decode client strings as Latin-1 instead of UTF-8
    #[serde(default)]
    pub latin1_text: bool,
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSettings {
    /// JSON world file; the demo world is written here when it is missing
    #[serde(default = "default_world_path")]
    pub path: PathBuf,
    /// Write the world back to `path` after shutdown
    #[serde(default = "default_save_on_shutdown")]
    pub save_on_shutdown: bool,
}

fn default_bind_address() -> String {
    ServerConfig::default().bind_address.to_string()
}

fn default_max_connections() -> usize {
    ServerConfig::default().max_connections
}

fn default_connection_timeout() -> u64 {
    ServerConfig::default().connection_timeout
}

fn default_ping_interval() -> u64 {
    ServerConfig::default().ping_interval_secs
}

fn default_tick_interval() -> u64 {
    ServerConfig::default().tick_interval_ms
}

fn default_sweep_interval() -> u64 {
    ServerConfig::default().sweep_interval_secs
}

fn default_worker_pool_size() -> usize {
    ServerConfig::default().worker_pool_size
}

fn default_outbound_queue_capacity() -> usize {
    ServerConfig::default().outbound_queue_capacity
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_world_path() -> PathBuf {
    PathBuf::from("world.json")
}

fn default_save_on_shutdown() -> bool {
    true
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_connections: default_max_connections(),
            connection_timeout: default_connection_timeout(),
            ping_interval_secs: default_ping_interval(),
            tick_interval_ms: default_tick_interval(),
            sweep_interval_secs: default_sweep_interval(),
            worker_pool_size: default_worker_pool_size(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
            latin1_text: false,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            path: default_world_path(),
            save_on_shutdown: default_save_on_shutdown(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, a default configuration file is written at
    /// `path` and the defaults are returned.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            return Err(format!(
                "Invalid bind address: {}",
                &self.server.bind_address
            ));
        }

        if self.server.tick_interval_ms == 0 {
            return Err("server.tick_interval_ms must be greater than 0".to_string());
        }

        if self.server.worker_pool_size == 0 {
            return Err("server.worker_pool_size must be greater than 0".to_string());
        }

        if self.server.max_connections == 0 {
            return Err("server.max_connections must be greater than 0".to_string());
        }

        if self.server.outbound_queue_capacity == 0 {
            return Err("server.outbound_queue_capacity must be greater than 0".to_string());
        }

        if self.security.max_message_size < 5 {
            return Err("security.max_message_size cannot hold a frame header".to_string());
        }

        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {VALID_LEVELS:?}",
                &self.logging.level
            ));
        }

        if self.world.path.as_os_str().is_empty() {
            return Err("world.path cannot be empty".to_string());
        }

        Ok(())
    }

    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            max_connections: self.server.max_connections,
            connection_timeout: self.server.connection_timeout,
            ping_interval_secs: self.server.ping_interval_secs,
            tick_interval_ms: self.server.tick_interval_ms,
            sweep_interval_secs: self.server.sweep_interval_secs,
            worker_pool_size: self.server.worker_pool_size,
            outbound_queue_capacity: self.server.outbound_queue_capacity,
            latin1_text: self.server.latin1_text,
            rooms: self.rooms.clone(),
            security: self.security.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.server.bind_address, "127.0.0.1:30000");
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.server.tick_interval_ms, 500);
        assert!(config.server.worker_pool_size > 0);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert_eq!(config.world.path, PathBuf::from("world.json"));
        assert!(config.world.save_on_shutdown);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.server.bind_address = "invalid".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.worker_pool_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        let error = config.validate().unwrap_err();
        assert!(error.contains("loud"));
    }

    #[test]
    fn test_to_server_config() {
        let mut config = AppConfig::default();
        config.server.bind_address = "0.0.0.0:9999".to_string();
        config.server.latin1_text = true;
        config.rooms.reaction_radius = 4;
        config.security.max_connections_per_ip = 2;

        let server = config.to_server_config().unwrap();
        assert_eq!(server.bind_address.port(), 9999);
        assert!(server.latin1_text);
        assert_eq!(server.rooms.reaction_radius, 4);
        assert_eq!(server.security.max_connections_per_ip, 2);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            bind_address = "0.0.0.0:4000"
            tick_interval_ms = 250

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_address, "0.0.0.0:4000");
        assert_eq!(config.server.tick_interval_ms, 250);
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.world.path, PathBuf::from("world.json"));
        assert!(config.security.enable_rate_limiting);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let file = NamedTempFile::new().unwrap();
        tokio::fs::write(
            file.path(),
            "[world]\npath = \"rooms/world.json\"\nsave_on_shutdown = false\n",
        )
        .await
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).await.unwrap();
        assert_eq!(config.world.path, PathBuf::from("rooms/world.json"));
        assert!(!config.world.save_on_shutdown);
    }

    #[tokio::test]
    async fn test_missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert!(path.exists());
        assert!(config.validate().is_ok());

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.server.bind_address, config.server.bind_address);
        assert_eq!(reloaded.rooms.max_path_nodes, config.rooms.max_path_nodes);
    }

    #[tokio::test]
    async fn test_invalid_toml_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        tokio::fs::write(file.path(), "[server\nbind_address = ").await.unwrap();
        assert!(AppConfig::load_from_file(file.path()).await.is_err());
    }
}

//! Main application logic and lifecycle management.
//!
//! The `Application` ties the configuration, the world store and the game
//! server together and drives them from startup to the final world save.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{setup_signal_handlers, setup_signal_handlers_silent},
};
use game_server::{create_server_with_config, GameServer, ServerError};
use habitat_event_system::ShutdownState;
use room_engine::{MemoryStore, Repositories};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How long the server gets to close sessions and flush rooms.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
const STATS_INTERVAL: Duration = Duration::from_secs(60);

pub struct Application {
    /// Loaded configuration with CLI overrides applied
    config: AppConfig,
    /// Backing store for every repository
    store: Arc<MemoryStore>,
    server: Arc<GameServer>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Open the world file (writing the demo world if missing)
    /// 5. Build the game server and its room manager
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        apply_overrides(&mut config, args);

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let store = Arc::new(MemoryStore::open(&config.world.path).await?);
        let server_config = config.to_server_config()?;
        let server = create_server_with_config(server_config, Repositories::from_store(store.clone())).await?;

        Ok(Self {
            config,
            store,
            server: Arc::new(server),
        })
    }

    pub fn server(&self) -> Arc<GameServer> {
        self.server.clone()
    }

    /// Runs until SIGINT or SIGTERM. A second signal exits immediately.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        self.run_until(async {
            if let Err(e) = setup_signal_handlers().await {
                error!("Failed to listen for shutdown signals: {e}");
                return;
            }

            tokio::spawn(async move {
                if let Err(e) = setup_signal_handlers_silent().await {
                    error!("Failed to set up merciless shutdown signal handler: {e}");
                    return;
                }
                warn!("Shutdown handler received again! I'll make this quick.");
                std::process::exit(1);
            });
        })
        .await
    }

    /// Runs the server until `stop` completes or the server fails, then
    /// shuts down gracefully and saves the world.
    pub async fn run_until<F>(self, stop: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()>,
    {
        info!("🌟 Starting Habitat Server Application");
        self.log_configuration_summary();

        let shutdown_state = ShutdownState::new();
        let mut server_handle: JoinHandle<Result<(), ServerError>> = {
            let server = self.server.clone();
            let shutdown_state = shutdown_state.clone();
            tokio::spawn(async move { server.start_with_shutdown_state(shutdown_state).await })
        };
        let monitoring_handle = self.spawn_monitor();

        info!("✅ Habitat Server is now running!");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let early_exit = tokio::select! {
            _ = stop => None,
            finished = &mut server_handle => Some(finished),
        };
        monitoring_handle.abort();

        if let Some(finished) = early_exit {
            let result = finished.map_err(|e| format!("Server task failed: {e}"))?;
            result?;
            return Err("Server stopped without a shutdown request".into());
        }

        info!("🛑 Shutdown signal received, beginning graceful shutdown...");
        shutdown_state.initiate_shutdown();

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, server_handle).await {
            Ok(Ok(Ok(()))) => info!("✅ Server task completed gracefully"),
            Ok(Ok(Err(e))) => error!("❌ Server error during shutdown: {}", e),
            Ok(Err(e)) => error!("❌ Server task failed: {}", e),
            Err(_) => warn!("⏰ Server did not stop within {:?}, saving anyway", SHUTDOWN_TIMEOUT),
        }

        self.save_world().await;
        self.log_final_statistics().await;
        info!("✅ Habitat Server shutdown complete");
        Ok(())
    }

    async fn save_world(&self) {
        if !self.config.world.save_on_shutdown {
            return;
        }
        let path = &self.config.world.path;
        match self.store.write_to(path).await {
            Ok(()) => info!("💾 World saved to {}", path.display()),
            Err(e) => error!("❌ Failed to save world to {}: {}", path.display(), e),
        }
    }

    fn spawn_monitor(&self) -> JoinHandle<()> {
        let server = self.server.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(STATS_INTERVAL);
            interval.tick().await;
            let mut last_dispatched = 0u64;

            loop {
                interval.tick().await;
                let stats = server.dispatcher().get_stats().await;
                let packets = stats.dispatched - last_dispatched;
                last_dispatched = stats.dispatched;

                info!(
                    "📊 System Health - {} packets/min | {} sessions | {} users | {} rooms loaded",
                    packets,
                    server.connections().connection_count(),
                    server.connections().online_users(),
                    server.rooms().loaded_rooms()
                );
                if stats.failed > 0 {
                    warn!("⚠️ {} packet(s) failed since start", stats.failed);
                }
            }
        })
    }

    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  🌍 World file: {}", self.config.world.path.display());
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!("  🕒 Room tick: {}ms", self.config.server.tick_interval_ms);
        info!("  🧠 Worker pool: {}", self.config.server.worker_pool_size);
        info!("  ⏱️ Connection timeout: {}s", self.config.server.connection_timeout);
    }

    async fn log_final_statistics(&self) {
        let dispatch = self.server.dispatcher().get_stats().await;
        let events = self.server.get_event_system().get_stats().await;
        info!("📊 Final Statistics:");
        info!(
            "  - Packets: {} dispatched, {} handled, {} cancelled, {} unhandled, {} failed",
            dispatch.dispatched, dispatch.handled, dispatch.cancelled, dispatch.unhandled, dispatch.failed
        );
        info!("  - Lifecycle events emitted: {}", events.events_emitted);
        info!("  - Event handler failures: {}", events.handler_failures);
    }
}

fn apply_overrides(config: &mut AppConfig, args: CliArgs) {
    if let Some(bind_address) = args.bind_address {
        config.server.bind_address = bind_address;
    }
    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    if let Some(world) = args.world_path {
        config.world.path = world;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.server.tick_interval_ms = tick_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use room_engine::ItemId;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn args_in(dir: &std::path::Path) -> CliArgs {
        CliArgs {
            config_path: dir.join("config.toml"),
            bind_address: Some("127.0.0.1:0".to_string()),
            world_path: Some(dir.join("world.json")),
            tick_ms: Some(20),
            ..CliArgs::default()
        }
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            bind_address: Some("0.0.0.0:1".to_string()),
            log_level: Some("trace".to_string()),
            json_logs: true,
            world_path: Some(PathBuf::from("other.json")),
            tick_ms: Some(100),
            ..CliArgs::default()
        };
        apply_overrides(&mut config, args);

        assert_eq!(config.server.bind_address, "0.0.0.0:1");
        assert_eq!(config.logging.level, "trace");
        assert!(config.logging.json_format);
        assert_eq!(config.world.path, PathBuf::from("other.json"));
        assert_eq!(config.server.tick_interval_ms, 100);
    }

    #[tokio::test]
    async fn test_invalid_override_is_rejected() {
        let dir = tempdir().unwrap();
        let args = CliArgs {
            tick_ms: Some(0),
            ..args_in(dir.path())
        };
        assert!(Application::new(args).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_until_saves_the_world() {
        let dir = tempdir().unwrap();
        let args = args_in(dir.path());
        let world = dir.path().join("world.json");

        let app = Application::new(args).await.unwrap();
        assert!(dir.path().join("config.toml").exists());
        assert!(world.exists(), "demo world written on first start");

        let server = app.server();
        app.run_until(tokio::time::sleep(Duration::from_millis(200)))
            .await
            .unwrap();

        assert_eq!(server.connections().connection_count(), 0);
        let saved = MemoryStore::open(&world).await.unwrap().snapshot().await;
        assert!(saved.furniture.iter().any(|f| f.id == ItemId(104)));
    }
}

//! # Habitat Server - Main Entry Point
//!
//! Parses the command line, loads the configuration, installs logging and
//! runs the [`Application`] until a shutdown signal arrives.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration (writes config.toml and world.json)
//! habitat
//!
//! # Specify custom configuration
//! habitat --config production.toml
//!
//! # Override specific settings
//! habitat --bind 0.0.0.0:30000 --world data/world.json --tick-ms 250 --log-level debug
//!
//! # JSON logging for production
//! habitat --json-logs
//! ```
//!
//! ## Signal Handling
//!
//! SIGINT and SIGTERM start a graceful shutdown: the accept loop and the room
//! tick stop, sessions are closed, dirty furniture is flushed and the world
//! file is written. A second signal exits at once.

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signals;

pub use app::Application;
pub use cli::CliArgs;
pub use config::{AppConfig, LoggingSettings, ServerSettings, WorldSettings};

/// Runs the server binary.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging comes up before the application so config errors are visible.
    let mut logging = AppConfig::load_from_file(&args.config_path)
        .await
        .map(|config| config.logging)
        .unwrap_or_default();
    if let Some(level) = &args.log_level {
        logging.level = level.clone();
    }

    if let Err(e) = logging::setup_logging(&logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

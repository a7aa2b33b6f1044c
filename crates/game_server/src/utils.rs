//! Utility functions and helper methods for the game server.
//!
//! This module provides convenient factory functions that build the room
//! manager from a set of repositories and wrap it in a server.

use crate::{config::ServerConfig, error::ServerError, server::GameServer};
use habitat_event_system::create_habitat_event_system;
use room_engine::{Repositories, RoomManager};
use std::sync::Arc;

/// Creates a new game server with default configuration.
///
/// # Example
///
/// ```rust
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use game_server::create_server;
/// use room_engine::{MemoryStore, Repositories, WorldFixture};
/// use std::sync::Arc;
///
/// let store = Arc::new(MemoryStore::new(WorldFixture::demo()?));
/// let server = create_server(Repositories::from_store(store)).await?;
/// # Ok(())
/// # }
/// ```
pub async fn create_server(repositories: Repositories) -> Result<GameServer, ServerError> {
    create_server_with_config(ServerConfig::default(), repositories).await
}

/// Creates a new game server with custom configuration.
///
/// Loads the item catalog once and fails when the definitions repository
/// cannot provide it.
pub async fn create_server_with_config(
    config: ServerConfig,
    repositories: Repositories,
) -> Result<GameServer, ServerError> {
    let catalog = RoomManager::load_catalog(&repositories).await?;
    let events = create_habitat_event_system();
    let rooms = Arc::new(RoomManager::new(
        repositories,
        Arc::new(catalog),
        events.clone(),
        config.room_settings(),
    ));
    Ok(GameServer::new(config, rooms, events))
}

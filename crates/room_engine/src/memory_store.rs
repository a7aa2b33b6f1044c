//! In-memory implementation of every repository, seeded from a JSON world
//! file and optionally written back on shutdown.

use crate::catalog::ItemDefinition;
use crate::persistence::{
    BotDefinition, BotRepository, FurnitureData, FurnitureRepository, ItemDefinitionRepository,
    ItemId, RoomData, RoomModelData, RoomRepository, UserData, UserRepository,
};
use async_trait::async_trait;
use habitat_event_system::RoomId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// The bundled demo world, also written out when no world file exists.
pub const DEMO_WORLD_JSON: &str = include_str!("../data/demo_world.json");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldFixture {
    pub users: Vec<UserData>,
    pub models: Vec<RoomModelData>,
    pub rooms: Vec<RoomData>,
    pub definitions: Vec<ItemDefinition>,
    pub furniture: Vec<FurnitureData>,
    pub bots: Vec<BotDefinition>,
}

impl WorldFixture {
    pub fn demo() -> Result<Self, StoreError> {
        Ok(serde_json::from_str(DEMO_WORLD_JSON)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("World file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    world: RwLock<WorldFixture>,
}

impl MemoryStore {
    pub fn new(world: WorldFixture) -> Self {
        Self {
            world: RwLock::new(world),
        }
    }

    /// Loads a world file, creating it from the demo world when missing.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            info!("📄 World file {:?} not found, writing the demo world", path);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, DEMO_WORLD_JSON).await?;
        }
        let raw = tokio::fs::read_to_string(path).await?;
        let world: WorldFixture = serde_json::from_str(&raw)?;
        info!(
            "🌍 Loaded world: {} users, {} rooms, {} items, {} bots",
            world.users.len(),
            world.rooms.len(),
            world.furniture.len(),
            world.bots.len()
        );
        Ok(Self::new(world))
    }

    pub async fn write_to(&self, path: &Path) -> Result<(), StoreError> {
        let json = {
            let world = self.world.read().await;
            serde_json::to_string_pretty(&*world)?
        };
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn snapshot(&self) -> WorldFixture {
        self.world.read().await.clone()
    }
}

#[async_trait]
impl RoomRepository for MemoryStore {
    async fn room(&self, id: RoomId) -> Option<RoomData> {
        self.world.read().await.rooms.iter().find(|r| r.id == id).cloned()
    }

    async fn model(&self, name: &str) -> Option<RoomModelData> {
        self.world
            .read()
            .await
            .models
            .iter()
            .find(|m| m.name == name)
            .cloned()
    }
}

#[async_trait]
impl FurnitureRepository for MemoryStore {
    async fn room_furniture(&self, room: RoomId) -> Option<Vec<FurnitureData>> {
        let world = self.world.read().await;
        Some(
            world
                .furniture
                .iter()
                .filter(|item| item.room_id == Some(room))
                .cloned()
                .collect(),
        )
    }

    async fn furniture(&self, id: ItemId) -> Option<FurnitureData> {
        self.world
            .read()
            .await
            .furniture
            .iter()
            .find(|item| item.id == id)
            .cloned()
    }

    async fn save_furniture(&self, item: &FurnitureData) -> bool {
        let mut world = self.world.write().await;
        match world.furniture.iter_mut().find(|stored| stored.id == item.id) {
            Some(stored) => {
                *stored = item.clone();
                true
            }
            None => {
                warn!("⚠️ Tried to save unknown item {}", item.id);
                false
            }
        }
    }
}

#[async_trait]
impl ItemDefinitionRepository for MemoryStore {
    async fn definitions(&self) -> Option<Vec<ItemDefinition>> {
        Some(self.world.read().await.definitions.clone())
    }
}

#[async_trait]
impl BotRepository for MemoryStore {
    async fn room_bots(&self, room: RoomId) -> Option<Vec<BotDefinition>> {
        let world = self.world.read().await;
        Some(
            world
                .bots
                .iter()
                .filter(|bot| bot.room_id == room)
                .cloned()
                .collect(),
        )
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn by_credentials(&self, username: &str, password: &str) -> Option<UserData> {
        self.world
            .read()
            .await
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username) && u.password == password)
            .cloned()
    }

    async fn by_ticket(&self, ticket: &str) -> Option<UserData> {
        if ticket.is_empty() {
            return None;
        }
        self.world
            .read()
            .await
            .users
            .iter()
            .find(|u| u.sso_ticket.as_deref() == Some(ticket))
            .cloned()
    }
}

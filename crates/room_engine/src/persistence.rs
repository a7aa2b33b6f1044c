//! Storage collaborators.
//!
//! One small repository trait per entity. Failures come back as `None` or
//! `false`, never as errors, so a storage hiccup degrades the one operation
//! that hit it and nothing else.

use crate::bots::{BotBehavior, SpeechMode};
use crate::catalog::ItemDefinition;
use crate::geometry::Tile;
use async_trait::async_trait;
use habitat_event_system::{Identity, RoomId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Durable furniture id, stable across rooms and restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn default_max_users() -> usize {
    25
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomData {
    pub id: RoomId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner_id: UserId,
    pub model: String,
    #[serde(default = "default_max_users")]
    pub max_users: usize,
    /// Users besides the owner allowed to move furniture and flip switches.
    #[serde(default)]
    pub rights: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomModelData {
    pub name: String,
    pub heightmap: String,
    pub door_x: i32,
    pub door_y: i32,
    #[serde(default)]
    pub door_rotation: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureData {
    pub id: ItemId,
    /// `None` while the item sits in its owner's inventory.
    pub room_id: Option<RoomId>,
    pub owner_id: UserId,
    pub definition_id: u32,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub rotation: u8,
    #[serde(default)]
    pub extra_data: String,
    /// Paired teleport, possibly in another room.
    #[serde(default)]
    pub teleport_link: Option<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotResponse {
    pub keywords: Vec<String>,
    pub reply: String,
    #[serde(default)]
    pub mode: SpeechMode,
    /// Item the bot hands to whoever triggered the reply.
    #[serde(default)]
    pub serve_item: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotDefinition {
    pub id: u32,
    pub room_id: RoomId,
    pub name: String,
    #[serde(default)]
    pub figure: String,
    #[serde(default)]
    pub motto: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub rotation: u8,
    #[serde(default)]
    pub behavior: BotBehavior,
    /// Tiles the bot may wander to. Empty means anywhere near its spawn.
    #[serde(default)]
    pub walk_area: Vec<Tile>,
    /// Lines spoken unprompted when the speech timer fires.
    #[serde(default)]
    pub speeches: Vec<String>,
    #[serde(default)]
    pub responses: Vec<BotResponse>,
    #[serde(default)]
    pub greeting: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub id: UserId,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub sso_ticket: Option<String>,
    #[serde(default)]
    pub figure: String,
    #[serde(default)]
    pub motto: String,
    #[serde(default = "default_sex")]
    pub sex: String,
    #[serde(default = "default_rank")]
    pub rank: u8,
}

fn default_sex() -> String {
    "M".to_string()
}

fn default_rank() -> u8 {
    1
}

impl UserData {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            username: self.username.clone(),
            figure: self.figure.clone(),
            motto: self.motto.clone(),
            sex: self.sex.clone(),
            rank: self.rank,
        }
    }
}

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn room(&self, id: RoomId) -> Option<RoomData>;
    async fn model(&self, name: &str) -> Option<RoomModelData>;
}

#[async_trait]
pub trait FurnitureRepository: Send + Sync {
    async fn room_furniture(&self, room: RoomId) -> Option<Vec<FurnitureData>>;
    async fn furniture(&self, id: ItemId) -> Option<FurnitureData>;
    async fn save_furniture(&self, item: &FurnitureData) -> bool;
}

#[async_trait]
pub trait ItemDefinitionRepository: Send + Sync {
    async fn definitions(&self) -> Option<Vec<ItemDefinition>>;
}

#[async_trait]
pub trait BotRepository: Send + Sync {
    async fn room_bots(&self, room: RoomId) -> Option<Vec<BotDefinition>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn by_credentials(&self, username: &str, password: &str) -> Option<UserData>;
    async fn by_ticket(&self, ticket: &str) -> Option<UserData>;
}

/// Every repository the engine talks to, handed to constructors explicitly.
#[derive(Clone)]
pub struct Repositories {
    pub rooms: Arc<dyn RoomRepository>,
    pub furniture: Arc<dyn FurnitureRepository>,
    pub definitions: Arc<dyn ItemDefinitionRepository>,
    pub bots: Arc<dyn BotRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl fmt::Debug for Repositories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}

impl Repositories {
    /// Backs every repository with the same store.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: RoomRepository
            + FurnitureRepository
            + ItemDefinitionRepository
            + BotRepository
            + UserRepository
            + 'static,
    {
        Self {
            rooms: store.clone(),
            furniture: store.clone(),
            definitions: store.clone(),
            bots: store.clone(),
            users: store,
        }
    }
}

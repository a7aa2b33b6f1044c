//! # Room Engine
//!
//! Everything that happens inside a room: the tile grid and its stacked
//! furniture, avatar movement, furniture behaviors, bots, and the
//! [`RoomManager`] that loads, ticks and unloads rooms.
//!
//! ## Concurrency
//!
//! Each [`Room`] is one `tokio::sync::Mutex` around its [`RoomState`]. Packet
//! handlers and the periodic tick both enter through [`Room::lock`], so a
//! room is only ever mutated by one task at a time while different rooms
//! progress in parallel. Outbound frames are queued on sessions without
//! waiting, which keeps network back-pressure out of the critical section.
//!
//! ## Storage
//!
//! The engine talks to storage through the small repository traits in
//! [`persistence`]. [`MemoryStore`] implements all of them over a JSON world
//! file and is what the server binary ships with.

pub mod bots;
pub mod catalog;
pub mod composers;
pub mod error;
pub mod geometry;
pub mod interactors;
pub mod manager;
pub mod memory_store;
pub mod model;
pub mod pathfinding;
pub mod persistence;
pub mod room;
pub mod text_filter;

#[cfg(test)]
pub(crate) mod test_support;

pub use bots::{BotBehavior, SpeechMode};
pub use catalog::{InteractionType, ItemCatalog, ItemDefinition, ItemFlags};
pub use error::RoomError;
pub use geometry::Tile;
pub use interactors::{trigger, TriggerContext, REQUEST_DEACTIVATE};
pub use manager::RoomManager;
pub use memory_store::{MemoryStore, StoreError, WorldFixture};
pub use model::RoomModel;
pub use persistence::{
    BotDefinition, FurnitureData, ItemId, Repositories, RoomData, RoomModelData, UserData,
};
pub use room::{
    Room, RoomAvatar, RoomEvent, RoomFurniture, RoomSettings, RoomState, Spawn, TickOutput,
    VirtualId,
};
pub use text_filter::{InjectionFilter, TextFilter};

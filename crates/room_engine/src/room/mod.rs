//! Loaded rooms.
//!
//! A [`Room`] wraps its whole mutable state in one `tokio::sync::Mutex`.
//! Packet handlers and the room's own tick both go through [`Room::lock`],
//! so at most one of them touches avatars, furniture or bots at a time.
//! Nothing awaits network I/O while holding the lock: sends go through each
//! session's non-blocking queue.

mod avatar;
mod chat;
mod furniture;
mod mapping;
mod movement;
mod queries;
mod tick;

#[cfg(test)]
mod tests;

pub use avatar::{
    AvatarKind, RoomAvatar, StatusEntry, VirtualId, STATUS_CARRY, STATUS_DANCE, STATUS_LAY,
    STATUS_MOVE, STATUS_SIT, STATUS_WAVE,
};
pub use furniture::RoomFurniture;
pub use mapping::{TileInfo, TileMap, TileState};
pub use tick::{TeleportTransfer, TickOutput};

use crate::bots::{self, BotRuntime};
use crate::composers;
use crate::geometry::Tile;
use crate::interactors::interactor_for;
use crate::model::RoomModel;
use crate::persistence::{BotDefinition, ItemId, RoomData};
use habitat_event_system::{Identity, RoomId, SessionId, SessionRef, UserId};
use habitat_protocol::OutboundMessage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Ticks a wave stays visible.
pub const WAVE_TICKS: u64 = 4;
/// Ticks a carried drink stays in hand.
pub const CARRY_TICKS: u64 = 120;

/// Tunables shared by every room.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomSettings {
    /// Tiles within which bots react to users.
    pub reaction_radius: i32,
    /// Nodes A* may expand before settling for the closest tile.
    pub max_path_nodes: usize,
    /// How long a room with no users stays loaded.
    pub unload_grace: Duration,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            reaction_radius: 10,
            max_path_nodes: 2_000,
            unload_grace: Duration::from_secs(60),
        }
    }
}

/// Where a user appears when entering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spawn {
    Door,
    /// Arrival through the given teleport.
    Teleport(ItemId),
}

/// A user-hosted event running in the room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomEvent {
    pub name: String,
    pub description: String,
    pub host: UserId,
    pub started_at_tick: u64,
}

#[derive(Debug)]
pub struct Room {
    id: RoomId,
    state: Mutex<RoomState>,
    disposed: AtomicBool,
}

impl Room {
    pub fn new(state: RoomState) -> Self {
        Self {
            id: state.data.id,
            state: Mutex::new(state),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Enters the room's exclusion boundary.
    pub async fn lock(&self) -> MutexGuard<'_, RoomState> {
        self.state.lock().await
    }

    /// Set once the room has been unloaded; holders of a stale `Arc` must
    /// reload instead of entering it.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_disposed(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct RoomState {
    pub(crate) data: RoomData,
    pub(crate) model: Arc<RoomModel>,
    pub(crate) avatars: BTreeMap<VirtualId, RoomAvatar>,
    pub(crate) furniture: BTreeMap<ItemId, RoomFurniture>,
    pub(crate) bots: BTreeMap<VirtualId, BotRuntime>,
    pub(crate) map: TileMap,
    pub(crate) settings: RoomSettings,
    pub(crate) rng: StdRng,
    pub(crate) tick_count: u64,
    pub(crate) transfers: Vec<TeleportTransfer>,
    event: Option<RoomEvent>,
    next_virtual_id: VirtualId,
    dirty: BTreeSet<ItemId>,
    empty_since: Option<Instant>,
}

impl RoomState {
    pub fn new(
        data: RoomData,
        model: Arc<RoomModel>,
        furniture: Vec<RoomFurniture>,
        settings: RoomSettings,
    ) -> Self {
        let furniture: BTreeMap<ItemId, RoomFurniture> =
            furniture.into_iter().map(|item| (item.id, item)).collect();
        let map = TileMap::build(&model, &furniture);
        Self {
            data,
            model,
            avatars: BTreeMap::new(),
            furniture,
            bots: BTreeMap::new(),
            map,
            settings,
            rng: StdRng::from_entropy(),
            tick_count: 0,
            transfers: Vec::new(),
            event: None,
            next_virtual_id: 1,
            dirty: BTreeSet::new(),
            empty_since: Some(Instant::now()),
        }
    }

    pub fn id(&self) -> RoomId {
        self.data.id
    }

    pub fn data(&self) -> &RoomData {
        &self.data
    }

    pub fn model(&self) -> &RoomModel {
        &self.model
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn avatar(&self, id: VirtualId) -> Option<&RoomAvatar> {
        self.avatars.get(&id)
    }

    pub fn avatar_mut(&mut self, id: VirtualId) -> Option<&mut RoomAvatar> {
        self.avatars.get_mut(&id)
    }

    pub fn avatars(&self) -> impl Iterator<Item = &RoomAvatar> {
        self.avatars.values()
    }

    pub fn item(&self, id: ItemId) -> Option<&RoomFurniture> {
        self.furniture.get(&id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut RoomFurniture> {
        self.furniture.get_mut(&id)
    }

    pub fn furniture(&self) -> impl Iterator<Item = &RoomFurniture> {
        self.furniture.values()
    }

    pub fn user_count(&self) -> usize {
        self.avatars.values().filter(|a| !a.is_bot()).count()
    }

    pub fn bot_count(&self) -> usize {
        self.bots.len()
    }

    pub fn is_full(&self) -> bool {
        self.user_count() >= self.data.max_users
    }

    pub fn find_session(&self, session: SessionId) -> Option<VirtualId> {
        self.avatars
            .values()
            .find(|a| a.session().is_some_and(|s| s.id() == session))
            .map(|a| a.virtual_id)
    }

    /// Owner, listed rights holders and staff may move and switch things.
    pub fn has_rights(&self, identity: &Identity) -> bool {
        identity.is_staff()
            || self.data.owner_id == identity.user_id
            || self.data.rights.contains(&identity.user_id)
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.data.owner_id == user
    }

    /// Serializes once and queues the frame on every user's session.
    pub fn broadcast(&self, message: &OutboundMessage) {
        let frame = message.encode();
        for session in self.avatars.values().filter_map(RoomAvatar::session) {
            session.send_frame(frame.clone());
        }
    }

    pub fn broadcast_except(&self, skip: VirtualId, message: &OutboundMessage) {
        let frame = message.encode();
        for avatar in self.avatars.values().filter(|a| a.virtual_id != skip) {
            if let Some(session) = avatar.session() {
                session.send_frame(frame.clone());
            }
        }
    }

    pub fn send_to(&self, avatar: VirtualId, message: &OutboundMessage) -> bool {
        self.avatars
            .get(&avatar)
            .and_then(RoomAvatar::session)
            .is_some_and(|session| session.send(message))
    }

    pub fn mark_dirty(&mut self, item: ItemId) {
        self.dirty.insert(item);
    }

    pub(crate) fn take_dirty(&mut self) -> Vec<crate::persistence::FurnitureData> {
        let room = Some(self.data.id);
        std::mem::take(&mut self.dirty)
            .into_iter()
            .filter_map(|id| self.furniture.get(&id).map(|item| item.to_data(room)))
            .collect()
    }

    pub fn rebuild_map(&mut self) {
        self.map = TileMap::build(&self.model, &self.furniture);
    }

    /// Time since the last user left, `None` while users are present.
    pub fn empty_for(&self) -> Option<Duration> {
        self.empty_since.map(|since| since.elapsed())
    }

    fn allocate_virtual_id(&mut self) -> VirtualId {
        let id = self.next_virtual_id;
        self.next_virtual_id = self.next_virtual_id.wrapping_add(1).max(1);
        id
    }

    /// Adds a user's avatar and lets every bot react.
    pub fn add_user(&mut self, session: SessionRef, identity: &Identity, spawn: Spawn) -> VirtualId {
        let id = self.allocate_virtual_id();
        let mut avatar = RoomAvatar::new(
            id,
            AvatarKind::User {
                session,
                user_id: identity.user_id,
            },
            identity.username.clone(),
        );
        avatar.figure = identity.figure.clone();
        avatar.motto = identity.motto.clone();
        avatar.sex = identity.sex.clone();
        avatar.tile = self.model.door;
        avatar.z = self.map.stand_z(self.model.door);
        avatar.set_rotation(self.model.door_rotation);
        self.avatars.insert(id, avatar);
        self.empty_since = None;

        if let Spawn::Teleport(item) = spawn {
            crate::interactors::teleport::arrive(self, item, id);
        }

        let entering = self
            .avatars
            .get(&id)
            .map(|avatar| composers::users(std::iter::once(avatar)));
        if let Some(message) = entering {
            self.broadcast_except(id, &message);
        }
        let bot_ids: Vec<VirtualId> = self.bots.keys().copied().collect();
        for bot in bot_ids {
            bots::on_user_enter(self, bot, id);
        }
        debug!("🚪 {} entered room {} as #{}", identity.username, self.data.id, id);
        id
    }

    /// Spawns a bot at its configured tile.
    pub fn add_bot(&mut self, definition: BotDefinition) -> VirtualId {
        let id = self.allocate_virtual_id();
        let mut avatar = RoomAvatar::new(
            id,
            AvatarKind::Bot {
                bot_id: definition.id,
            },
            definition.name.clone(),
        );
        avatar.figure = definition.figure.clone();
        avatar.motto = definition.motto.clone();
        let spawn = Tile::new(definition.x, definition.y);
        avatar.tile = spawn;
        avatar.z = self.map.stand_z(spawn);
        avatar.set_rotation(definition.rotation);
        self.avatars.insert(id, avatar);
        self.bots
            .insert(id, BotRuntime::new(Arc::new(definition), &mut self.rng));
        bots::on_self_enter(self, id);
        id
    }

    /// Removes an avatar, releasing every claim it held.
    pub fn remove_avatar(&mut self, id: VirtualId) -> Option<RoomAvatar> {
        let was_bot = self.bots.contains_key(&id);
        if was_bot {
            bots::on_self_leave(self, id);
        }
        let avatar = self.avatars.remove(&id)?;
        self.bots.remove(&id);

        if let Some(item_id) = avatar.interacting_item {
            if let Some(item) = self.furniture.get_mut(&item_id) {
                if item.interacting == Some(id) {
                    item.interacting = None;
                }
            }
        }
        for item in self.furniture.values_mut() {
            if item.interacting == Some(id) {
                item.interacting = None;
            }
        }
        if let Some(user_id) = avatar.user_id() {
            if self.event.as_ref().is_some_and(|event| event.host == user_id) {
                self.event = None;
            }
        }

        self.broadcast(&composers::logout(id));

        if !was_bot {
            let bot_ids: Vec<VirtualId> = self.bots.keys().copied().collect();
            for bot in bot_ids {
                bots::on_user_leave(self, bot, id);
            }
            if self.user_count() == 0 {
                self.empty_since = Some(Instant::now());
            }
        }
        Some(avatar)
    }

    pub fn event(&self) -> Option<&RoomEvent> {
        self.event.as_ref()
    }

    /// Starts an event hosted by `host`. Only one event runs at a time.
    pub fn start_event(&mut self, host: UserId, name: &str, description: &str) -> bool {
        if self.event.is_some() {
            return false;
        }
        self.event = Some(RoomEvent {
            name: name.to_string(),
            description: description.to_string(),
            host,
            started_at_tick: self.tick_count,
        });
        true
    }

    pub fn end_event(&mut self) -> Option<RoomEvent> {
        self.event.take()
    }

    /// Runs an item's `on_place` hook after it lands in the room.
    pub fn place_item(&mut self, item: RoomFurniture) {
        let id = item.id;
        let kind = item.definition.interaction;
        self.furniture.insert(id, item);
        interactor_for(kind).on_place(self, id);
        self.rebuild_map();
        self.mark_dirty(id);
        if let Some(item) = self.furniture.get(&id) {
            self.broadcast(&composers::item_add(item));
        }
    }

    /// Runs `on_remove` and takes the item out of the room.
    pub fn remove_item(&mut self, id: ItemId) -> Option<RoomFurniture> {
        let kind = self.furniture.get(&id)?.definition.interaction;
        interactor_for(kind).on_remove(self, id);
        self.dirty.remove(&id);
        let item = self.furniture.remove(&id)?;
        self.rebuild_map();
        self.broadcast(&composers::item_remove(id));
        Some(item)
    }

    /// Moves or turns an item already in the room, re-running `on_place`.
    pub fn relocate_item(&mut self, id: ItemId, tile: Tile, rotation: u8) -> bool {
        let Some(definition) = self.furniture.get(&id).map(|item| item.definition.clone()) else {
            return false;
        };
        let Some(z) = self.placement_height(&definition, tile, rotation, Some(id)) else {
            return false;
        };
        let Some(item) = self.furniture.get_mut(&id) else {
            return false;
        };
        item.tile = tile;
        item.rotation = rotation % 8;
        item.z = z;
        let kind = item.definition.interaction;
        interactor_for(kind).on_place(self, id);
        self.rebuild_map();
        self.mark_dirty(id);
        if let Some(item) = self.furniture.get(&id) {
            self.broadcast(&composers::item_update(item));
        }
        true
    }
}

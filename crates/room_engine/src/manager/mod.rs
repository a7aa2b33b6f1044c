//! Owner of every loaded room.
//!
//! Rooms are loaded on first entry, ticked together by [`RoomManager::tick_all`]
//! and unloaded by [`RoomManager::sweep_idle`] once they have been empty for
//! the configured grace period. A load either produces a complete room or
//! an error; nothing half-built is ever published.


use crate::catalog::ItemCatalog;
use crate::composers;
use crate::error::RoomError;
use crate::interactors::interactor_for;
use crate::model::RoomModel;
use crate::persistence::{FurnitureData, Repositories};
use crate::room::{
    Room, RoomFurniture, RoomSettings, RoomState, Spawn, TeleportTransfer, VirtualId,
};
use crate::text_filter::{InjectionFilter, TextFilter};
use dashmap::DashMap;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use habitat_event_system::{
    current_timestamp, EventSystem, RoomId, RoomLoadedEvent, RoomUnloadedEvent, Session,
    SessionRef, UserEnteredRoomEvent, UserLeftRoomEvent,
};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub struct RoomManager {
    rooms: DashMap<RoomId, Arc<Room>>,
    /// One gate per room id so concurrent first entries load it once.
    loading: DashMap<RoomId, Arc<Mutex<()>>>,
    repositories: Repositories,
    catalog: Arc<ItemCatalog>,
    events: Arc<EventSystem>,
    settings: RoomSettings,
    filter: Arc<dyn TextFilter>,
}

impl std::fmt::Debug for RoomManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomManager")
            .field("loaded_rooms", &self.rooms.len())
            .field("settings", &self.settings)
            .finish()
    }
}

impl RoomManager {
    pub fn new(
        repositories: Repositories,
        catalog: Arc<ItemCatalog>,
        events: Arc<EventSystem>,
        settings: RoomSettings,
    ) -> Self {
        Self {
            rooms: DashMap::new(),
            loading: DashMap::new(),
            repositories,
            catalog,
            events,
            settings,
            filter: Arc::new(InjectionFilter),
        }
    }

    pub fn with_text_filter(mut self, filter: Arc<dyn TextFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Reads every item definition from storage.
    pub async fn load_catalog(repositories: &Repositories) -> Result<ItemCatalog, RoomError> {
        let definitions = repositories
            .definitions
            .definitions()
            .await
            .ok_or(RoomError::CatalogUnavailable)?;
        info!("📚 Loaded {} item definitions", definitions.len());
        Ok(ItemCatalog::new(definitions))
    }

    /// Swaps in a freshly read catalog. Rooms already loaded keep the
    /// definitions they resolved.
    pub async fn reload_catalog(&self) -> bool {
        match self.repositories.definitions.definitions().await {
            Some(definitions) => {
                self.catalog.replace(definitions);
                true
            }
            None => {
                warn!("⚠️ Item catalog reload failed, keeping the current one");
                false
            }
        }
    }

    pub fn catalog(&self) -> &Arc<ItemCatalog> {
        &self.catalog
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repositories
    }

    pub fn settings(&self) -> RoomSettings {
        self.settings
    }

    pub fn text_filter(&self) -> &dyn TextFilter {
        self.filter.as_ref()
    }

    pub fn get(&self, id: RoomId) -> Option<Arc<Room>> {
        self.rooms
            .get(&id)
            .map(|entry| entry.value().clone())
            .filter(|room| !room.is_disposed())
    }

    pub fn loaded_rooms(&self) -> usize {
        self.rooms.len()
    }

    /// The room the session is standing in.
    pub fn room_of(&self, session: &Session) -> Option<Arc<Room>> {
        session.current_room().and_then(|id| self.get(id))
    }

    /// Returns the loaded room or loads it from storage.
    pub async fn load_room(&self, id: RoomId) -> Result<Arc<Room>, RoomError> {
        if let Some(room) = self.get(id) {
            return Ok(room);
        }

        let gate = self
            .loading
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _loading = gate.lock().await;
        if let Some(room) = self.get(id) {
            return Ok(room);
        }

        let state = match self.build_room(id).await {
            Ok(state) => state,
            Err(e) => {
                self.loading.remove(&id);
                return Err(e);
            }
        };

        let furniture_count = state.furniture.len();
        let bot_count = state.bot_count();
        let room = Arc::new(Room::new(state));
        // Published before the gate goes away so a late caller never builds
        // a second copy.
        self.rooms.insert(id, room.clone());
        self.loading.remove(&id);
        info!(
            "🏠 Loaded room {} ({} items, {} bots)",
            id, furniture_count, bot_count
        );

        let event = RoomLoadedEvent {
            room_id: id,
            furniture_count,
            bot_count,
            timestamp: current_timestamp(),
        };
        if let Err(e) = self.events.emit_core("room_loaded", &event).await {
            warn!("⚠️ Failed to emit room_loaded for {}: {}", id, e);
        }
        Ok(room)
    }

    async fn build_room(&self, id: RoomId) -> Result<RoomState, RoomError> {
        let data = self
            .repositories
            .rooms
            .room(id)
            .await
            .ok_or(RoomError::NotFound(id))?;
        let model_data = self
            .repositories
            .rooms
            .model(&data.model)
            .await
            .ok_or_else(|| RoomError::ModelNotFound(data.model.clone()))?;
        let model = Arc::new(RoomModel::parse(&model_data)?);
        let stored = self
            .repositories
            .furniture
            .room_furniture(id)
            .await
            .ok_or(RoomError::FurnitureUnavailable(id))?;
        let bots = self
            .repositories
            .bots
            .room_bots(id)
            .await
            .ok_or(RoomError::BotsUnavailable(id))?;

        let furniture = stored
            .iter()
            .filter_map(|data| {
                let Some(definition) = self.catalog.get(data.definition_id) else {
                    warn!(
                        "⚠️ Item {} in room {} has unknown definition {}, skipped",
                        data.id, id, data.definition_id
                    );
                    return None;
                };
                let mut item = RoomFurniture::from_data(data, definition);
                item.extra_data =
                    interactor_for(item.definition.interaction).normalize_extra_data(&item);
                Some(item)
            })
            .collect();

        let mut state = RoomState::new(data, model, furniture, self.settings);
        for bot in bots {
            state.add_bot(bot);
        }
        Ok(state)
    }

    /// Enters through the door.
    pub async fn enter_room(&self, session: &SessionRef, id: RoomId) -> Result<VirtualId, RoomError> {
        self.enter_room_via(session, id, Spawn::Door).await
    }

    /// Moves the session into room `id`, leaving its current room first.
    /// On error the session ends up in no room.
    pub async fn enter_room_via(
        &self,
        session: &SessionRef,
        id: RoomId,
        spawn: Spawn,
    ) -> Result<VirtualId, RoomError> {
        let identity = session.identity().ok_or(RoomError::NotAuthenticated)?;
        if session.current_room().is_some() {
            self.leave_room(session).await;
        }

        // A sweep can dispose the room between loading and locking it; one
        // reload covers that race.
        for _ in 0..2 {
            let room = self.load_room(id).await?;
            let mut state = room.lock().await;
            if room.is_disposed() {
                continue;
            }
            // Teardown may have run while this task waited for the room.
            if session.is_dead() {
                return Err(RoomError::SessionClosed);
            }
            let privileged = identity.is_staff() || state.is_owner(identity.user_id);
            if state.is_full() && !privileged {
                return Err(RoomError::Full(id));
            }

            session.send(&composers::flat_letin());
            session.send(&composers::room_ready(&state.model().name, id));
            session.send(&composers::heightmap(state.model()));
            session.send(&composers::active_objects(state.furniture()));

            let virtual_id = state.add_user(session.clone(), &identity, spawn);
            session.send(&composers::users(state.avatars()));
            session.send(&composers::status(state.avatars()));
            session.set_current_room(Some(id));
            drop(state);

            // A teardown that marked the session dead before the room was
            // published may have found no room to leave.
            if session.is_dead() {
                self.leave_room(session).await;
                return Err(RoomError::SessionClosed);
            }

            let event = UserEnteredRoomEvent {
                room_id: id,
                user_id: identity.user_id,
                virtual_id,
                timestamp: current_timestamp(),
            };
            if let Err(e) = self.events.emit_core("user_entered_room", &event).await {
                warn!("⚠️ Failed to emit user_entered_room: {}", e);
            }
            return Ok(virtual_id);
        }
        Err(RoomError::Disposed(id))
    }

    /// Takes the session's avatar out of its room, releasing whatever it
    /// held. Returns whether an avatar was removed.
    pub async fn leave_room(&self, session: &SessionRef) -> bool {
        let Some(id) = session.current_room() else {
            return false;
        };
        session.set_current_room(None);
        let Some(room) = self.get(id) else {
            return false;
        };

        let removed = {
            let mut state = room.lock().await;
            state
                .find_session(session.id())
                .and_then(|virtual_id| state.remove_avatar(virtual_id))
        };
        let Some(avatar) = removed else {
            return false;
        };
        debug!("🚶 {} left room {}", avatar.name, id);

        if let Some(user_id) = avatar.user_id() {
            let event = UserLeftRoomEvent {
                room_id: id,
                user_id,
                timestamp: current_timestamp(),
            };
            if let Err(e) = self.events.emit_core("user_left_room", &event).await {
                warn!("⚠️ Failed to emit user_left_room: {}", e);
            }
        }
        true
    }

    /// Ticks every loaded room once. A room whose tick panics is logged and
    /// skipped; the others are unaffected. Returns the number of rooms that
    /// ticked cleanly.
    pub async fn tick_all(&self) -> usize {
        let rooms: Vec<Arc<Room>> = self.rooms.iter().map(|entry| entry.value().clone()).collect();

        let mut ticks = FuturesUnordered::new();
        for room in rooms {
            ticks.push(async move {
                let id = room.id();
                let result = AssertUnwindSafe(async {
                    let mut state = room.lock().await;
                    state.tick()
                })
                .catch_unwind()
                .await;
                (id, result)
            });
        }

        let mut outputs = Vec::new();
        while let Some((id, result)) = ticks.next().await {
            match result {
                Ok(output) => outputs.push(output),
                Err(_) => error!("💥 Tick for room {} panicked, skipped", id),
            }
        }

        let ticked = outputs.len();
        for output in outputs {
            self.persist(output.dirty).await;
            for transfer in output.transfers {
                self.process_transfer(transfer).await;
            }
        }
        ticked
    }

    async fn process_transfer(&self, transfer: TeleportTransfer) {
        let TeleportTransfer {
            session,
            user_id,
            from_room,
            target_item,
        } = transfer;
        if session.is_dead() || session.current_room() != Some(from_room) {
            return;
        }
        let target_room = self
            .repositories
            .furniture
            .furniture(target_item)
            .await
            .and_then(|item| item.room_id);
        let Some(target_room) = target_room else {
            warn!("⚠️ Teleport target {} for user {} is not in a room", target_item, user_id);
            return;
        };

        debug!("🌀 User {} teleporting {} -> {}", user_id, from_room, target_room);
        if let Err(e) = self
            .enter_room_via(&session, target_room, Spawn::Teleport(target_item))
            .await
        {
            warn!("⚠️ Teleport of user {} into room {} failed: {}", user_id, target_room, e);
            session.send(&composers::cant_connect(e.client_code()));
        }
    }

    async fn persist(&self, items: Vec<FurnitureData>) {
        for item in items {
            if !self.repositories.furniture.save_furniture(&item).await {
                warn!("⚠️ Failed to save item {}", item.id);
            }
        }
    }

    /// Unloads rooms that have had no users for the grace period. Returns
    /// how many were unloaded.
    pub async fn sweep_idle(&self) -> usize {
        let rooms: Vec<Arc<Room>> = self.rooms.iter().map(|entry| entry.value().clone()).collect();
        let mut unloaded = 0;

        for room in rooms {
            let dirty = {
                let mut state = room.lock().await;
                match state.empty_for() {
                    Some(idle) if idle >= self.settings.unload_grace => {}
                    _ => continue,
                }
                room.mark_disposed();
                let bots: Vec<VirtualId> = state.bots.keys().copied().collect();
                for bot in bots {
                    state.remove_avatar(bot);
                }
                state.take_dirty()
            };

            let id = room.id();
            self.rooms
                .remove_if(&id, |_, current| Arc::ptr_eq(current, &room));
            self.persist(dirty).await;
            unloaded += 1;
            info!("🧹 Unloaded idle room {}", id);

            let event = RoomUnloadedEvent {
                room_id: id,
                timestamp: current_timestamp(),
            };
            if let Err(e) = self.events.emit_core("room_unloaded", &event).await {
                warn!("⚠️ Failed to emit room_unloaded for {}: {}", id, e);
            }
        }
        unloaded
    }

    /// Saves every pending furniture change.
    pub async fn flush_all(&self) {
        let rooms: Vec<Arc<Room>> = self.rooms.iter().map(|entry| entry.value().clone()).collect();
        for room in rooms {
            let dirty = room.lock().await.take_dirty();
            self.persist(dirty).await;
        }
    }
}

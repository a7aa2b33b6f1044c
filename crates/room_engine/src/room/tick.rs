use super::avatar::VirtualId;
use super::RoomState;
use crate::bots;
use crate::composers;
use crate::interactors::interactor_for;
use crate::persistence::{FurnitureData, ItemId};
use habitat_event_system::{RoomId, SessionRef, UserId};

/// A user leaving through a teleport whose partner is in another room.
#[derive(Debug, Clone)]
pub struct TeleportTransfer {
    pub session: SessionRef,
    pub user_id: UserId,
    pub from_room: RoomId,
    pub target_item: ItemId,
}

/// Work a tick leaves for after the room lock is released.
#[derive(Debug, Default)]
pub struct TickOutput {
    pub dirty: Vec<FurnitureData>,
    pub transfers: Vec<TeleportTransfer>,
}

impl TickOutput {
    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty() && self.transfers.is_empty()
    }
}

impl RoomState {
    /// One simulation step: movement, furniture, bots, status expiry, then
    /// a single `STATUS` broadcast for every avatar that changed.
    pub fn tick(&mut self) -> TickOutput {
        self.tick_count += 1;

        self.process_movement();
        self.tick_furniture();
        self.tick_bots();
        self.expire_statuses();
        self.broadcast_status();

        TickOutput {
            dirty: self.take_dirty(),
            transfers: std::mem::take(&mut self.transfers),
        }
    }

    fn tick_furniture(&mut self) {
        let mut due = Vec::new();
        for item in self.furniture.values_mut() {
            match item.countdown {
                Some(0) | Some(1) => {
                    item.countdown = None;
                    due.push((item.id, item.definition.interaction));
                }
                Some(remaining) => item.countdown = Some(remaining - 1),
                None => {}
            }
        }
        for (id, kind) in due {
            interactor_for(kind).on_tick(self, id);
        }
    }

    fn tick_bots(&mut self) {
        let ids: Vec<VirtualId> = self.bots.keys().copied().collect();
        for id in ids {
            bots::on_timer_tick(self, id);
        }
    }

    fn expire_statuses(&mut self) {
        let now = self.tick_count;
        for avatar in self.avatars.values_mut() {
            let before = avatar.statuses.len();
            avatar
                .statuses
                .retain(|_, status| status.expires_at.map_or(true, |at| at > now));
            if avatar.statuses.len() != before {
                avatar.needs_update = true;
            }
        }
    }

    fn broadcast_status(&mut self) {
        let changed: Vec<VirtualId> = self
            .avatars
            .values_mut()
            .filter_map(|avatar| std::mem::take(&mut avatar.needs_update).then_some(avatar.virtual_id))
            .collect();
        if changed.is_empty() {
            return;
        }
        let message = composers::status(changed.iter().filter_map(|id| self.avatars.get(id)));
        self.broadcast(&message);
    }
}

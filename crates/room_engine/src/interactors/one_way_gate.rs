//! One-way gates let an avatar pass from the tile they face to the tile
//! behind them, one avatar at a time. Extra data is `1` while in use.

use super::{claim, release_claim, set_extra_data, Interactor, TriggerContext};
use crate::persistence::ItemId;
use crate::room::{RoomFurniture, RoomState};

const PASS_TICKS: u32 = 2;

#[derive(Debug)]
pub struct OneWayGate;

impl Interactor for OneWayGate {
    fn on_place(&self, room: &mut RoomState, item: ItemId) {
        release_claim(room, item);
        if let Some(furniture) = room.item_mut(item) {
            furniture.countdown = None;
            furniture.extra_data = "0".to_string();
        }
    }

    fn on_trigger(&self, room: &mut RoomState, item: ItemId, ctx: TriggerContext) -> bool {
        let Some(furniture) = room.item(item) else {
            return false;
        };
        let (tile, entry) = (furniture.tile, furniture.front_tile());
        let exit_rotation = crate::geometry::opposite(furniture.rotation);
        if furniture.interacting.is_some() {
            return false;
        }
        if room.avatar(ctx.avatar).map(|avatar| avatar.tile) != Some(entry) {
            return false;
        }
        if room.has_occupants(tile) || !claim(room, item, ctx.avatar) {
            return false;
        }

        room.force_move(ctx.avatar, tile, Some(exit_rotation));
        if let Some(furniture) = room.item_mut(item) {
            furniture.countdown = Some(PASS_TICKS);
        }
        set_extra_data(room, item, "1", false);
        true
    }

    fn on_tick(&self, room: &mut RoomState, item: ItemId) {
        let Some(furniture) = room.item(item) else {
            return;
        };
        let (exit, entry) = (furniture.behind_tile(), furniture.front_tile());
        let rotation = crate::geometry::opposite(furniture.rotation);
        let holder = furniture.interacting;

        if let Some(holder) = holder {
            if room.can_enter(exit, Some(holder)) {
                room.force_move(holder, exit, Some(rotation));
            } else if room.can_enter(entry, Some(holder)) {
                // blocked on the far side: back out
                room.force_move(holder, entry, Some(furniture_rotation(room, item)));
            }
        }
        set_extra_data(room, item, "0", false);
        release_claim(room, item);
    }

    fn normalize_extra_data(&self, _item: &RoomFurniture) -> String {
        "0".to_string()
    }
}

fn furniture_rotation(room: &RoomState, item: ItemId) -> u8 {
    room.item(item).map_or(0, |item| item.rotation)
}

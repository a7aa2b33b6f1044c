//! Fridges and drink machines: serve one avatar at a time.

use super::{claim, is_within_reach, release_claim, set_extra_data, Interactor, TriggerContext};
use crate::geometry::rotation_towards;
use crate::persistence::ItemId;
use crate::room::{RoomFurniture, RoomState, CARRY_TICKS, STATUS_CARRY};
use rand::seq::SliceRandom;

const SERVE_TICKS: u32 = 2;

#[derive(Debug)]
pub struct Vendor;

impl Interactor for Vendor {
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
        if furniture.definition.vend_items.is_empty() || furniture.interacting.is_some() {
            return false;
        }
        let tile = furniture.tile;
        if !is_within_reach(room, item, ctx.avatar) || !claim(room, item, ctx.avatar) {
            return false;
        }

        if let Some(avatar) = room.avatar_mut(ctx.avatar) {
            let facing = rotation_towards(avatar.tile, tile);
            avatar.set_rotation(facing);
        }
        if let Some(furniture) = room.item_mut(item) {
            furniture.countdown = Some(SERVE_TICKS);
        }
        set_extra_data(room, item, "1", false);
        true
    }

    fn on_tick(&self, room: &mut RoomState, item: ItemId) {
        let Some(furniture) = room.item(item) else {
            return;
        };
        let holder = furniture.interacting;
        let definition = furniture.definition.clone();
        let drink = definition.vend_items.choose(&mut room.rng).cloned();

        if let (Some(holder), Some(drink)) = (holder, drink) {
            let expires = room.tick_count + CARRY_TICKS;
            if let Some(avatar) = room.avatar_mut(holder) {
                avatar.set_status(STATUS_CARRY, drink, Some(expires));
            }
        }
        set_extra_data(room, item, "0", false);
        release_claim(room, item);
    }

    fn normalize_extra_data(&self, _item: &RoomFurniture) -> String {
        "0".to_string()
    }
}

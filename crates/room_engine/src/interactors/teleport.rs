//! Linked teleport pairs.
//!
//! Extra data walks through `0` (idle), `1` (someone is leaving through it)
//! and `2` (someone is arriving through it). The leaving avatar is claimed
//! and locked for the whole trip; the claim moves to the partner teleport on
//! arrival and is released when the avatar steps out.

use super::{claim, is_within_reach, release_claim, set_extra_data, Interactor, TriggerContext};
use crate::persistence::ItemId;
use crate::room::{RoomFurniture, RoomState, TeleportTransfer, VirtualId};
use tracing::debug;

const IDLE: &str = "0";
const DEPARTING: &str = "1";
const ARRIVING: &str = "2";
const PHASE_TICKS: u32 = 2;

#[derive(Debug)]
pub struct Teleport;

/// Puts `avatar` inside `item` as if it had just arrived through it.
pub(crate) fn arrive(room: &mut RoomState, item: ItemId, avatar: VirtualId) -> bool {
    let Some((tile, rotation)) = room.item(item).map(|item| (item.tile, item.rotation)) else {
        return false;
    };
    if room.occupied_by_other(tile, Some(avatar)) || !claim(room, item, avatar) {
        return false;
    }
    room.force_move(avatar, tile, Some(rotation));
    if let Some(furniture) = room.item_mut(item) {
        furniture.countdown = Some(PHASE_TICKS);
    }
    set_extra_data(room, item, ARRIVING, false);
    true
}

fn step_out(room: &mut RoomState, item: ItemId) {
    set_extra_data(room, item, IDLE, false);
    let front = room.item(item).map(RoomFurniture::front_tile);
    if let (Some(holder), Some(front)) = (release_claim(room, item), front) {
        room.walk_to(holder, front);
    }
}

impl Interactor for Teleport {
    fn on_place(&self, room: &mut RoomState, item: ItemId) {
        release_claim(room, item);
        if let Some(furniture) = room.item_mut(item) {
            furniture.countdown = None;
            furniture.extra_data = IDLE.to_string();
        }
    }

    fn on_trigger(&self, room: &mut RoomState, item: ItemId, ctx: TriggerContext) -> bool {
        let Some(furniture) = room.item(item) else {
            return false;
        };
        if furniture.teleport_link.is_none()
            || furniture.interacting.is_some()
            || furniture.extra_data != IDLE
        {
            return false;
        }
        let (tile, rotation) = (furniture.tile, furniture.rotation);
        if !is_within_reach(room, item, ctx.avatar) || room.occupied_by_other(tile, Some(ctx.avatar)) {
            return false;
        }
        if !claim(room, item, ctx.avatar) {
            return false;
        }

        room.force_move(ctx.avatar, tile, Some(rotation));
        if let Some(furniture) = room.item_mut(item) {
            furniture.countdown = Some(PHASE_TICKS);
        }
        set_extra_data(room, item, DEPARTING, false);
        true
    }

    fn on_tick(&self, room: &mut RoomState, item: ItemId) {
        let Some(furniture) = room.item(item) else {
            return;
        };
        let phase = furniture.extra_data.clone();
        let holder = furniture.interacting;
        let link = furniture.teleport_link;

        let Some(holder) = holder else {
            // the traveller left mid-trip
            set_extra_data(room, item, IDLE, false);
            return;
        };

        if phase != DEPARTING {
            step_out(room, item);
            return;
        }

        let local_target = link.and_then(|link| {
            room.item(link).map(|target| {
                let free = target.interacting.is_none() && !room.occupied_by_other(target.tile, Some(holder));
                (link, free)
            })
        });
        match (link, local_target) {
            (_, Some((target, true))) => {
                set_extra_data(room, item, IDLE, false);
                release_claim(room, item);
                if !arrive(room, target, holder) {
                    step_out(room, item);
                }
            }
            (_, Some((_, false))) => {
                debug!("🌀 Teleport {} partner busy or occupied, sending #{} back", item, holder);
                step_out(room, item);
            }
            (Some(target), None) => {
                let session = room
                    .avatar(holder)
                    .and_then(|avatar| avatar.session().cloned().zip(avatar.user_id()));
                match session {
                    Some((session, user_id)) => {
                        let from_room = room.id();
                        room.transfers.push(TeleportTransfer {
                            session,
                            user_id,
                            from_room,
                            target_item: target,
                        });
                        set_extra_data(room, item, IDLE, false);
                        release_claim(room, item);
                    }
                    None => step_out(room, item),
                }
            }
            (None, None) => step_out(room, item),
        }
    }

    fn normalize_extra_data(&self, _item: &RoomFurniture) -> String {
        IDLE.to_string()
    }
}

//! Furniture behaviors.
//!
//! An [`Interactor`] is a stateless strategy selected by an item's
//! [`InteractionType`]. Everything that changes lives on the item itself:
//! its extra data string, its claim on an avatar and its tick countdown.
//! One static instance per type therefore serves every item of that type.
//!
//! All hooks run while the room lock is held.

mod one_way_gate;
mod randomizer;
mod switch;
pub(crate) mod teleport;
mod vendor;

#[cfg(test)]
mod tests;

use crate::catalog::InteractionType;
use crate::composers;
use crate::persistence::ItemId;
use crate::room::{RoomFurniture, RoomState, VirtualId};

/// Request value asking a randomizer to switch off instead of roll.
pub const REQUEST_DEACTIVATE: i32 = -1;

/// Who triggered an item and with what.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerContext {
    pub avatar: VirtualId,
    /// Client supplied request value, meaning depends on the type.
    pub request: i32,
    pub has_rights: bool,
}

pub trait Interactor: Send + Sync {
    /// Called once when the item lands in the room, and again when moved.
    fn on_place(&self, room: &mut RoomState, item: ItemId) {
        release_claim(room, item);
    }

    /// Called once before the item leaves the room.
    fn on_remove(&self, room: &mut RoomState, item: ItemId) {
        release_claim(room, item);
    }

    /// Called per interaction. Returns whether anything changed; a failed
    /// precondition is a silent no-op.
    fn on_trigger(&self, room: &mut RoomState, item: ItemId, ctx: TriggerContext) -> bool;

    /// Called when the item's countdown runs out.
    fn on_tick(&self, _room: &mut RoomState, _item: ItemId) {}

    /// Whether avatars may walk over the item in its current state.
    fn is_walkable(&self, item: &RoomFurniture) -> bool {
        item.definition.flags.can_stand_on
    }

    /// Extra data as loaded from storage, coerced into the type's grammar.
    fn normalize_extra_data(&self, item: &RoomFurniture) -> String {
        item.extra_data.clone()
    }
}

/// Plain furniture: no trigger behavior.
#[derive(Debug)]
pub struct DefaultInteractor;

impl Interactor for DefaultInteractor {
    fn on_trigger(&self, _room: &mut RoomState, _item: ItemId, _ctx: TriggerContext) -> bool {
        false
    }
}

static DEFAULT: DefaultInteractor = DefaultInteractor;
static DICE: randomizer::Randomizer = randomizer::Randomizer::DICE;
static BOTTLE: randomizer::Randomizer = randomizer::Randomizer::BOTTLE;
static WHEEL: randomizer::Randomizer = randomizer::Randomizer::WHEEL;
static SWITCH: switch::Switch = switch::Switch { gate: false };
static GATE: switch::Switch = switch::Switch { gate: true };
static TELEPORT: teleport::Teleport = teleport::Teleport;
static ONE_WAY_GATE: one_way_gate::OneWayGate = one_way_gate::OneWayGate;
static VENDOR: vendor::Vendor = vendor::Vendor;

pub fn interactor_for(kind: InteractionType) -> &'static dyn Interactor {
    match kind {
        InteractionType::Default => &DEFAULT,
        InteractionType::Dice => &DICE,
        InteractionType::Bottle => &BOTTLE,
        InteractionType::Wheel => &WHEEL,
        InteractionType::Switch => &SWITCH,
        InteractionType::Gate => &GATE,
        InteractionType::Teleport => &TELEPORT,
        InteractionType::OneWayGate => &ONE_WAY_GATE,
        InteractionType::Vendor => &VENDOR,
    }
}

/// Triggers `item` on behalf of `ctx.avatar` through its type's interactor.
pub fn trigger(room: &mut RoomState, item: ItemId, ctx: TriggerContext) -> bool {
    let Some(kind) = room.item(item).map(|item| item.definition.interaction) else {
        return false;
    };
    if room.avatar(ctx.avatar).is_none() {
        return false;
    }
    interactor_for(kind).on_trigger(room, item, ctx)
}

/// Gives `avatar` exclusive use of `item` and holds it in place. Fails when
/// either side is already taken.
pub fn claim(room: &mut RoomState, item: ItemId, avatar: VirtualId) -> bool {
    let item_free = room.item(item).is_some_and(|item| item.interacting.is_none());
    let avatar_free = room
        .avatar(avatar)
        .is_some_and(|avatar| avatar.interacting_item.is_none());
    if !item_free || !avatar_free {
        return false;
    }
    if let Some(item) = room.item_mut(item) {
        item.interacting = Some(avatar);
    }
    if let Some(holder) = room.avatar_mut(avatar) {
        holder.interacting_item = Some(item);
        holder.can_walk = false;
        holder.stop_walking();
    }
    true
}

/// Drops the item's claim and lets the held avatar walk again.
pub fn release_claim(room: &mut RoomState, item: ItemId) -> Option<VirtualId> {
    let holder = room.item_mut(item).and_then(|item| item.interacting.take())?;
    if let Some(avatar) = room.avatar_mut(holder) {
        if avatar.interacting_item == Some(item) {
            avatar.interacting_item = None;
        }
        avatar.can_walk = true;
    }
    Some(holder)
}

/// Sets an item's extra data, broadcasts it and queues it for saving.
pub(crate) fn set_extra_data(room: &mut RoomState, item: ItemId, value: &str, persist: bool) {
    let Some(furniture) = room.item_mut(item) else {
        return;
    };
    furniture.extra_data = value.to_string();
    let message = composers::stuff_data(furniture);
    room.broadcast(&message);
    if persist {
        room.mark_dirty(item);
    }
}

/// Whether the avatar stands next to (or on) the item.
pub(crate) fn is_within_reach(room: &RoomState, item: ItemId, avatar: VirtualId) -> bool {
    match (room.item(item), room.avatar(avatar)) {
        (Some(item), Some(avatar)) => item.touches(avatar.tile),
        _ => false,
    }
}

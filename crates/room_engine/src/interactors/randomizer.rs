//! Dice, bottles and wheels: rest, spin for a few ticks, land on a value.
//!
//! Extra data is the last result, or `-1` while spinning.

use super::{is_within_reach, set_extra_data, Interactor, TriggerContext, REQUEST_DEACTIVATE};
use crate::composers;
use crate::persistence::ItemId;
use crate::room::{RoomFurniture, RoomState};
use rand::Rng;

const SPINNING: &str = "-1";

#[derive(Debug)]
pub struct Randomizer {
    pub min: i32,
    pub max: i32,
    pub spin_ticks: u32,
    /// Wheels are wall items switched by rights holders, not by reach.
    pub needs_rights: bool,
    pub is_dice: bool,
}

impl Randomizer {
    pub const DICE: Self = Self {
        min: 1,
        max: 6,
        spin_ticks: 3,
        needs_rights: false,
        is_dice: true,
    };

    pub const BOTTLE: Self = Self {
        min: 0,
        max: 7,
        spin_ticks: 3,
        needs_rights: false,
        is_dice: false,
    };

    pub const WHEEL: Self = Self {
        min: 0,
        max: 9,
        spin_ticks: 8,
        needs_rights: true,
        is_dice: false,
    };

    fn is_spinning(item: &RoomFurniture) -> bool {
        item.extra_data == SPINNING || item.countdown.is_some()
    }

    fn publish(&self, room: &mut RoomState, item: ItemId, value: Option<i32>) {
        match value {
            Some(value) => {
                set_extra_data(room, item, &value.to_string(), true);
                if self.is_dice {
                    room.broadcast(&composers::dice_value(item, value));
                }
            }
            None => {
                set_extra_data(room, item, SPINNING, false);
                if self.is_dice {
                    room.broadcast(&composers::dice_rolling(item));
                }
            }
        }
    }
}

impl Interactor for Randomizer {
    fn on_place(&self, room: &mut RoomState, item: ItemId) {
        super::release_claim(room, item);
        if let Some(furniture) = room.item_mut(item) {
            furniture.countdown = None;
            if furniture.extra_data == SPINNING {
                furniture.extra_data = "0".to_string();
            }
        }
    }

    fn on_trigger(&self, room: &mut RoomState, item: ItemId, ctx: TriggerContext) -> bool {
        let Some(furniture) = room.item(item) else {
            return false;
        };
        if Self::is_spinning(furniture) {
            return false;
        }
        let allowed = if self.needs_rights {
            ctx.has_rights
        } else {
            is_within_reach(room, item, ctx.avatar)
        };
        if !allowed {
            return false;
        }

        if ctx.request == REQUEST_DEACTIVATE {
            if !self.is_dice {
                return false;
            }
            self.publish(room, item, Some(0));
            return true;
        }

        if let Some(furniture) = room.item_mut(item) {
            furniture.countdown = Some(self.spin_ticks);
        }
        self.publish(room, item, None);
        true
    }

    fn on_tick(&self, room: &mut RoomState, item: ItemId) {
        if room.item(item).is_none() {
            return;
        }
        let value = room.rng.gen_range(self.min..=self.max);
        self.publish(room, item, Some(value));
    }

    fn normalize_extra_data(&self, item: &RoomFurniture) -> String {
        match item.extra_data.parse::<i32>() {
            Ok(value) if (self.min..=self.max).contains(&value) => value.to_string(),
            _ => "0".to_string(),
        }
    }
}

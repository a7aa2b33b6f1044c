//! Cyclic N-state switches. Gates are switches whose state `0` is closed
//! and that cannot close on someone.

use super::{set_extra_data, Interactor, TriggerContext};
use crate::persistence::ItemId;
use crate::room::{RoomFurniture, RoomState};
use tracing::trace;

#[derive(Debug)]
pub struct Switch {
    pub gate: bool,
}

fn current_state(item: &RoomFurniture) -> u8 {
    let modes = item.definition.modes.max(1);
    item.extra_data
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|state| *state < modes)
        .unwrap_or(0)
}

impl Interactor for Switch {
    fn on_trigger(&self, room: &mut RoomState, item: ItemId, ctx: TriggerContext) -> bool {
        if !ctx.has_rights {
            return false;
        }
        let Some(furniture) = room.item(item) else {
            return false;
        };
        let modes = furniture.definition.modes;
        if modes < 2 {
            return false;
        }
        let next = (current_state(furniture) + 1) % modes;

        if self.gate && next == 0 && room.item_has_occupants(item) {
            trace!("🚧 Gate {} stays open, someone is standing in it", item);
            return false;
        }

        set_extra_data(room, item, &next.to_string(), true);
        if self.gate {
            room.rebuild_map();
        }
        true
    }

    fn is_walkable(&self, item: &RoomFurniture) -> bool {
        if self.gate {
            current_state(item) != 0
        } else {
            item.definition.flags.can_stand_on
        }
    }

    fn normalize_extra_data(&self, item: &RoomFurniture) -> String {
        current_state(item).to_string()
    }
}

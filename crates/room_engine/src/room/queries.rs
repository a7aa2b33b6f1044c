//! Side-effect free questions about the room.
//!
//! Movement answers the same questions through these methods, so an
//! interactor asking "is anyone on this tile" sees exactly what the walker
//! would see.

use super::avatar::VirtualId;
use super::furniture::footprint;
use super::mapping::TileState;
use super::RoomState;
use crate::catalog::ItemDefinition;
use crate::geometry::Tile;
use crate::persistence::ItemId;

/// Highest step up an avatar can take.
pub const MAX_STEP_UP: f64 = 1.5;
/// Deepest drop an avatar will step down.
pub const MAX_STEP_DOWN: f64 = 3.0;

impl RoomState {
    pub fn distance(&self, a: Tile, b: Tile) -> f64 {
        a.distance(b)
    }

    pub fn is_adjacent(&self, a: Tile, b: Tile) -> bool {
        a.is_adjacent(b)
    }

    pub fn avatar_at(&self, tile: Tile) -> Option<VirtualId> {
        self.avatars
            .values()
            .find(|avatar| avatar.tile == tile)
            .map(|avatar| avatar.virtual_id)
    }

    pub fn has_occupants(&self, tile: Tile) -> bool {
        self.avatar_at(tile).is_some()
    }

    /// Whether anyone other than `walker` stands on `tile`.
    pub fn occupied_by_other(&self, tile: Tile, walker: Option<VirtualId>) -> bool {
        self.avatars
            .values()
            .any(|avatar| avatar.tile == tile && Some(avatar.virtual_id) != walker)
    }

    /// Whether `walker` could end a walk on `tile`: inside the floor, not
    /// blocked by furniture and not taken by anyone else.
    pub fn can_enter(&self, tile: Tile, walker: Option<VirtualId>) -> bool {
        if self.model.height_at(tile).is_none() {
            return false;
        }
        if self.map.state(tile) == TileState::Blocked {
            return false;
        }
        !self.occupied_by_other(tile, walker)
    }

    /// Whether a single step from `from` to `to` is legal. Seats and beds
    /// only accept the final step; heights limit climbing; a diagonal step
    /// needs one of the two corner tiles to be passable.
    pub fn can_step(&self, from: Tile, to: Tile, walker: Option<VirtualId>, is_final: bool) -> bool {
        if !from.is_adjacent(to) || !self.can_enter(to, walker) {
            return false;
        }
        let state = self.map.state(to);
        if matches!(state, TileState::Sit { .. } | TileState::Lay { .. }) && !is_final {
            return false;
        }

        let rise = self.map.stand_z(to) - self.map.stand_z(from);
        if rise > MAX_STEP_UP || -rise > MAX_STEP_DOWN {
            return false;
        }

        if from.is_diagonal_to(to) {
            let corner_a = Tile::new(to.x, from.y);
            let corner_b = Tile::new(from.x, to.y);
            let open = |corner: Tile| {
                self.model.height_at(corner).is_some() && self.map.is_passable(corner)
            };
            if !open(corner_a) && !open(corner_b) {
                return false;
            }
        }
        true
    }

    /// Items covering `tile`, lowest first.
    pub fn items_at(&self, tile: Tile) -> &[ItemId] {
        self.map.get(tile).map_or(&[], |info| info.items.as_slice())
    }

    /// Whether any avatar stands on the item's footprint.
    pub fn item_has_occupants(&self, item: ItemId) -> bool {
        self.furniture
            .get(&item)
            .is_some_and(|item| item.footprint().into_iter().any(|tile| self.has_occupants(tile)))
    }

    /// Height an item of `definition` would rest at if placed at `anchor`,
    /// or `None` when it cannot go there. `moving` is left out of the stack
    /// so an item can be turned in place.
    pub fn placement_height(
        &self,
        definition: &ItemDefinition,
        anchor: Tile,
        rotation: u8,
        moving: Option<ItemId>,
    ) -> Option<f64> {
        let walkable = definition.flags.can_stand_on
            || definition.flags.can_sit_on
            || definition.flags.can_lay_on;
        let mut height: f64 = 0.0;
        for tile in footprint(definition, anchor, rotation) {
            let floor = self.model.height_at(tile)?;
            if !walkable && self.has_occupants(tile) {
                return None;
            }
            let top = self
                .furniture
                .values()
                .filter(|item| Some(item.id) != moving && item.covers(tile))
                .max_by(|a, b| a.top().total_cmp(&b.top()));
            let tile_height = match top {
                Some(item) if !item.definition.flags.can_stack_on => return None,
                Some(item) => item.top(),
                None => floor,
            };
            height = height.max(tile_height);
        }
        Some(height)
    }
}

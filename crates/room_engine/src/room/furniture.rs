//! Furniture placed in a loaded room.

use super::avatar::VirtualId;
use crate::catalog::ItemDefinition;
use crate::geometry::{opposite, Tile};
use crate::persistence::{FurnitureData, ItemId};
use habitat_event_system::{RoomId, UserId};
use std::sync::Arc;

/// Length runs along x and width along y, swapped when turned sideways.
pub fn dimensions(definition: &ItemDefinition, rotation: u8) -> (i32, i32) {
    let length = i32::from(definition.length.max(1));
    let width = i32::from(definition.width.max(1));
    match rotation % 8 {
        2 | 6 => (width, length),
        _ => (length, width),
    }
}

/// Tiles covered by an item of `definition` anchored at `anchor`.
pub fn footprint(definition: &ItemDefinition, anchor: Tile, rotation: u8) -> Vec<Tile> {
    let (dx, dy) = dimensions(definition, rotation);
    let mut tiles = Vec::with_capacity((dx * dy) as usize);
    for y in 0..dy {
        for x in 0..dx {
            tiles.push(Tile::new(anchor.x + x, anchor.y + y));
        }
    }
    tiles
}

#[derive(Debug, Clone)]
pub struct RoomFurniture {
    pub id: ItemId,
    pub owner_id: UserId,
    pub definition: Arc<ItemDefinition>,
    pub tile: Tile,
    pub z: f64,
    pub rotation: u8,
    pub extra_data: String,
    /// Avatar currently holding the item's rendezvous claim.
    pub interacting: Option<VirtualId>,
    /// Ticks until the interactor's `on_tick` fires.
    pub countdown: Option<u32>,
    pub teleport_link: Option<ItemId>,
}

impl RoomFurniture {
    pub fn from_data(data: &FurnitureData, definition: Arc<ItemDefinition>) -> Self {
        Self {
            id: data.id,
            owner_id: data.owner_id,
            definition,
            tile: Tile::new(data.x, data.y),
            z: data.z,
            rotation: data.rotation % 8,
            extra_data: data.extra_data.clone(),
            interacting: None,
            countdown: None,
            teleport_link: data.teleport_link,
        }
    }

    pub fn to_data(&self, room: Option<RoomId>) -> FurnitureData {
        FurnitureData {
            id: self.id,
            room_id: room,
            owner_id: self.owner_id,
            definition_id: self.definition.id,
            x: self.tile.x,
            y: self.tile.y,
            z: self.z,
            rotation: self.rotation,
            extra_data: self.extra_data.clone(),
            teleport_link: self.teleport_link,
        }
    }

    pub fn dimensions(&self) -> (i32, i32) {
        dimensions(&self.definition, self.rotation)
    }

    pub fn footprint(&self) -> Vec<Tile> {
        footprint(&self.definition, self.tile, self.rotation)
    }

    pub fn covers(&self, tile: Tile) -> bool {
        let (dx, dy) = self.dimensions();
        tile.x >= self.tile.x
            && tile.y >= self.tile.y
            && tile.x < self.tile.x + dx
            && tile.y < self.tile.y + dy
    }

    pub fn top(&self) -> f64 {
        self.z + self.definition.stack_height
    }

    /// Tile the item faces.
    pub fn front_tile(&self) -> Tile {
        self.tile.step(self.rotation)
    }

    pub fn behind_tile(&self) -> Tile {
        self.tile.step(opposite(self.rotation))
    }

    /// Whether `tile` touches any part of the footprint.
    pub fn touches(&self, tile: Tile) -> bool {
        self.footprint()
            .iter()
            .any(|covered| covered.is_adjacent(tile) || *covered == tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InteractionType, ItemFlags};

    fn bed(rotation: u8) -> RoomFurniture {
        let definition = ItemDefinition {
            id: 11,
            sprite: "bed".into(),
            name: String::new(),
            length: 1,
            width: 2,
            stack_height: 1.0,
            colour: String::new(),
            flags: ItemFlags::default(),
            interaction: InteractionType::Default,
            modes: 2,
            vend_items: Vec::new(),
        };
        RoomFurniture::from_data(
            &FurnitureData {
                id: ItemId(1),
                room_id: Some(RoomId(1)),
                owner_id: UserId(1),
                definition_id: 11,
                x: 2,
                y: 5,
                z: 0.0,
                rotation,
                extra_data: String::new(),
                teleport_link: None,
            },
            Arc::new(definition),
        )
    }

    #[test]
    fn footprint_turns_with_rotation() {
        assert_eq!(bed(0).footprint(), vec![Tile::new(2, 5), Tile::new(2, 6)]);
        assert_eq!(bed(2).footprint(), vec![Tile::new(2, 5), Tile::new(3, 5)]);
        assert!(bed(2).covers(Tile::new(3, 5)));
        assert!(!bed(2).covers(Tile::new(2, 6)));
    }

    #[test]
    fn front_and_behind_follow_rotation() {
        let item = bed(6);
        assert_eq!(item.front_tile(), Tile::new(1, 5));
        assert_eq!(item.behind_tile(), Tile::new(3, 5));
    }
}

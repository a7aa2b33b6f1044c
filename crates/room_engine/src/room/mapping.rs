//! Per-tile view of the floor after furniture is stacked on it.

use super::furniture::RoomFurniture;
use crate::geometry::Tile;
use crate::interactors::interactor_for;
use crate::model::RoomModel;
use crate::persistence::ItemId;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TileState {
    Open,
    Blocked,
    /// Seat; only valid as the last step of a walk.
    Sit { rotation: u8, height: f64 },
    /// Bed; only valid as the last step of a walk.
    Lay { rotation: u8, height: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileInfo {
    pub state: TileState,
    /// Height an avatar on this tile stands, sits or lies at.
    pub stand_z: f64,
    /// Height the next stacked item would rest at.
    pub stack_top: f64,
    pub can_stack: bool,
    pub top_item: Option<ItemId>,
    /// Items covering the tile, lowest first.
    pub items: Vec<ItemId>,
}

impl TileInfo {
    fn floor(height: Option<f64>) -> Self {
        match height {
            Some(z) => Self {
                state: TileState::Open,
                stand_z: z,
                stack_top: z,
                can_stack: true,
                top_item: None,
                items: Vec::new(),
            },
            None => Self {
                state: TileState::Blocked,
                stand_z: 0.0,
                stack_top: 0.0,
                can_stack: false,
                top_item: None,
                items: Vec::new(),
            },
        }
    }

    pub fn is_seat(&self) -> bool {
        matches!(self.state, TileState::Sit { .. } | TileState::Lay { .. })
    }
}

#[derive(Debug, Clone)]
pub struct TileMap {
    width: i32,
    height: i32,
    tiles: Vec<TileInfo>,
}

impl TileMap {
    pub fn build(model: &RoomModel, furniture: &BTreeMap<ItemId, RoomFurniture>) -> Self {
        let mut tiles = Vec::with_capacity((model.width() * model.height()) as usize);
        for y in 0..model.height() {
            for x in 0..model.width() {
                tiles.push(TileInfo::floor(model.height_at(Tile::new(x, y))));
            }
        }
        let mut map = Self {
            width: model.width(),
            height: model.height(),
            tiles,
        };

        let mut stacked: Vec<&RoomFurniture> = furniture.values().collect();
        stacked.sort_by(|a, b| a.z.total_cmp(&b.z).then(a.id.cmp(&b.id)));

        for item in stacked {
            let walkable = interactor_for(item.definition.interaction).is_walkable(item);
            let flags = item.definition.flags;
            for tile in item.footprint() {
                let Some(info) = map.get_mut(tile) else {
                    continue;
                };
                if info.state == TileState::Blocked && info.top_item.is_none() {
                    // wall tile, nothing sits on it
                    continue;
                }
                info.items.push(item.id);
                info.top_item = Some(item.id);
                info.stack_top = info.stack_top.max(item.top());
                info.can_stack = flags.can_stack_on;
                let (state, stand_z) = if flags.can_sit_on {
                    (
                        TileState::Sit {
                            rotation: item.rotation,
                            height: item.definition.stack_height,
                        },
                        item.z,
                    )
                } else if flags.can_lay_on {
                    (
                        TileState::Lay {
                            rotation: item.rotation,
                            height: item.definition.stack_height,
                        },
                        item.z,
                    )
                } else if walkable {
                    (TileState::Open, item.top())
                } else {
                    (TileState::Blocked, item.top())
                };
                info.state = state;
                info.stand_z = stand_z;
            }
        }
        map
    }

    fn index(&self, tile: Tile) -> Option<usize> {
        (tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height)
            .then(|| (tile.y * self.width + tile.x) as usize)
    }

    pub fn get(&self, tile: Tile) -> Option<&TileInfo> {
        self.index(tile).map(|index| &self.tiles[index])
    }

    fn get_mut(&mut self, tile: Tile) -> Option<&mut TileInfo> {
        self.index(tile).map(move |index| &mut self.tiles[index])
    }

    pub fn state(&self, tile: Tile) -> TileState {
        self.get(tile).map_or(TileState::Blocked, |info| info.state)
    }

    pub fn stand_z(&self, tile: Tile) -> f64 {
        self.get(tile).map_or(0.0, |info| info.stand_z)
    }

    /// Passable for the diagonal corner rule: not a wall and not blocked.
    pub fn is_passable(&self, tile: Tile) -> bool {
        !matches!(self.state(tile), TileState::Blocked)
    }
}

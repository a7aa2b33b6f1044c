//! Room height maps.
//!
//! A model is a block of text, one row per line: `0`-`9` are heights 0 to 9,
//! `a`-`z` continue from 10, and `x` marks a tile that can never be entered.

use crate::error::RoomError;
use crate::geometry::Tile;
use crate::persistence::RoomModelData;

#[derive(Debug, Clone, PartialEq)]
pub struct RoomModel {
    pub name: String,
    pub door: Tile,
    pub door_rotation: u8,
    width: i32,
    height: i32,
    heights: Vec<Option<f64>>,
}

fn parse_height(c: char) -> Option<Option<f64>> {
    match c {
        'x' | 'X' => Some(None),
        '0'..='9' => Some(Some(f64::from(c as u8 - b'0'))),
        'a'..='z' => Some(Some(f64::from(c as u8 - b'a' + 10))),
        _ => None,
    }
}

impl RoomModel {
    pub fn parse(data: &RoomModelData) -> Result<Self, RoomError> {
        let invalid = |reason: String| RoomError::InvalidModel {
            model: data.name.clone(),
            reason,
        };

        let rows: Vec<&str> = data
            .heightmap
            .split(['\r', '\n'])
            .map(str::trim)
            .filter(|row| !row.is_empty())
            .collect();
        if rows.is_empty() {
            return Err(invalid("empty heightmap".into()));
        }

        let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
        let mut heights = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            let mut count = 0;
            for (x, c) in row.chars().enumerate() {
                let height = parse_height(c)
                    .ok_or_else(|| invalid(format!("unexpected '{c}' at ({x}, {y})")))?;
                heights.push(height);
                count += 1;
            }
            // ragged rows are padded with walls
            heights.extend(std::iter::repeat(None).take(width - count));
        }

        let model = Self {
            name: data.name.clone(),
            door: Tile::new(data.door_x, data.door_y),
            door_rotation: data.door_rotation % 8,
            width: width as i32,
            height: rows.len() as i32,
            heights,
        };
        if model.height_at(model.door).is_none() {
            return Err(invalid(format!("door {} is not an open tile", model.door)));
        }
        Ok(model)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, tile: Tile) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height
    }

    pub(crate) fn index(&self, tile: Tile) -> Option<usize> {
        self.contains(tile)
            .then(|| (tile.y * self.width + tile.x) as usize)
    }

    /// Floor height, or `None` for walls and out-of-bounds tiles.
    pub fn height_at(&self, tile: Tile) -> Option<f64> {
        self.index(tile).and_then(|index| self.heights[index])
    }

    pub fn door_height(&self) -> f64 {
        self.height_at(self.door).unwrap_or_default()
    }

    /// Height map as the client draws it: rows separated by carriage returns.
    pub fn to_wire(&self) -> String {
        let mut out = String::with_capacity(self.heights.len() + self.height as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = match self.height_at(Tile::new(x, y)) {
                    None => 'x',
                    Some(h) if h < 10.0 => char::from(b'0' + h as u8),
                    Some(h) => char::from(b'a' + (h as u8 - 10)),
                };
                out.push(c);
            }
            out.push('\r');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(heightmap: &str, door: (i32, i32)) -> RoomModelData {
        RoomModelData {
            name: "test".into(),
            heightmap: heightmap.into(),
            door_x: door.0,
            door_y: door.1,
            door_rotation: 2,
        }
    }

    #[test]
    fn parses_heights_walls_and_letters() {
        let model = RoomModel::parse(&data("x00\n01a\n0x", (1, 0))).unwrap();
        assert_eq!((model.width(), model.height()), (3, 3));
        assert_eq!(model.height_at(Tile::new(0, 0)), None);
        assert_eq!(model.height_at(Tile::new(1, 1)), Some(1.0));
        assert_eq!(model.height_at(Tile::new(2, 1)), Some(10.0));
        assert_eq!(model.height_at(Tile::new(2, 2)), None);
        assert_eq!(model.height_at(Tile::new(5, 5)), None);
        assert_eq!(model.to_wire(), "x00\r01a\r0xx\r");
    }

    #[test]
    fn rejects_bad_characters_and_walled_doors() {
        assert!(matches!(
            RoomModel::parse(&data("0?0", (0, 0))),
            Err(RoomError::InvalidModel { .. })
        ));
        assert!(matches!(
            RoomModel::parse(&data("x0", (0, 0))),
            Err(RoomError::InvalidModel { .. })
        ));
        assert!(RoomModel::parse(&data("", (0, 0))).is_err());
    }
}

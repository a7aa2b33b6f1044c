//! Tile coordinates and the eight-way rotation scheme.
//!
//! Rotation 0 faces north (y - 1) and values increase clockwise in 45 degree
//! steps, so 2 is east, 4 south and 6 west.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

const DIRECTIONS: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

impl Tile {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in tiles.
    pub fn distance(&self, other: Tile) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }

    /// Steps needed when diagonal moves cost the same as straight ones.
    pub fn chebyshev(&self, other: Tile) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Touching, diagonals included. A tile is not adjacent to itself.
    pub fn is_adjacent(&self, other: Tile) -> bool {
        *self != other && self.chebyshev(other) == 1
    }

    /// Neighbour one step in `rotation`'s direction.
    pub fn step(&self, rotation: u8) -> Tile {
        let (dx, dy) = DIRECTIONS[usize::from(rotation % 8)];
        Tile::new(self.x + dx, self.y + dy)
    }

    pub fn neighbours(&self) -> impl Iterator<Item = Tile> + '_ {
        DIRECTIONS
            .iter()
            .map(move |(dx, dy)| Tile::new(self.x + dx, self.y + dy))
    }

    pub fn is_diagonal_to(&self, other: Tile) -> bool {
        self.x != other.x && self.y != other.y
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Rotation that faces `to` when standing on `from`.
pub fn rotation_towards(from: Tile, to: Tile) -> u8 {
    let dx = (to.x - from.x).signum();
    let dy = (to.y - from.y).signum();
    DIRECTIONS
        .iter()
        .position(|&d| d == (dx, dy))
        .map_or(2, |index| index as u8)
}

/// Opposite direction, e.g. the back of a one-way gate.
pub fn opposite(rotation: u8) -> u8 {
    (rotation % 8 + 4) % 8
}

/// Formats a height the way the client parses it: at least one decimal,
/// at most two, no trailing zeros beyond the first.
pub fn format_height(z: f64) -> String {
    let mut text = format!("{:.2}", z);
    while text.ends_with('0') && !text.ends_with(".0") {
        text.pop();
    }
    text
}

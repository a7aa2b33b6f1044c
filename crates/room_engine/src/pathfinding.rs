//! A* over the eight-connected tile grid.
//!
//! Straight steps cost 10 and diagonal steps 14, with the matching octile
//! heuristic. The caller decides which steps are legal, so the search stays
//! free of room state. When the goal cannot be reached the path leads to the
//! explored tile closest to it instead.

use crate::geometry::Tile;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

const STRAIGHT_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;

fn heuristic(from: Tile, to: Tile) -> u32 {
    let dx = (from.x - to.x).unsigned_abs();
    let dy = (from.y - to.y).unsigned_abs();
    STRAIGHT_COST * dx.max(dy) + (DIAGONAL_COST - STRAIGHT_COST) * dx.min(dy)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Node {
    f: u32,
    h: u32,
    order: u32,
    tile: Tile,
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: invert so the cheapest node pops first,
        // ties going to the node nearer the goal and then the oldest one.
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Finds a walk from `start` towards `goal`.
///
/// `can_step(from, to, is_goal)` decides whether a single step is legal.
/// The returned path excludes `start`; it is empty when no step brings the
/// walker any closer.
pub fn find_path<F>(start: Tile, goal: Tile, max_nodes: usize, mut can_step: F) -> Vec<Tile>
where
    F: FnMut(Tile, Tile, bool) -> bool,
{
    if start == goal {
        return Vec::new();
    }

    let mut open = BinaryHeap::new();
    let mut closed = HashSet::new();
    let mut g_score: HashMap<Tile, u32> = HashMap::new();
    let mut came_from: HashMap<Tile, Tile> = HashMap::new();
    let mut order = 0u32;

    let start_h = heuristic(start, goal);
    g_score.insert(start, 0);
    open.push(Node {
        f: start_h,
        h: start_h,
        order,
        tile: start,
    });

    let mut best = (start_h, 0u32, start);
    let mut expanded = 0usize;

    while let Some(node) = open.pop() {
        if node.tile == goal {
            return rebuild(&came_from, start, goal);
        }
        if !closed.insert(node.tile) {
            continue;
        }
        let g = g_score.get(&node.tile).copied().unwrap_or(u32::MAX);
        if (node.h, g) < (best.0, best.1) {
            best = (node.h, g, node.tile);
        }

        expanded += 1;
        if expanded > max_nodes {
            break;
        }

        for next in node.tile.neighbours() {
            if closed.contains(&next) {
                continue;
            }
            let is_goal = next == goal;
            if !can_step(node.tile, next, is_goal) {
                continue;
            }
            let step = if node.tile.is_diagonal_to(next) {
                DIAGONAL_COST
            } else {
                STRAIGHT_COST
            };
            let tentative = g.saturating_add(step);
            if tentative < g_score.get(&next).copied().unwrap_or(u32::MAX) {
                g_score.insert(next, tentative);
                came_from.insert(next, node.tile);
                let h = heuristic(next, goal);
                order += 1;
                open.push(Node {
                    f: tentative + h,
                    h,
                    order,
                    tile: next,
                });
            }
        }
    }

    let closest = best.2;
    if closest == start {
        return Vec::new();
    }
    rebuild(&came_from, start, closest)
}

fn rebuild(came_from: &HashMap<Tile, Tile>, start: Tile, end: Tile) -> Vec<Tile> {
    let mut path = vec![end];
    let mut current = end;
    while let Some(&previous) = came_from.get(&current) {
        if previous == start {
            break;
        }
        path.push(previous);
        current = previous;
    }
    path.reverse();
    path
}

use super::avatar::{VirtualId, STATUS_LAY, STATUS_MOVE, STATUS_SIT};
use super::mapping::TileState;
use super::RoomState;
use crate::geometry::{format_height, rotation_towards, Tile};
use crate::pathfinding::find_path;
use tracing::trace;

impl RoomState {
    fn plan(&self, walker: VirtualId, from: Tile, goal: Tile) -> Vec<Tile> {
        find_path(from, goal, self.settings.max_path_nodes, |step_from, step_to, is_goal| {
            self.can_step(step_from, step_to, Some(walker), is_goal)
        })
    }

    /// Starts walking `walker` towards `goal`. When the goal cannot be
    /// reached the avatar heads for the closest reachable tile instead.
    /// Returns whether a walk was started.
    pub fn walk_to(&mut self, walker: VirtualId, goal: Tile) -> bool {
        let Some(avatar) = self.avatars.get(&walker) else {
            return false;
        };
        if !avatar.can_walk || avatar.tile == goal {
            return false;
        }
        let from = avatar.tile;
        let path = self.plan(walker, from, goal);
        let Some(avatar) = self.avatars.get_mut(&walker) else {
            return false;
        };
        if path.is_empty() {
            avatar.stop_walking();
            return false;
        }
        trace!("🧭 #{} walking {} -> {} in {} steps", walker, from, goal, path.len());
        avatar.goal = Some(goal);
        avatar.path = path.into();
        true
    }

    /// Turns to face `target`. Sitting avatars only turn their head and
    /// lying or walking ones ignore the request.
    pub fn look_to(&mut self, walker: VirtualId, target: Tile) {
        let Some(avatar) = self.avatars.get_mut(&walker) else {
            return;
        };
        if avatar.tile == target || avatar.is_walking() || avatar.has_status(STATUS_LAY) {
            return;
        }
        let rotation = rotation_towards(avatar.tile, target);
        if avatar.has_status(STATUS_SIT) {
            avatar.head_rotation = rotation;
            avatar.needs_update = true;
        } else {
            avatar.set_rotation(rotation);
        }
    }

    /// Puts `walker` on `tile` without animating.
    pub fn force_move(&mut self, walker: VirtualId, tile: Tile, rotation: Option<u8>) {
        let z = self.map.stand_z(tile);
        if let Some(avatar) = self.avatars.get_mut(&walker) {
            avatar.place_at(tile, z);
            if let Some(rotation) = rotation {
                avatar.set_rotation(rotation);
            }
            avatar.arrived = true;
        }
    }

    /// Advances every walking avatar by one tile, in virtual id order.
    pub(super) fn process_movement(&mut self) {
        let walkers: Vec<VirtualId> = self.avatars.keys().copied().collect();
        for id in walkers {
            self.advance(id);
        }
    }

    fn advance(&mut self, id: VirtualId) {
        let Some(avatar) = self.avatars.get_mut(&id) else {
            return;
        };
        if avatar.step_from.take().is_some() {
            avatar.statuses.remove(STATUS_MOVE);
            avatar.needs_update = true;
        }
        if !avatar.can_walk {
            avatar.stop_walking();
            return;
        }
        if avatar.path.is_empty() {
            if std::mem::take(&mut avatar.arrived) {
                self.apply_arrival(id);
            }
            return;
        }

        let from = avatar.tile;
        let goal = avatar.goal;
        let Some(mut next) = avatar.path.front().copied() else {
            return;
        };
        let mut is_final = avatar.path.len() == 1;

        if !self.can_step(from, next, Some(id), is_final) {
            // something moved into the way: re-plan or give up
            let replanned = goal.map(|goal| self.plan(id, from, goal)).unwrap_or_default();
            let Some(avatar) = self.avatars.get_mut(&id) else {
                return;
            };
            match replanned.first().copied() {
                Some(step) => {
                    next = step;
                    is_final = replanned.len() == 1;
                    avatar.path = replanned.into();
                }
                None => {
                    avatar.stop_walking();
                    return;
                }
            }
            if !self.can_step(from, next, Some(id), is_final) {
                if let Some(avatar) = self.avatars.get_mut(&id) {
                    avatar.stop_walking();
                }
                return;
            }
        }

        let z = self.map.stand_z(next);
        let Some(avatar) = self.avatars.get_mut(&id) else {
            return;
        };
        avatar.path.pop_front();
        avatar.statuses.remove(STATUS_SIT);
        avatar.statuses.remove(STATUS_LAY);
        avatar.set_rotation(rotation_towards(from, next));
        avatar.step_from = Some((from, avatar.z));
        avatar.set_status(
            STATUS_MOVE,
            format!("{},{},{}", next.x, next.y, format_height(z)),
            None,
        );
        avatar.tile = next;
        avatar.z = z;
        if avatar.path.is_empty() {
            avatar.goal = None;
            avatar.arrived = true;
        }
    }

    /// Applies the tile an avatar stopped on: seats and beds.
    fn apply_arrival(&mut self, id: VirtualId) {
        let Some(avatar) = self.avatars.get(&id) else {
            return;
        };
        let tile = avatar.tile;
        let state = self.map.state(tile);
        let z = self.map.stand_z(tile);
        let Some(avatar) = self.avatars.get_mut(&id) else {
            return;
        };
        match state {
            TileState::Sit { rotation, height } => {
                avatar.z = z;
                avatar.set_rotation(rotation);
                avatar.set_status(STATUS_SIT, format_height(height), None);
            }
            TileState::Lay { rotation, height } => {
                avatar.z = z;
                avatar.set_rotation(rotation);
                avatar.set_status(STATUS_LAY, format_height(height), None);
            }
            TileState::Open | TileState::Blocked => {}
        }
    }
}

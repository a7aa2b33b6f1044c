//! Avatars standing in a room, users and bots alike.

use crate::geometry::{format_height, Tile};
use crate::persistence::ItemId;
use habitat_event_system::{SessionRef, UserId};
use std::collections::{BTreeMap, VecDeque};
use std::fmt::Write;

/// Room-scoped avatar id, reassigned on every visit.
pub type VirtualId = u32;

pub const STATUS_MOVE: &str = "mv";
pub const STATUS_SIT: &str = "sit";
pub const STATUS_LAY: &str = "lay";
pub const STATUS_CARRY: &str = "carryd";
pub const STATUS_WAVE: &str = "wave";
pub const STATUS_DANCE: &str = "dance";

#[derive(Debug, Clone)]
pub enum AvatarKind {
    User { session: SessionRef, user_id: UserId },
    Bot { bot_id: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    pub value: String,
    /// Tick at which the status drops off, `None` for sticky statuses.
    pub expires_at: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RoomAvatar {
    pub virtual_id: VirtualId,
    pub kind: AvatarKind,
    pub name: String,
    pub figure: String,
    pub motto: String,
    pub sex: String,
    pub tile: Tile,
    pub z: f64,
    pub body_rotation: u8,
    pub head_rotation: u8,
    pub goal: Option<Tile>,
    pub path: VecDeque<Tile>,
    /// Cleared by interactors holding the avatar in place.
    pub can_walk: bool,
    pub interacting_item: Option<ItemId>,
    pub statuses: BTreeMap<&'static str, StatusEntry>,
    pub needs_update: bool,
    /// Where the avatar stood before this tick's step; the client animates
    /// from here to the `mv` target.
    pub(crate) step_from: Option<(Tile, f64)>,
    /// Set after the last step so seat and bed effects apply on the next tick.
    pub(crate) arrived: bool,
}

impl RoomAvatar {
    pub fn new(virtual_id: VirtualId, kind: AvatarKind, name: impl Into<String>) -> Self {
        Self {
            virtual_id,
            kind,
            name: name.into(),
            figure: String::new(),
            motto: String::new(),
            sex: "M".to_string(),
            tile: Tile::new(0, 0),
            z: 0.0,
            body_rotation: 2,
            head_rotation: 2,
            goal: None,
            path: VecDeque::new(),
            can_walk: true,
            interacting_item: None,
            statuses: BTreeMap::new(),
            needs_update: true,
            step_from: None,
            arrived: false,
        }
    }

    pub fn session(&self) -> Option<&SessionRef> {
        match &self.kind {
            AvatarKind::User { session, .. } => Some(session),
            AvatarKind::Bot { .. } => None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match &self.kind {
            AvatarKind::User { user_id, .. } => Some(*user_id),
            AvatarKind::Bot { .. } => None,
        }
    }

    pub fn is_bot(&self) -> bool {
        matches!(self.kind, AvatarKind::Bot { .. })
    }

    pub fn is_walking(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn set_rotation(&mut self, rotation: u8) {
        self.body_rotation = rotation % 8;
        self.head_rotation = rotation % 8;
        self.needs_update = true;
    }

    /// Teleports the avatar without animating, dropping any walk in progress.
    pub fn place_at(&mut self, tile: Tile, z: f64) {
        self.tile = tile;
        self.z = z;
        self.path.clear();
        self.goal = None;
        self.step_from = None;
        self.statuses.remove(STATUS_MOVE);
        self.statuses.remove(STATUS_SIT);
        self.statuses.remove(STATUS_LAY);
        self.needs_update = true;
    }

    pub fn stop_walking(&mut self) {
        if self.path.is_empty() && self.goal.is_none() {
            return;
        }
        self.path.clear();
        self.goal = None;
        self.needs_update = true;
    }

    pub fn set_status(&mut self, key: &'static str, value: impl Into<String>, expires_at: Option<u64>) {
        self.statuses.insert(
            key,
            StatusEntry {
                value: value.into(),
                expires_at,
            },
        );
        self.needs_update = true;
    }

    pub fn remove_status(&mut self, key: &str) -> bool {
        let removed = self.statuses.remove(key).is_some();
        self.needs_update |= removed;
        removed
    }

    pub fn has_status(&self, key: &str) -> bool {
        self.statuses.contains_key(key)
    }

    /// One `STATUS` line: position, rotations, then every status.
    pub fn status_line(&self) -> String {
        let (tile, z) = self.step_from.unwrap_or((self.tile, self.z));
        let mut line = String::with_capacity(48);
        let _ = write!(
            line,
            "{} {},{},{},{},{}/",
            self.virtual_id,
            tile.x,
            tile.y,
            format_height(z),
            self.head_rotation,
            self.body_rotation
        );
        for (key, status) in &self.statuses {
            line.push_str(key);
            if !status.value.is_empty() {
                line.push(' ');
                line.push_str(&status.value);
            }
            line.push('/');
        }
        line.push('\r');
        line
    }

    /// One `USERS` entry.
    pub fn users_entry(&self) -> String {
        let account = match &self.kind {
            AvatarKind::User { user_id, .. } => user_id.0,
            AvatarKind::Bot { bot_id } => *bot_id,
        };
        let mut entry = format!(
            "i:{}\ra:{}\rn:{}\rf:{}\rs:{}\rl:{} {} {}\rc:{}\r",
            self.virtual_id,
            account,
            self.name,
            self.figure,
            self.sex,
            self.tile.x,
            self.tile.y,
            format_height(self.z),
            self.motto
        );
        if self.is_bot() {
            entry.push_str("b:1\r");
        }
        entry
    }
}

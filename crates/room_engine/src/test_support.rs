//! Builders shared by the unit tests.

use crate::catalog::{InteractionType, ItemDefinition, ItemFlags};
use crate::model::RoomModel;
use crate::persistence::{FurnitureData, ItemId, RoomData, RoomModelData};
use crate::room::{RoomFurniture, RoomSettings, RoomState, Spawn, VirtualId};
use bytes::Bytes;
use habitat_event_system::{Identity, RoomId, Session, SessionId, SessionRef, UserId};
use habitat_protocol::base64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Open floor of the given size, door at (0, 0) facing east.
pub fn flat_model(width: usize, height: usize) -> Arc<RoomModel> {
    let row = "0".repeat(width);
    let heightmap = vec![row; height].join("\n");
    model_from(&heightmap, 0, 0)
}

pub fn model_from(heightmap: &str, door_x: i32, door_y: i32) -> Arc<RoomModel> {
    let model = RoomModel::parse(&RoomModelData {
        name: "test_model".into(),
        heightmap: heightmap.into(),
        door_x,
        door_y,
        door_rotation: 2,
    })
    .expect("test model parses");
    Arc::new(model)
}

pub fn definition(id: u32, interaction: InteractionType) -> ItemDefinition {
    ItemDefinition {
        id,
        sprite: format!("sprite{id}"),
        name: String::new(),
        length: 1,
        width: 1,
        stack_height: 1.0,
        colour: String::new(),
        flags: ItemFlags::default(),
        interaction,
        modes: 2,
        vend_items: Vec::new(),
    }
}

pub fn with_flags(mut definition: ItemDefinition, flags: ItemFlags) -> ItemDefinition {
    definition.flags = flags;
    definition
}

pub fn item(id: u32, definition: ItemDefinition, x: i32, y: i32, rotation: u8) -> RoomFurniture {
    RoomFurniture::from_data(
        &FurnitureData {
            id: ItemId(id),
            room_id: Some(RoomId(1)),
            owner_id: UserId(1),
            definition_id: definition.id,
            x,
            y,
            z: 0.0,
            rotation,
            extra_data: "0".into(),
            teleport_link: None,
        },
        Arc::new(definition),
    )
}

pub fn room_data(id: u32) -> RoomData {
    RoomData {
        id: RoomId(id),
        name: format!("Room {id}"),
        description: String::new(),
        owner_id: UserId(1),
        model: "test_model".into(),
        max_users: 25,
        rights: Vec::new(),
    }
}

pub fn state(model: Arc<RoomModel>, furniture: Vec<RoomFurniture>) -> RoomState {
    RoomState::new(room_data(1), model, furniture, RoomSettings::default())
}

pub fn identity(user_id: u32, name: &str, rank: u8) -> Identity {
    Identity {
        user_id: UserId(user_id),
        username: name.into(),
        figure: String::new(),
        motto: String::new(),
        sex: "M".into(),
        rank,
    }
}

pub fn session() -> (SessionRef, mpsc::Receiver<Bytes>) {
    let id = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
    let addr = "127.0.0.1:30000".parse().expect("valid address");
    Session::channel(SessionId(id), addr, 1024)
}

/// A session that already logged in as `identity`.
pub fn logged_in(identity: Identity) -> (SessionRef, mpsc::Receiver<Bytes>) {
    let (session, rx) = session();
    session.set_identity(identity);
    (session, rx)
}

/// Adds a user through the door and returns its virtual id with its queue.
pub fn add_user(
    room: &mut RoomState,
    user_id: u32,
    name: &str,
) -> (VirtualId, SessionRef, mpsc::Receiver<Bytes>) {
    let (session, rx) = session();
    let id = room.add_user(session.clone(), &identity(user_id, name, 1), Spawn::Door);
    (id, session, rx)
}

/// Header ids of every frame queued so far.
pub fn drain_headers(rx: &mut mpsc::Receiver<Bytes>) -> Vec<u16> {
    let mut headers = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        if frame.len() >= 2 {
            headers.push(base64::decode(&frame[..2]) as u16);
        }
    }
    headers
}

/// Runs ticks until `done` holds or `limit` ticks have passed.
pub fn tick_until(room: &mut RoomState, limit: usize, mut done: impl FnMut(&RoomState) -> bool) -> bool {
    for _ in 0..limit {
        if done(room) {
            return true;
        }
        room.tick();
    }
    done(room)
}

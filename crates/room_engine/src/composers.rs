//! Outgoing room packets.
//!
//! Every function builds one message; callers decide whether it goes to one
//! session or the whole room.

use crate::bots::SpeechMode;
use crate::geometry::format_height;
use crate::model::RoomModel;
use crate::persistence::ItemId;
use crate::room::{RoomAvatar, RoomFurniture, VirtualId};
use habitat_event_system::RoomId;
use habitat_protocol::headers::outgoing;
use habitat_protocol::OutboundMessage;

pub fn flat_letin() -> OutboundMessage {
    OutboundMessage::new(outgoing::FLAT_LETIN)
}

pub fn room_ready(model: &str, room: RoomId) -> OutboundMessage {
    let mut message = OutboundMessage::new(outgoing::ROOM_READY);
    message.write_raw(&format!("{model} {room}"));
    message
}

pub fn heightmap(model: &RoomModel) -> OutboundMessage {
    let mut message = OutboundMessage::new(outgoing::HEIGHTMAP);
    message.write_raw(&model.to_wire());
    message
}

pub fn users<'a>(avatars: impl IntoIterator<Item = &'a RoomAvatar>) -> OutboundMessage {
    let mut message = OutboundMessage::new(outgoing::USERS);
    for avatar in avatars {
        message.write_raw(&avatar.users_entry());
    }
    message
}

pub fn status<'a>(avatars: impl IntoIterator<Item = &'a RoomAvatar>) -> OutboundMessage {
    let mut message = OutboundMessage::new(outgoing::STATUS);
    for avatar in avatars {
        message.write_raw(&avatar.status_line());
    }
    message
}

fn write_item(message: &mut OutboundMessage, item: &RoomFurniture) {
    let (length, width) = item.dimensions();
    message
        .write_string(&item.id.to_string())
        .write_string(&item.definition.sprite)
        .write_wired_int32(item.tile.x)
        .write_wired_int32(item.tile.y)
        .write_wired_int32(length)
        .write_wired_int32(width)
        .write_wired_int32(i32::from(item.rotation))
        .write_string(&format_height(item.z))
        .write_string(&item.definition.colour)
        .write_wired_int32(item.teleport_link.map_or(0, |link| link.0 as i32))
        .write_string(&item.extra_data);
}

pub fn active_objects<'a>(items: impl IntoIterator<Item = &'a RoomFurniture>) -> OutboundMessage {
    let items: Vec<&RoomFurniture> = items.into_iter().collect();
    let mut message = OutboundMessage::new(outgoing::ACTIVE_OBJECTS);
    message.write_wired_int32(items.len() as i32);
    for item in items {
        write_item(&mut message, item);
    }
    message
}

pub fn item_add(item: &RoomFurniture) -> OutboundMessage {
    let mut message = OutboundMessage::new(outgoing::ACTIVE_OBJECT_ADD);
    write_item(&mut message, item);
    message
}

pub fn item_update(item: &RoomFurniture) -> OutboundMessage {
    let mut message = OutboundMessage::new(outgoing::ACTIVE_OBJECT_UPDATE);
    write_item(&mut message, item);
    message
}

pub fn item_remove(id: ItemId) -> OutboundMessage {
    let mut message = OutboundMessage::new(outgoing::ACTIVE_OBJECT_REMOVE);
    message.write_string(&id.to_string());
    message
}

/// State-only change of an item's extra data.
pub fn stuff_data(item: &RoomFurniture) -> OutboundMessage {
    let mut message = OutboundMessage::new(outgoing::STUFF_DATA_UPDATE);
    message
        .write_string(&item.id.to_string())
        .write_string(&item.extra_data);
    message
}

/// Dice started rolling: the id alone.
pub fn dice_rolling(id: ItemId) -> OutboundMessage {
    let mut message = OutboundMessage::new(outgoing::DICE_VALUE);
    message.write_raw(&id.to_string());
    message
}

/// Dice settled. The client decodes the face as `code - id * 38`.
pub fn dice_value(id: ItemId, value: i32) -> OutboundMessage {
    let code = i64::from(id.0) * 38 + i64::from(value);
    let mut message = OutboundMessage::new(outgoing::DICE_VALUE);
    message.write_raw(&format!("{id} {code}"));
    message
}

pub fn chat(speaker: VirtualId, text: &str, mode: SpeechMode) -> OutboundMessage {
    let header = match mode {
        SpeechMode::Say => outgoing::CHAT,
        SpeechMode::Shout => outgoing::SHOUT,
        SpeechMode::Whisper => outgoing::WHISPER,
    };
    let mut message = OutboundMessage::new(header);
    message
        .write_wired_int32(speaker as i32)
        .write_string(text);
    message
}

pub fn logout(avatar: VirtualId) -> OutboundMessage {
    let mut message = OutboundMessage::new(outgoing::LOGOUT);
    message.write_raw(&avatar.to_string());
    message
}

pub fn cant_connect(code: i32) -> OutboundMessage {
    let mut message = OutboundMessage::new(outgoing::CANT_CONNECT);
    message.write_wired_int32(code);
    message
}

pub fn error(text: &str) -> OutboundMessage {
    let mut message = OutboundMessage::new(outgoing::ERROR);
    message.write_raw(text);
    message
}

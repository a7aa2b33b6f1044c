//! Packet handlers for the client protocol.
//!
//! Every handler is a small struct implementing [`PacketHandler`] that reads
//! its own fields from the wire and acts through the [`RoomManager`]. They
//! share one [`HandlerContext`] built at startup; nothing is looked up
//! through globals.

mod avatar;
mod chat;
pub mod composers;
mod furniture;
mod handshake;
mod login;
mod navigation;


use crate::connection::ConnectionManager;
use habitat_event_system::{
    DispatchError, EventSystem, Identity, PacketDispatcher, PacketHandler, SessionRef,
};
use habitat_protocol::headers::incoming;
use habitat_protocol::Charset;
use room_engine::{RoomManager, RoomState, VirtualId};
use std::sync::Arc;
use tracing::info;

/// Collaborators every handler may use.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub rooms: Arc<RoomManager>,
    pub connections: Arc<ConnectionManager>,
    pub events: Arc<EventSystem>,
    /// How fixed strings from clients are decoded.
    pub charset: Charset,
}

impl HandlerContext {
    /// Runs `f` on the session's avatar under its room's lock. `Ok(None)`
    /// when the session is not standing in a room.
    pub async fn with_avatar<R, F>(&self, session: &SessionRef, f: F) -> Result<Option<R>, DispatchError>
    where
        F: FnOnce(&mut RoomState, VirtualId, &Identity) -> R + Send,
        R: Send,
    {
        let identity = session.identity().ok_or(DispatchError::NotAuthenticated)?;
        let Some(room) = self.rooms.room_of(session) else {
            return Ok(None);
        };
        let mut state = room.lock().await;
        let Some(avatar) = state.find_session(session.id()) else {
            return Ok(None);
        };
        Ok(Some(f(&mut state, avatar, &identity)))
    }
}

/// Registers every built-in handler on `dispatcher`.
pub fn register_handlers(dispatcher: &PacketDispatcher, context: HandlerContext) {
    let handlers: Vec<(u16, Arc<dyn PacketHandler>)> = vec![
        (incoming::INIT_CRYPTO, Arc::new(handshake::InitCrypto)),
        (incoming::GENERATE_KEY, Arc::new(handshake::GenerateKey)),
        (incoming::PONG, Arc::new(handshake::Pong)),
        (incoming::TRY_LOGIN, Arc::new(login::TryLogin(context.clone()))),
        (incoming::SSO, Arc::new(login::SsoLogin(context.clone()))),
        (incoming::GET_INFO, Arc::new(login::GetInfo)),
        (incoming::GOTO_FLAT, Arc::new(navigation::GotoFlat(context.clone()))),
        (incoming::QUIT, Arc::new(navigation::Quit(context.clone()))),
        (
            incoming::G_HMAP,
            Arc::new(navigation::RoomSnapshot::new(context.clone(), navigation::SnapshotPart::Heightmap)),
        ),
        (
            incoming::G_USRS,
            Arc::new(navigation::RoomSnapshot::new(context.clone(), navigation::SnapshotPart::Users)),
        ),
        (
            incoming::G_OBJS,
            Arc::new(navigation::RoomSnapshot::new(context.clone(), navigation::SnapshotPart::Objects)),
        ),
        (
            incoming::G_STAT,
            Arc::new(navigation::RoomSnapshot::new(context.clone(), navigation::SnapshotPart::Statuses)),
        ),
        (incoming::MOVE, Arc::new(avatar::Walk(context.clone()))),
        (incoming::STOP, Arc::new(avatar::Stop(context.clone()))),
        (incoming::LOOK_TO, Arc::new(avatar::LookTo(context.clone()))),
        (incoming::WAVE, Arc::new(avatar::Wave(context.clone()))),
        (incoming::DANCE, Arc::new(avatar::Dance(context.clone()))),
        (incoming::CHAT, Arc::new(chat::Talk::say(context.clone()))),
        (incoming::SHOUT, Arc::new(chat::Talk::shout(context.clone()))),
        (incoming::WHISPER, Arc::new(chat::Whisper(context.clone()))),
        (incoming::USE_FURNITURE, Arc::new(furniture::UseFurniture(context.clone()))),
        (incoming::THROW_DICE, Arc::new(furniture::Dice::throw(context.clone()))),
        (incoming::DICE_OFF, Arc::new(furniture::Dice::switch_off(context.clone()))),
        (incoming::PLACE_ITEM, Arc::new(furniture::PlaceItem(context.clone()))),
        (incoming::MOVE_ITEM, Arc::new(furniture::MoveItem(context.clone()))),
        (incoming::PICKUP_ITEM, Arc::new(furniture::PickupItem(context))),
    ];

    let count = handlers.len();
    for (header, handler) in handlers {
        dispatcher.register(header, handler);
    }
    info!("🧩 Registered {} packet handlers", count);
}

/// Parses a bare decimal body such as `"59"` or `" 12 "`.
pub(crate) fn parse_id(text: &str) -> Option<u32> {
    text.trim().parse().ok()
}

/// Splits a body of space separated integers.
pub(crate) fn parse_ints(text: &str) -> Vec<i32> {
    text.split_whitespace()
        .map_while(|part| part.parse().ok())
        .collect()
}

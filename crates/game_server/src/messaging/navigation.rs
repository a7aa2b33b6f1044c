use async_trait::async_trait;
use super::{parse_id, HandlerContext};
use habitat_event_system::{
    DispatchError, PacketFields, PacketHandler, RoomId, SessionRef,
};
use habitat_protocol::{Charset, InboundMessage};
use room_engine::composers;
use tracing::debug;

/// Enters a room. The body is the room id in decimal.
#[derive(Debug)]
pub struct GotoFlat(pub HandlerContext);

#[async_trait]
impl PacketHandler for GotoFlat {
    fn name(&self) -> &'static str {
        "GOTO_FLAT"
    }

    fn preview(&self, message: &mut InboundMessage) -> PacketFields {
        let room = parse_id(&message.read_remaining_string(Charset::Latin1)).unwrap_or(0);
        PacketFields::default().with("room_id", room)
    }

    async fn handle(&self, session: &SessionRef, message: &mut InboundMessage) -> Result<(), DispatchError> {
        let Some(id) = parse_id(&message.read_remaining_string(Charset::Latin1)) else {
            return Ok(());
        };
        if let Err(e) = self.0.rooms.enter_room(session, RoomId(id)).await {
            debug!("🚫 {} could not enter room {}: {}", session.id(), id, e);
            session.send(&composers::cant_connect(e.client_code()));
        }
        Ok(())
    }
}

/// Leaves the current room.
#[derive(Debug)]
pub struct Quit(pub HandlerContext);

#[async_trait]
impl PacketHandler for Quit {
    fn name(&self) -> &'static str {
        "QUIT"
    }

    async fn handle(&self, session: &SessionRef, _message: &mut InboundMessage) -> Result<(), DispatchError> {
        self.0.rooms.leave_room(session).await;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPart {
    Heightmap,
    Users,
    Objects,
    Statuses,
}

/// Re-sends one part of the room snapshot to the requesting client.
#[derive(Debug)]
pub struct RoomSnapshot {
    context: HandlerContext,
    part: SnapshotPart,
}

impl RoomSnapshot {
    pub fn new(context: HandlerContext, part: SnapshotPart) -> Self {
        Self { context, part }
    }
}

#[async_trait]
impl PacketHandler for RoomSnapshot {
    fn name(&self) -> &'static str {
        match self.part {
            SnapshotPart::Heightmap => "G_HMAP",
            SnapshotPart::Users => "G_USRS",
            SnapshotPart::Objects => "G_OBJS",
            SnapshotPart::Statuses => "G_STAT",
        }
    }

    async fn handle(&self, session: &SessionRef, _message: &mut InboundMessage) -> Result<(), DispatchError> {
        let part = self.part;
        let session_ref = session.clone();
        self.context
            .with_avatar(session, move |state, _, _| {
                let message = match part {
                    SnapshotPart::Heightmap => composers::heightmap(state.model()),
                    SnapshotPart::Users => composers::users(state.avatars()),
                    SnapshotPart::Objects => composers::active_objects(state.furniture()),
                    SnapshotPart::Statuses => composers::status(state.avatars()),
                };
                session_ref.send(&message);
            })
            .await?;
        Ok(())
    }
}

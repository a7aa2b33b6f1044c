use async_trait::async_trait;
use super::{parse_ints, HandlerContext};
use habitat_event_system::{DispatchError, PacketFields, PacketHandler, SessionRef};
use habitat_protocol::{Charset, InboundMessage};
use room_engine::room::{STATUS_CARRY, STATUS_DANCE, STATUS_LAY, STATUS_SIT, STATUS_WAVE};
use room_engine::room::WAVE_TICKS;
use room_engine::Tile;

/// Walk request: two base64 shorts, x then y.
#[derive(Debug)]
pub struct Walk(pub HandlerContext);

#[async_trait]
impl PacketHandler for Walk {
    fn name(&self) -> &'static str {
        "MOVE"
    }

    fn preview(&self, message: &mut InboundMessage) -> PacketFields {
        PacketFields::default()
            .with("x", message.read_b64_short())
            .with("y", message.read_b64_short())
    }

    async fn handle(&self, session: &SessionRef, message: &mut InboundMessage) -> Result<(), DispatchError> {
        let x = i32::from(message.read_b64_short());
        let y = i32::from(message.read_b64_short());
        self.0
            .with_avatar(session, move |state, avatar, _| {
                state.walk_to(avatar, Tile::new(x, y));
            })
            .await?;
        Ok(())
    }
}

/// Stops an activity named in the body, or walking when none is named.
#[derive(Debug)]
pub struct Stop(pub HandlerContext);

#[async_trait]
impl PacketHandler for Stop {
    fn name(&self) -> &'static str {
        "STOP"
    }

    async fn handle(&self, session: &SessionRef, message: &mut InboundMessage) -> Result<(), DispatchError> {
        let what = message.read_remaining_string(Charset::Latin1);
        self.0
            .with_avatar(session, move |state, avatar, _| {
                let Some(avatar) = state.avatar_mut(avatar) else {
                    return;
                };
                match what.trim() {
                    "Dance" => {
                        avatar.remove_status(STATUS_DANCE);
                    }
                    "CarryItem" | "CarryDrink" => {
                        avatar.remove_status(STATUS_CARRY);
                    }
                    _ => avatar.stop_walking(),
                }
            })
            .await?;
        Ok(())
    }
}

/// Turns towards a tile given as `"x y"`.
#[derive(Debug)]
pub struct LookTo(pub HandlerContext);

#[async_trait]
impl PacketHandler for LookTo {
    fn name(&self) -> &'static str {
        "LOOK_TO"
    }

    async fn handle(&self, session: &SessionRef, message: &mut InboundMessage) -> Result<(), DispatchError> {
        let coordinates = parse_ints(&message.read_remaining_string(Charset::Latin1));
        let [x, y] = coordinates[..] else {
            return Ok(());
        };
        self.0
            .with_avatar(session, move |state, avatar, _| {
                state.look_to(avatar, Tile::new(x, y));
            })
            .await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct Wave(pub HandlerContext);

#[async_trait]
impl PacketHandler for Wave {
    fn name(&self) -> &'static str {
        "WAVE"
    }

    async fn handle(&self, session: &SessionRef, _message: &mut InboundMessage) -> Result<(), DispatchError> {
        self.0
            .with_avatar(session, |state, avatar, _| {
                let expires = state.tick_count() + WAVE_TICKS;
                if let Some(avatar) = state.avatar_mut(avatar) {
                    avatar.remove_status(STATUS_DANCE);
                    avatar.set_status(STATUS_WAVE, "", Some(expires));
                }
            })
            .await?;
        Ok(())
    }
}

/// Starts dancing. An optional body selects the style.
#[derive(Debug)]
pub struct Dance(pub HandlerContext);

#[async_trait]
impl PacketHandler for Dance {
    fn name(&self) -> &'static str {
        "DANCE"
    }

    async fn handle(&self, session: &SessionRef, message: &mut InboundMessage) -> Result<(), DispatchError> {
        let style = match parse_ints(&message.read_remaining_string(Charset::Latin1))[..] {
            [style, ..] if (1..=4).contains(&style) => style.to_string(),
            _ => String::new(),
        };
        self.0
            .with_avatar(session, move |state, avatar, _| {
                let Some(avatar) = state.avatar_mut(avatar) else {
                    return;
                };
                if avatar.has_status(STATUS_SIT) || avatar.has_status(STATUS_LAY) {
                    return;
                }
                avatar.remove_status(STATUS_CARRY);
                avatar.set_status(STATUS_DANCE, style, None);
            })
            .await?;
        Ok(())
    }
}

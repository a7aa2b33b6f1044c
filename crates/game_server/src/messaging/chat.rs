use async_trait::async_trait;
use super::HandlerContext;
use habitat_event_system::{DispatchError, PacketFields, PacketHandler, SessionRef};
use habitat_protocol::InboundMessage;
use room_engine::SpeechMode;

/// Room chat. One handler type serves both CHAT and SHOUT.
#[derive(Debug)]
pub struct Talk {
    context: HandlerContext,
    mode: SpeechMode,
}

impl Talk {
    pub fn say(context: HandlerContext) -> Self {
        Self { context, mode: SpeechMode::Say }
    }

    pub fn shout(context: HandlerContext) -> Self {
        Self { context, mode: SpeechMode::Shout }
    }
}

#[async_trait]
impl PacketHandler for Talk {
    fn name(&self) -> &'static str {
        match self.mode {
            SpeechMode::Shout => "SHOUT",
            _ => "CHAT",
        }
    }

    fn preview(&self, message: &mut InboundMessage) -> PacketFields {
        PacketFields::default().with("message", message.read_fixed_string(self.context.charset))
    }

    async fn handle(&self, session: &SessionRef, message: &mut InboundMessage) -> Result<(), DispatchError> {
        let raw = message.read_fixed_string(self.context.charset);
        let text = self.context.rooms.text_filter().filter(&raw);
        if text.is_empty() {
            return Ok(());
        }
        let mode = self.mode;
        self.context
            .with_avatar(session, move |state, avatar, _| state.talk(avatar, &text, mode))
            .await?;
        Ok(())
    }
}

/// `"<target> <message>"` in one fixed string.
#[derive(Debug)]
pub struct Whisper(pub HandlerContext);

#[async_trait]
impl PacketHandler for Whisper {
    fn name(&self) -> &'static str {
        "WHISPER"
    }

    fn preview(&self, message: &mut InboundMessage) -> PacketFields {
        let body = message.read_fixed_string(self.0.charset);
        let target = body.split_once(' ').map_or(body.as_str(), |(target, _)| target);
        PacketFields::default().with("target", target)
    }

    async fn handle(&self, session: &SessionRef, message: &mut InboundMessage) -> Result<(), DispatchError> {
        let body = message.read_fixed_string(self.0.charset);
        let Some((target, raw)) = body.split_once(' ') else {
            return Ok(());
        };
        let text = self.0.rooms.text_filter().filter(raw);
        if target.is_empty() || text.is_empty() {
            return Ok(());
        }
        let target = target.to_owned();
        self.0
            .with_avatar(session, move |state, avatar, _| state.whisper(avatar, &target, &text))
            .await?;
        Ok(())
    }
}

use super::avatar::VirtualId;
use super::RoomState;
use crate::bots::{self, SpeechMode};
use crate::composers;

impl RoomState {
    /// Says or shouts `text` to the room and lets bots react.
    pub fn talk(&mut self, speaker: VirtualId, text: &str, mode: SpeechMode) {
        let Some(avatar) = self.avatars.get(&speaker) else {
            return;
        };
        let from_user = !avatar.is_bot();
        self.broadcast(&composers::chat(speaker, text, mode));

        if !from_user {
            return;
        }
        let bot_ids: Vec<VirtualId> = self.bots.keys().copied().collect();
        for bot in bot_ids {
            match mode {
                SpeechMode::Shout => bots::on_user_shout(self, bot, speaker, text),
                SpeechMode::Say | SpeechMode::Whisper => bots::on_user_say(self, bot, speaker, text),
            };
        }
    }

    /// Whispers to the avatar named `target`. The speaker sees their own
    /// whisper; nobody else does. Returns whether the target was found.
    pub fn whisper(&mut self, speaker: VirtualId, target: &str, text: &str) -> bool {
        let Some(recipient) = self
            .avatars
            .values()
            .find(|avatar| !avatar.is_bot() && avatar.name.eq_ignore_ascii_case(target))
            .map(|avatar| avatar.virtual_id)
        else {
            return false;
        };
        let message = composers::chat(speaker, text, SpeechMode::Whisper);
        self.send_to(speaker, &message);
        if recipient != speaker {
            self.send_to(recipient, &message);
        }
        true
    }
}

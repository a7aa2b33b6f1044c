//! Room bots.
//!
//! A bot is an avatar slot with no session, driven by the same tick as the
//! furniture. Its live state is two countdowns, one for unprompted speech
//! and one for wandering, each reseeded from a range picked by the bot's
//! [`BotBehavior`] when it reaches zero. Reactions to users only fire within
//! the room's reaction radius, except for shouts.


use crate::composers;
use crate::geometry::Tile;
use crate::persistence::{BotDefinition, BotResponse};
use crate::room::{RoomState, VirtualId, CARRY_TICKS, STATUS_CARRY};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotBehavior {
    /// Stands still and talks now and then.
    #[default]
    Static,
    /// Roams its walk area.
    Wanderer,
    /// Paces behind the bar and serves drinks on request.
    Bartender,
    /// Stands still and talks often.
    Guide,
}

impl BotBehavior {
    /// Ticks between unprompted lines.
    pub fn speech_ticks(self) -> RangeInclusive<u32> {
        match self {
            BotBehavior::Static => 30..=60,
            BotBehavior::Wanderer => 40..=80,
            BotBehavior::Bartender => 60..=120,
            BotBehavior::Guide => 20..=40,
        }
    }

    /// Ticks between walks, `None` for bots that never move.
    pub fn move_ticks(self) -> Option<RangeInclusive<u32>> {
        match self {
            BotBehavior::Wanderer => Some(6..=16),
            BotBehavior::Bartender => Some(20..=40),
            BotBehavior::Static | BotBehavior::Guide => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechMode {
    #[default]
    Say,
    Shout,
    Whisper,
}

/// Tiles a bot with no walk area may stray from its spawn.
const WANDER_RADIUS: i32 = 3;

#[derive(Debug, Clone)]
pub struct BotRuntime {
    definition: Arc<BotDefinition>,
    speech_countdown: u32,
    move_countdown: u32,
    /// User the bot last answered.
    focus: Option<VirtualId>,
}

impl BotRuntime {
    pub fn new<R: Rng>(definition: Arc<BotDefinition>, rng: &mut R) -> Self {
        let behavior = definition.behavior;
        Self {
            speech_countdown: rng.gen_range(behavior.speech_ticks()),
            move_countdown: behavior
                .move_ticks()
                .map_or(0, |range| rng.gen_range(range)),
            definition,
            focus: None,
        }
    }

    pub fn definition(&self) -> &Arc<BotDefinition> {
        &self.definition
    }

    pub fn focus(&self) -> Option<VirtualId> {
        self.focus
    }

    /// Counts both timers down; returns which of them fired.
    fn advance<R: Rng>(&mut self, rng: &mut R) -> (bool, bool) {
        let behavior = self.definition.behavior;

        self.speech_countdown = self.speech_countdown.saturating_sub(1);
        let speak = self.speech_countdown == 0;
        if speak {
            self.speech_countdown = rng.gen_range(behavior.speech_ticks());
        }

        let walk = match behavior.move_ticks() {
            Some(range) => {
                self.move_countdown = self.move_countdown.saturating_sub(1);
                let due = self.move_countdown == 0;
                if due {
                    self.move_countdown = rng.gen_range(range);
                }
                due
            }
            None => false,
        };
        (speak, walk)
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// First response with a keyword matching whole words of `text`,
/// case-insensitively. Multi-word keywords match as a phrase.
pub fn match_response<'a>(responses: &'a [BotResponse], text: &str) -> Option<&'a BotResponse> {
    let spoken = words(text);
    responses.iter().find(|response| {
        response.keywords.iter().any(|keyword| {
            let wanted = words(keyword);
            !wanted.is_empty() && spoken.windows(wanted.len()).any(|window| window == wanted.as_slice())
        })
    })
}

fn personalize(text: &str, name: &str) -> String {
    text.replace("%name%", name)
}

/// Bot speech. Whispers only reach `target`.
fn speak(room: &RoomState, bot: VirtualId, text: &str, mode: SpeechMode, target: Option<VirtualId>) {
    let message = composers::chat(bot, text, mode);
    match (mode, target) {
        (SpeechMode::Whisper, Some(target)) => {
            room.send_to(target, &message);
        }
        (SpeechMode::Whisper, None) => {}
        _ => room.broadcast(&message),
    }
}

fn within_radius(room: &RoomState, bot: VirtualId, user: VirtualId) -> bool {
    match (room.avatar(bot), room.avatar(user)) {
        (Some(bot), Some(user)) => {
            bot.tile.distance(user.tile) <= f64::from(room.settings.reaction_radius)
        }
        _ => false,
    }
}

pub fn on_self_enter(room: &mut RoomState, bot: VirtualId) {
    if let Some(runtime) = room.bots.get(&bot) {
        trace!(
            "🤖 Bot {} ({:?}) spawned in room {} as #{}",
            runtime.definition.name,
            runtime.definition.behavior,
            room.id(),
            bot
        );
    }
}

pub fn on_self_leave(room: &mut RoomState, bot: VirtualId) {
    if let Some(runtime) = room.bots.get_mut(&bot) {
        runtime.focus = None;
        trace!("🤖 Bot {} leaving room {}", runtime.definition.name, room.data.id);
    }
}

pub fn on_user_enter(room: &mut RoomState, bot: VirtualId, user: VirtualId) {
    let Some(greeting) = room
        .bots
        .get(&bot)
        .and_then(|runtime| runtime.definition.greeting.clone())
    else {
        return;
    };
    if !within_radius(room, bot, user) {
        return;
    }
    let Some((name, tile)) = room.avatar(user).map(|a| (a.name.clone(), a.tile)) else {
        return;
    };
    room.look_to(bot, tile);
    speak(room, bot, &personalize(&greeting, &name), SpeechMode::Say, None);
}

pub fn on_user_leave(room: &mut RoomState, bot: VirtualId, user: VirtualId) {
    let Some(runtime) = room.bots.get_mut(&bot) else {
        return;
    };
    if runtime.focus != Some(user) {
        return;
    }
    runtime.focus = None;
    let rotation = runtime.definition.rotation;
    if let Some(avatar) = room.avatars.get_mut(&bot) {
        if !avatar.is_walking() {
            avatar.set_rotation(rotation);
        }
    }
}

/// Reacts to normal chat. Returns whether the bot answered.
pub fn on_user_say(room: &mut RoomState, bot: VirtualId, user: VirtualId, text: &str) -> bool {
    within_radius(room, bot, user) && respond(room, bot, user, text)
}

/// Shouts carry across the whole room.
pub fn on_user_shout(room: &mut RoomState, bot: VirtualId, user: VirtualId, text: &str) -> bool {
    respond(room, bot, user, text)
}

fn respond(room: &mut RoomState, bot: VirtualId, user: VirtualId, text: &str) -> bool {
    let Some(definition) = room.bots.get(&bot).map(|runtime| runtime.definition.clone()) else {
        return false;
    };
    let Some(response) = match_response(&definition.responses, text) else {
        return false;
    };
    let Some((name, tile)) = room.avatar(user).map(|a| (a.name.clone(), a.tile)) else {
        return false;
    };

    room.look_to(bot, tile);
    speak(room, bot, &personalize(&response.reply, &name), response.mode, Some(user));

    if let Some(item) = &response.serve_item {
        let expires = room.tick_count + CARRY_TICKS;
        if let Some(avatar) = room.avatars.get_mut(&user) {
            avatar.set_status(STATUS_CARRY, item.clone(), Some(expires));
        }
    }
    if let Some(runtime) = room.bots.get_mut(&bot) {
        runtime.focus = Some(user);
    }
    true
}

pub fn on_timer_tick(room: &mut RoomState, bot: VirtualId) {
    let Some(runtime) = room.bots.get_mut(&bot) else {
        return;
    };
    let (speak_now, walk_now) = runtime.advance(&mut room.rng);
    let definition = runtime.definition.clone();

    if speak_now {
        if let Some(line) = definition.speeches.choose(&mut room.rng) {
            speak(room, bot, line, SpeechMode::Say, None);
        }
    }

    if walk_now {
        let target = if definition.walk_area.is_empty() {
            let spawn = Tile::new(definition.x, definition.y);
            Tile::new(
                spawn.x + room.rng.gen_range(-WANDER_RADIUS..=WANDER_RADIUS),
                spawn.y + room.rng.gen_range(-WANDER_RADIUS..=WANDER_RADIUS),
            )
        } else {
            match definition.walk_area.choose(&mut room.rng) {
                Some(tile) => *tile,
                None => return,
            }
        };
        if room.can_enter(target, Some(bot)) {
            room.walk_to(bot, target);
        }
    }
}

//! Header ids understood by the legacy client.

/// Client to server.
pub mod incoming {
    pub const TRY_LOGIN: u16 = 4;
    pub const GET_INFO: u16 = 7;
    pub const GOTO_FLAT: u16 = 59;
    pub const G_HMAP: u16 = 60;
    pub const G_USRS: u16 = 61;
    pub const G_OBJS: u16 = 62;
    pub const G_STAT: u16 = 64;
    pub const CHAT: u16 = 52;
    pub const QUIT: u16 = 53;
    pub const SHOUT: u16 = 55;
    pub const WHISPER: u16 = 56;
    pub const PICKUP_ITEM: u16 = 67;
    pub const MOVE_ITEM: u16 = 73;
    pub const PLACE_ITEM: u16 = 90;
    pub const MOVE: u16 = 75;
    pub const THROW_DICE: u16 = 76;
    pub const DICE_OFF: u16 = 77;
    pub const LOOK_TO: u16 = 79;
    pub const STOP: u16 = 88;
    pub const DANCE: u16 = 93;
    pub const WAVE: u16 = 94;
    pub const PONG: u16 = 196;
    pub const SSO: u16 = 204;
    pub const INIT_CRYPTO: u16 = 206;
    pub const GENERATE_KEY: u16 = 202;
    pub const USE_FURNITURE: u16 = 392;
}

/// Server to client.
pub mod outgoing {
    pub const HELLO: u16 = 0;
    pub const LOGIN_OK: u16 = 3;
    pub const USER_OBJECT: u16 = 5;
    pub const CHAT: u16 = 24;
    pub const WHISPER: u16 = 25;
    pub const SHOUT: u16 = 26;
    pub const USERS: u16 = 28;
    pub const LOGOUT: u16 = 29;
    pub const ACTIVE_OBJECTS: u16 = 32;
    pub const HEIGHTMAP: u16 = 31;
    pub const ERROR: u16 = 33;
    pub const STATUS: u16 = 34;
    pub const FLAT_LETIN: u16 = 41;
    pub const PING: u16 = 50;
    pub const ROOM_READY: u16 = 69;
    pub const STUFF_DATA_UPDATE: u16 = 88;
    pub const DICE_VALUE: u16 = 90;
    pub const ACTIVE_OBJECT_ADD: u16 = 93;
    pub const ACTIVE_OBJECT_REMOVE: u16 = 94;
    pub const ACTIVE_OBJECT_UPDATE: u16 = 95;
    pub const CANT_CONNECT: u16 = 224;
    pub const SESSION_PARAMETERS: u16 = 257;
    pub const CRYPTO_PARAMETERS: u16 = 277;
}

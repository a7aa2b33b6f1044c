//! Session-level outgoing packets. Room packets live in
//! `room_engine::composers`.

use habitat_event_system::Identity;
use habitat_protocol::headers::outgoing;
use habitat_protocol::OutboundMessage;

pub fn hello() -> OutboundMessage {
    OutboundMessage::new(outgoing::HELLO)
}

/// Tells the client the stream stays unencrypted.
pub fn crypto_parameters() -> OutboundMessage {
    let mut message = OutboundMessage::new(outgoing::CRYPTO_PARAMETERS);
    message.write_wired_int32(0);
    message
}

/// No session parameters are negotiated.
pub fn session_parameters() -> OutboundMessage {
    let mut message = OutboundMessage::new(outgoing::SESSION_PARAMETERS);
    message.write_wired_int32(0);
    message
}

pub fn login_ok() -> OutboundMessage {
    OutboundMessage::new(outgoing::LOGIN_OK)
}

pub fn user_object(identity: &Identity) -> OutboundMessage {
    let mut message = OutboundMessage::new(outgoing::USER_OBJECT);
    message.write_raw(&format!(
        "user_id={}\rname={}\rfigure={}\rsex={}\rcustomData={}\rrank={}\r",
        identity.user_id,
        identity.username,
        identity.figure,
        identity.sex,
        identity.motto,
        identity.rank
    ));
    message
}

pub fn ping() -> OutboundMessage {
    OutboundMessage::new(outgoing::PING)
}

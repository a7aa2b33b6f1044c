//! # Habitat Protocol
//!
//! Codec for the legacy client protocol. Two field encodings share every
//! message:
//!
//! * **fixed**: base64-digit numbers and length-prefixed strings, see
//!   [`base64`] and [`InboundMessage::read_fixed_string`]
//! * **wired**: the VL64 variable-length integers and sentinel booleans,
//!   see [`vl64`]
//!
//! Reads never fail. A body that is too short for the requested field yields
//! the field's zero value and leaves the cursor untouched, so a malformed
//! packet degrades to a no-op instead of tearing down a shared task.

pub mod base64;
pub mod frame;
pub mod headers;
pub mod vl64;

mod inbound;
mod outbound;

#[cfg(test)]
mod tests;

pub use frame::{encode_client_frame, FrameDecoder, FrameReader};
pub use inbound::InboundMessage;
pub use outbound::{OutboundMessage, FRAME_END, MAX_FIXED_LEN, STRING_END};

/// Character set used to turn fixed string bytes into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    /// UTF-8 with lossy replacement of invalid sequences.
    #[default]
    Utf8,
    /// One byte per character, as the oldest clients send.
    Latin1,
}

impl Charset {
    /// Decodes `raw`, replacing control bytes with spaces first.
    pub fn decode_normalized(self, raw: &[u8]) -> String {
        let cleaned: Vec<u8> = raw
            .iter()
            .map(|&b| if b < 0x20 || b == 0x7f { b' ' } else { b })
            .collect();
        match self {
            Charset::Utf8 => String::from_utf8_lossy(&cleaned).into_owned(),
            Charset::Latin1 => cleaned.iter().map(|&b| char::from(b)).collect(),
        }
    }

    /// Encodes text. Characters outside Latin-1 become `?`.
    pub fn encode(self, value: &str) -> Vec<u8> {
        match self {
            Charset::Utf8 => value.as_bytes().to_vec(),
            Charset::Latin1 => value
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        }
    }
}

/// Errors raised while framing a client stream. Field decoding itself never
/// errors.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("Stream ended in the middle of a frame")]
    UnexpectedEof,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! Append-only message builder tagged with its header id.

use crate::{base64, vl64, Charset};
use bytes::{BufMut, Bytes, BytesMut};

/// Terminates every server to client frame.
pub const FRAME_END: u8 = 0x01;
/// Terminates a legacy text field.
pub const STRING_END: u8 = 0x02;

/// Longest fixed string body a two-digit length can describe.
pub const MAX_FIXED_LEN: usize = 4095;

#[derive(Debug, Clone)]
pub struct OutboundMessage {
    header: u16,
    body: BytesMut,
}

impl OutboundMessage {
    pub fn new(header: u16) -> Self {
        Self {
            header,
            body: BytesMut::with_capacity(64),
        }
    }

    pub fn header(&self) -> u16 {
        self.header
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn write_b64_short(&mut self, value: u16) -> &mut Self {
        base64::encode_into(&mut self.body, u32::from(value), 2);
        self
    }

    /// Length-prefixed string. Bodies longer than [`MAX_FIXED_LEN`] bytes are
    /// cut at the last character boundary that fits.
    pub fn write_fixed_string(&mut self, value: &str, charset: Charset) -> &mut Self {
        let mut encoded = charset.encode(value);
        if encoded.len() > MAX_FIXED_LEN {
            let mut cut = MAX_FIXED_LEN;
            if charset == Charset::Utf8 {
                while cut > 0 && !value.is_char_boundary(cut) {
                    cut -= 1;
                }
            }
            encoded.truncate(cut);
        }
        base64::encode_into(&mut self.body, encoded.len() as u32, 2);
        self.body.put_slice(&encoded);
        self
    }

    pub fn write_fixed_int32(&mut self, value: i32) -> &mut Self {
        self.write_fixed_string(&value.to_string(), Charset::Latin1)
    }

    pub fn write_wired_int32(&mut self, value: i32) -> &mut Self {
        vl64::encode_i32(&mut self.body, value);
        self
    }

    pub fn write_wired_uint32(&mut self, value: u32) -> &mut Self {
        vl64::encode_u32(&mut self.body, value);
        self
    }

    pub fn write_wired_bool(&mut self, value: bool) -> &mut Self {
        self.body.put_u8(if value {
            vl64::TRUE_BYTE
        } else {
            vl64::FALSE_BYTE
        });
        self
    }

    /// Legacy text field terminated by `0x02`.
    pub fn write_string(&mut self, value: &str) -> &mut Self {
        self.body.put_slice(value.as_bytes());
        self.body.put_u8(STRING_END);
        self
    }

    /// Unterminated text, for the line-based room formats.
    pub fn write_raw(&mut self, value: &str) -> &mut Self {
        self.body.put_slice(value.as_bytes());
        self
    }

    pub fn write_bytes(&mut self, value: &[u8]) -> &mut Self {
        self.body.put_slice(value);
        self
    }

    /// Full wire frame: header digits, body, terminator.
    pub fn encode(&self) -> Bytes {
        let mut frame = BytesMut::with_capacity(self.body.len() + 3);
        base64::encode_into(&mut frame, u32::from(self.header), 2);
        frame.put_slice(&self.body);
        frame.put_u8(FRAME_END);
        frame.freeze()
    }
}

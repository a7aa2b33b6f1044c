//! Cursor over a decoded client message body.
//!
//! Every read degrades to the type's zero value when the body is too short
//! and leaves the cursor where it was. A malformed packet can therefore never
//! panic the task that is decoding it.

use crate::{base64, vl64, Charset};
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    header: u16,
    body: Bytes,
    cursor: usize,
}

impl InboundMessage {
    pub fn new(header: u16, body: Bytes) -> Self {
        Self {
            header,
            body,
            cursor: 0,
        }
    }

    /// Splits a frame payload into its two-digit header and body. Returns
    /// `None` for payloads too short to carry a header.
    pub fn from_payload(payload: Bytes) -> Option<Self> {
        if payload.len() < 2 {
            return None;
        }
        let header = base64::decode(&payload[..2]) as u16;
        Some(Self::new(header, payload.slice(2..)))
    }

    pub fn header(&self) -> u16 {
        self.header
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Moves the cursor back to the first body byte.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.body.len() - self.cursor
    }

    fn rest(&self) -> &[u8] {
        &self.body[self.cursor..]
    }

    /// Raw two-digit base64 number, as used by coordinate packets.
    pub fn read_b64_short(&mut self) -> u16 {
        if self.remaining() < 2 {
            return 0;
        }
        let value = base64::decode(&self.rest()[..2]) as u16;
        self.cursor += 2;
        value
    }

    fn read_fixed_bytes(&mut self) -> Option<Bytes> {
        if self.remaining() < 2 {
            return None;
        }
        let len = base64::decode(&self.rest()[..2]) as usize;
        if self.remaining() < 2 + len {
            return None;
        }
        let start = self.cursor + 2;
        self.cursor = start + len;
        Some(self.body.slice(start..start + len))
    }

    /// Length-prefixed string. Control bytes are normalized to spaces so
    /// they can never reach chat or furniture state.
    pub fn read_fixed_string(&mut self, charset: Charset) -> String {
        match self.read_fixed_bytes() {
            Some(raw) => charset.decode_normalized(&raw),
            None => String::new(),
        }
    }

    /// Decimal integer carried inside a fixed string; 0 when unparsable.
    pub fn read_fixed_int32(&mut self) -> i32 {
        self.read_fixed_string(Charset::Latin1)
            .trim()
            .parse()
            .unwrap_or(0)
    }

    /// VL64 integer with the number of bytes it took; `(0, 0)` when the
    /// body ends mid-number.
    pub fn read_wired_int32(&mut self) -> (i32, usize) {
        match vl64::decode_i32(self.rest()) {
            Some((value, consumed)) => {
                self.cursor += consumed;
                (value, consumed)
            }
            None => (0, 0),
        }
    }

    pub fn read_wired_uint32(&mut self) -> (u32, usize) {
        match vl64::decode_u32(self.rest()) {
            Some((value, consumed)) => {
                self.cursor += consumed;
                (value, consumed)
            }
            None => (0, 0),
        }
    }

    pub fn read_wired_bool(&mut self) -> bool {
        match self.rest().first() {
            Some(&b) => {
                self.cursor += 1;
                b == vl64::TRUE_BYTE
            }
            None => false,
        }
    }

    /// Everything after the cursor, decoded as text. Used by the older
    /// packets that send a bare string body.
    pub fn read_remaining_string(&mut self, charset: Charset) -> String {
        let raw = self.body.slice(self.cursor..);
        self.cursor = self.body.len();
        charset.decode_normalized(&raw)
    }
}

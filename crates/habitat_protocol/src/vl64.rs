//! VL64, the "wired" variable-length integer encoding.
//!
//! The first byte holds the two low magnitude bits, the sign flag (`0x04`)
//! and the total byte count in bits 3..6. Every following byte carries six
//! more magnitude bits, least significant first. All bytes are offset by
//! `0x40` so the encoding stays printable.

use bytes::BufMut;

/// Longest possible encoding: 2 + 5 * 6 = 32 magnitude bits.
pub const MAX_BYTES: usize = 6;

const OFFSET: u8 = 0x40;
const SIGN_BIT: u8 = 0x04;

/// Wired boolean sentinels.
pub const TRUE_BYTE: u8 = b'I';
pub const FALSE_BYTE: u8 = b'H';

fn encode_magnitude<B: BufMut>(buf: &mut B, magnitude: u64, negative: bool) {
    let mut out = [0u8; MAX_BYTES];
    out[0] = OFFSET | (magnitude & 0x03) as u8;
    let mut rest = magnitude >> 2;
    let mut count = 1;
    while rest != 0 && count < MAX_BYTES {
        out[count] = OFFSET | (rest & 0x3f) as u8;
        rest >>= 6;
        count += 1;
    }
    out[0] |= (count as u8) << 3;
    if negative {
        out[0] |= SIGN_BIT;
    }
    buf.put_slice(&out[..count]);
}

pub fn encode_i32<B: BufMut>(buf: &mut B, value: i32) {
    encode_magnitude(buf, u64::from(value.unsigned_abs()), value < 0);
}

pub fn encode_u32<B: BufMut>(buf: &mut B, value: u32) {
    encode_magnitude(buf, u64::from(value), false);
}

/// Sign, magnitude and consumed byte count of the leading VL64 number, or
/// `None` when the declared length is invalid or runs past the input.
fn decode_magnitude(input: &[u8]) -> Option<(bool, u64, usize)> {
    let first = *input.first()?;
    let count = usize::from((first >> 3) & 0x07);
    if count == 0 || count > MAX_BYTES || input.len() < count {
        return None;
    }

    let mut magnitude = u64::from(first & 0x03);
    let mut shift = 2;
    for &b in &input[1..count] {
        magnitude |= u64::from(b & 0x3f) << shift;
        shift += 6;
    }
    Some((first & SIGN_BIT != 0, magnitude, count))
}

/// Decodes a signed value and reports how many bytes it occupied.
pub fn decode_i32(input: &[u8]) -> Option<(i32, usize)> {
    let (negative, magnitude, count) = decode_magnitude(input)?;
    let signed = if negative {
        -(magnitude as i64)
    } else {
        magnitude as i64
    };
    Some((signed as i32, count))
}

/// Decodes an unsigned value. A negative encoding decodes to zero but still
/// reports its length so the cursor stays aligned.
pub fn decode_u32(input: &[u8]) -> Option<(u32, usize)> {
    let (negative, magnitude, count) = decode_magnitude(input)?;
    let value = if negative { 0 } else { magnitude as u32 };
    Some((value, count))
}

pub fn encoded_len(value: i32) -> usize {
    let mut rest = u64::from(value.unsigned_abs()) >> 2;
    let mut count = 1;
    while rest != 0 {
        rest >>= 6;
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(value: i32) -> Vec<u8> {
        let mut out = Vec::new();
        encode_i32(&mut out, value);
        out
    }

    #[test]
    fn small_values_match_client_bytes() {
        assert_eq!(enc(0), b"H");
        assert_eq!(enc(1), b"I");
        assert_eq!(enc(2), b"J");
        assert_eq!(enc(3), b"K");
        assert_eq!(enc(-1), b"M");
        assert_eq!(enc(4), b"PA");
    }

    #[test]
    fn boundary_values_round_trip() {
        for value in [0, 1, -1, 3, 4, 255, 256, -256, 4095, 65_536, i32::MAX, i32::MIN + 1] {
            let bytes = enc(value);
            assert_eq!(bytes.len(), encoded_len(value));
            assert_eq!(decode_i32(&bytes), Some((value, bytes.len())), "value {value}");
        }
    }

    #[test]
    fn min_value_uses_all_six_bytes() {
        let bytes = enc(i32::MIN);
        assert_eq!(bytes.len(), MAX_BYTES);
        assert_eq!(decode_i32(&bytes), Some((i32::MIN, MAX_BYTES)));
    }

    #[test]
    fn unsigned_covers_full_range() {
        let mut out = Vec::new();
        encode_u32(&mut out, u32::MAX);
        assert_eq!(decode_u32(&out), Some((u32::MAX, out.len())));
    }

    #[test]
    fn decode_only_consumes_its_own_bytes() {
        let mut out = enc(300);
        let len = out.len();
        out.extend_from_slice(b"trailing");
        assert_eq!(decode_i32(&out), Some((300, len)));
    }

    #[test]
    fn truncated_or_invalid_input_yields_none() {
        let bytes = enc(70_000);
        assert_eq!(decode_i32(&bytes[..bytes.len() - 1]), None);
        assert_eq!(decode_i32(&[]), None);
        assert_eq!(decode_i32(&[0x40]), None);
    }
}

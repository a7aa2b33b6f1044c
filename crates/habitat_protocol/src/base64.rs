//! Legacy base64 digit encoding used for the "fixed" wire fields.
//!
//! This is not RFC 4648 base64. Every digit carries six bits of the value,
//! most significant digit first, offset into the printable range by `0x40`.
//! Header ids use two digits, inbound frame lengths three, fixed string
//! lengths two.

use bytes::BufMut;

/// Offset added to every six-bit digit.
pub const DIGIT_OFFSET: u8 = 0x40;

/// Largest digit count whose value still fits a `u32`.
pub const MAX_DIGITS: usize = 5;

/// Largest value representable with `digits` digits.
pub fn max_value(digits: usize) -> u32 {
    let digits = digits.min(MAX_DIGITS);
    ((1u64 << (6 * digits)) - 1) as u32
}

/// Appends `value` as `digits` base64 digits. Bits above the representable
/// range are dropped.
pub fn encode_into<B: BufMut>(buf: &mut B, value: u32, digits: usize) {
    let digits = digits.min(MAX_DIGITS);
    for i in 0..digits {
        let shift = 6 * (digits - 1 - i);
        buf.put_u8(DIGIT_OFFSET | ((value >> shift) & 0x3f) as u8);
    }
}

pub fn encode(value: u32, digits: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(digits);
    encode_into(&mut out, value, digits);
    out
}

/// Decodes a run of base64 digits. Each byte contributes its low six bits,
/// so garbage input still decodes to some value instead of failing.
pub fn decode(digits: &[u8]) -> u32 {
    digits
        .iter()
        .take(MAX_DIGITS)
        .fold(0u32, |acc, &b| (acc << 6) | u32::from(b.wrapping_sub(DIGIT_OFFSET) & 0x3f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_headers_encode_to_client_digits() {
        assert_eq!(encode(0, 2), b"@@");
        assert_eq!(encode(3, 2), b"@C");
        assert_eq!(encode(34, 2), b"@b");
        assert_eq!(encode(206, 2), b"CN");
    }

    #[test]
    fn decode_reverses_encode_within_range() {
        for digits in 1..=3 {
            let max = max_value(digits);
            for value in [0, 1, 63, 64, max / 2, max] {
                assert_eq!(decode(&encode(value, digits)), value);
            }
        }
    }

    #[test]
    fn oversized_values_keep_low_bits() {
        assert_eq!(decode(&encode(4096 + 5, 2)), 5);
    }
}

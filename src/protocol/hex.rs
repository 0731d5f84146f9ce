//! Hex digit encoding of fixed-width values.
//!
//! Every byte becomes two lowercase hex digits. Multi-byte values are written
//! least significant byte first, which is how the module transmits them and how
//! [`crate::protocol::MessageCodec::decode`] reads them back.

const NIBBLE_TO_HEX: &[u8; 16] = b"0123456789abcdef";

/// Values with a fixed-width hex representation
pub trait ToHex {
    /// Renders the value as `2 * size_of::<Self>()` hex digits
    fn to_hex(&self) -> String;
}

macro_rules! impl_to_hex {
    ($($t:ty),*) => {
        $(
            impl ToHex for $t {
                fn to_hex(&self) -> String {
                    encode_bytes(&self.to_le_bytes())
                }
            }
        )*
    };
}

impl_to_hex!(u8, i8, u16, i16, u32, i32, f32);

impl ToHex for char {
    /// Only the low byte of the code point is kept
    fn to_hex(&self) -> String {
        (*self as u32 as u8).to_hex()
    }
}

/// Renders raw bytes in order, two digits each
pub fn encode_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(NIBBLE_TO_HEX[(b >> 4) as usize] as char);
        out.push(NIBBLE_TO_HEX[(b & 0x0f) as usize] as char);
    }
    out
}

/// Renders each character of an ASCII string as one byte
pub fn encode_str(text: &str) -> String {
    text.chars().map(|c| c.to_hex()).collect()
}

/// Converts a hex digit, or `None` when `ch` is not one
pub fn try_decode_hex_digit(ch: char) -> Option<u8> {
    ch.to_digit(16).map(|d| d as u8)
}

/// Converts a hex digit, mapping anything invalid to 0.
///
/// A zero result cannot be told apart from a genuine `'0'`; use
/// [`try_decode_hex_digit`] where that matters.
pub fn decode_hex_digit(ch: char) -> u8 {
    try_decode_hex_digit(ch).unwrap_or(0)
}

/// Combines two hex digits into a byte, lossy like [`decode_hex_digit`]
pub fn decode_byte(high: char, low: char) -> u8 {
    (decode_hex_digit(high) << 4) | decode_hex_digit(low)
}

/// Returns true when `text` is an even-length run of hex digits
pub fn is_hex(text: &str) -> bool {
    text.len() % 2 == 0 && text.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_byte_order() {
        assert_eq!(0x1234u16.to_hex(), "3412");
        assert_eq!(235i16.to_hex(), "eb00");
        assert_eq!((-1i16).to_hex(), "ffff");
        assert_eq!(0x0102_0304u32.to_hex(), "04030201");
        assert_eq!(7u8.to_hex(), "07");
    }

    #[test]
    fn test_width() {
        assert_eq!(0i32.to_hex().len(), 8);
        assert_eq!(1.5f32.to_hex().len(), 8);
        assert_eq!(1.0f32.to_hex(), "0000803f");
    }

    #[test]
    fn test_char_and_str() {
        assert_eq!('X'.to_hex(), "58");
        assert_eq!('9'.to_hex(), "39");
        assert_eq!(encode_str("Hi!"), "486921");
    }

    #[test]
    fn test_decode_digits() {
        assert_eq!(decode_hex_digit('0'), 0);
        assert_eq!(decode_hex_digit('9'), 9);
        assert_eq!(decode_hex_digit('a'), 10);
        assert_eq!(decode_hex_digit('F'), 15);
        // Invalid input is silently zero
        assert_eq!(decode_hex_digit('g'), 0);
        assert_eq!(decode_hex_digit('>'), 0);
        assert_eq!(try_decode_hex_digit('g'), None);
        assert_eq!(decode_byte('f', 'f'), 0xff);
        assert_eq!(decode_byte('4', 'D'), 0x4d);
    }

    #[test]
    fn test_is_hex() {
        assert!(is_hex(""));
        assert!(is_hex("00ff"));
        assert!(!is_hex("0"));
        assert!(!is_hex("zz"));
    }
}

//! 5-bit letter alphabet for 3-character field names.
//!
//! ```text
//! 0      end of name / cannot be encoded
//! 1..26  a..z
//! 27..31 0..4
//! ```
//!
//! Three letters pack into 15 bits, first letter highest, top bit always 0:
//! `[x000][0011][1112][2222]`.

const FIRST_LETTER: u8 = 1;
const FIRST_DIGIT: u8 = 27;

/// Number of letters in a packed name
pub const NAME_LETTERS: usize = 3;

/// Converts a character to its 5-bit code, 0 when it cannot be encoded
pub fn encode_letter(ch: char) -> u8 {
    let ch = ch.to_ascii_lowercase();
    match ch {
        'a'..='z' => ch as u8 - b'a' + FIRST_LETTER,
        '0'..='4' => ch as u8 - b'0' + FIRST_DIGIT,
        _ => 0,
    }
}

/// Converts a 5-bit code back to its character
pub fn decode_letter(code: u8) -> Option<char> {
    match code {
        0 => None,
        c if c < FIRST_DIGIT => Some((c - FIRST_LETTER + b'a') as char),
        c if c < FIRST_DIGIT + 5 => Some((c - FIRST_DIGIT + b'0') as char),
        _ => None,
    }
}

/// Packs up to three characters of `name` into 15 bits.
///
/// Missing characters pack as 0, extra ones are ignored.
pub fn pack_name(name: &str) -> u16 {
    let mut codes = [0u8; NAME_LETTERS];
    for (slot, ch) in codes.iter_mut().zip(name.chars()) {
        *slot = encode_letter(ch);
    }
    ((codes[0] as u16) << 10) | ((codes[1] as u16) << 5) | codes[2] as u16
}

/// Unpacks the three letter slots of a packed name
pub fn unpack_name(packed: u16) -> [Option<char>; NAME_LETTERS] {
    [
        decode_letter(((packed >> 10) & 0x1f) as u8),
        decode_letter(((packed >> 5) & 0x1f) as u8),
        decode_letter((packed & 0x1f) as u8),
    ]
}

/// Unpacks a name to text, stopping at the first empty slot
pub fn unpack_name_str(packed: u16) -> String {
    unpack_name(packed).iter().map_while(|c| *c).collect()
}

use tracing::{debug, warn};

use crate::core::{Error, Result, MAX_HEX_DIGITS};
use crate::transceiver::Transceiver;
use super::hex::{self, ToHex};
use super::message::{DecodedField, DecodedMessage, Field, FieldValue};
use super::name;

/// Hex digits taken by one field: 4 for the name, 4 for the value
pub const FIELD_HEX_DIGITS: usize = 8;

/// Builds structured messages that fit in one 12-byte frame.
///
/// ```text
/// +------------+-------------+------------+-------------+---
/// | name (LE)  | value (LE)  | name (LE)  | value (LE)  | ...
/// | 2 bytes    | 2 bytes     | 2 bytes    | 2 bytes     |
/// +------------+-------------+------------+-------------+---
/// ```
#[derive(Debug, Clone, Default)]
pub struct MessageCodec {
    /// Hex digits accumulated so far
    encoded: String,
    /// Fields in the order they were added
    fields: Vec<Field>,
}

impl MessageCodec {
    /// Creates an empty message
    pub fn new() -> Self {
        MessageCodec::default()
    }

    /// Appends a field.
    ///
    /// Numbers are scaled by 10 to keep one decimal place; text reuses the
    /// name alphabet. Fails without touching the message when the field would
    /// not fit.
    pub fn add_field(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        let value = value.into();
        debug!("Message.add_field: {}={}", name, value);
        self.check_capacity()?;
        let word = value.to_word()?;
        self.encoded.push_str(&name::pack_name(name).to_hex());
        self.encoded.push_str(&word.to_hex());
        self.fields.push(Field {
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    /// Appends a field whose value is already scaled by 10
    pub fn add_raw_field(&mut self, name: &str, scaled: i16) -> Result<()> {
        self.add_field(name, FieldValue::Scaled(scaled))
    }

    fn check_capacity(&self) -> Result<()> {
        if self.encoded.len() + FIELD_HEX_DIGITS > MAX_HEX_DIGITS {
            let committed = self.committed_bytes();
            warn!("Message too long, already {} bytes", committed);
            return Err(Error::CapacityExceeded { committed });
        }
        Ok(())
    }

    /// Returns the hex digits to transmit
    pub fn encode(&self) -> &str {
        &self.encoded
    }

    /// Bytes already used in the frame
    pub fn committed_bytes(&self) -> usize {
        self.encoded.len() / 2
    }

    /// Fields added so far
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns true when no field was added
    pub fn is_empty(&self) -> bool {
        self.encoded.is_empty()
    }

    /// Decodes a message back into named values.
    ///
    /// A trailing block shorter than 8 digits is dropped.
    pub fn decode(encoded: &str) -> DecodedMessage {
        let digits: Vec<char> = encoded.chars().collect();
        let fields = digits
            .chunks_exact(FIELD_HEX_DIGITS)
            .map(|block| DecodedField {
                packed_name: read_word(&block[0..4]),
                scaled: read_word(&block[4..8]) as i16,
            })
            .collect();
        DecodedMessage { fields }
    }

    /// Sends the message through a transceiver
    pub fn send(&self, transceiver: &mut dyn Transceiver) -> Result<()> {
        self.check_sendable()?;
        transceiver.send_message(&self.encoded)
    }

    /// Sends the message and returns the downlink reply, if the transceiver
    /// supports one
    pub fn send_and_get_response(&self, transceiver: &mut dyn Transceiver) -> Result<Option<String>> {
        self.check_sendable()?;
        transceiver.send_message_and_get_response(&self.encoded)
    }

    fn check_sendable(&self) -> Result<()> {
        if self.encoded.is_empty() {
            warn!("Nothing to send");
            return Err(Error::EmptyMessage);
        }
        if self.encoded.len() > MAX_HEX_DIGITS {
            return Err(Error::CapacityExceeded { committed: self.committed_bytes() });
        }
        Ok(())
    }
}

/// Reads a 16-bit word transmitted low byte first
fn read_word(digits: &[char]) -> u16 {
    u16::from_le_bytes([
        hex::decode_byte(digits[0], digits[1]),
        hex::decode_byte(digits[2], digits[3]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_encode_fields() {
        let mut message = MessageCodec::new();
        message.add_field("tmp", 23.5).unwrap();
        // tmp packs to 0x51b0, 235 is 0x00eb
        assert_eq!(message.encode(), "b051eb00");
        assert_eq!(message.committed_bytes(), 4);
    }

    #[test]
    fn test_scaling_convention() {
        let mut message = MessageCodec::new();
        message.add_field("tmp", 23.5).unwrap();
        message.add_raw_field("bat", 41).unwrap();
        let decoded = MessageCodec::decode(message.encode());
        assert_eq!(decoded.to_string(), r#"{"tmp":23.5,"bat":4.1}"#);

        let mut message = MessageCodec::new();
        message.add_field("bat", 41).unwrap();
        assert_eq!(MessageCodec::decode(message.encode()).to_string(), r#"{"bat":41.0}"#);
    }

    #[test]
    fn test_capacity_boundary() {
        let mut message = MessageCodec::new();
        message.add_field("ctr", 1).unwrap();
        message.add_field("tmp", 2).unwrap();
        message.add_field("vol", 3).unwrap();
        assert_eq!(message.encode().len(), 24);

        let before = message.encode().to_string();
        let err = message.add_field("hum", 4).unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded { committed: 12 }));
        assert_eq!(message.encode(), before);
        assert_eq!(message.fields().len(), 3);

        let err = message.add_field("sta", "ok").unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded { .. }));
    }

    #[test]
    fn test_out_of_range_leaves_message_unchanged() {
        let mut message = MessageCodec::new();
        assert!(message.add_field("big", 100_000).is_err());
        assert!(message.is_empty());
    }

    #[test]
    fn test_text_field() {
        let mut message = MessageCodec::new();
        message.add_field("sta", "on").unwrap();
        let decoded = MessageCodec::decode(message.encode());
        assert_eq!(decoded.fields[0].name(), "sta");
        assert_eq!(decoded.fields[0].scaled as u16, name::pack_name("on"));
    }

    #[test]
    fn test_negative_values() {
        let mut message = MessageCodec::new();
        message.add_field("xyz", -4.5).unwrap();
        assert_eq!(MessageCodec::decode(message.encode()).to_string(), r#"{"xyz":-4.5}"#);
    }

    #[test]
    fn test_decode_drops_partial_block() {
        let decoded = MessageCodec::decode("b051eb00b051");
        assert_eq!(decoded.len(), 1);
        assert!(MessageCodec::decode("").is_empty());
        assert!(MessageCodec::decode("b051").is_empty());
    }

    #[test]
    fn test_decode_uppercase_digits() {
        let decoded = MessageCodec::decode("B051EB00");
        assert_eq!(decoded.to_string(), r#"{"tmp":23.5}"#);
    }

    #[test]
    fn test_random_round_trip() {
        let mut rng = rand::thread_rng();
        let alphabet: Vec<char> = ('a'..='z').chain('0'..='4').collect();
        for _ in 0..200 {
            let count = rng.gen_range(1..=3);
            let mut message = MessageCodec::new();
            let mut expected = Vec::new();
            for _ in 0..count {
                let name: String = (0..3)
                    .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
                    .collect();
                let scaled: i16 = rng.gen_range(-32768..=32767);
                let value = scaled as f64 / 10.0;
                message.add_field(&name, value).unwrap();
                expected.push((name, scaled));
            }
            let decoded = MessageCodec::decode(message.encode());
            assert_eq!(decoded.len(), expected.len());
            for (field, (name, scaled)) in decoded.fields.iter().zip(&expected) {
                assert_eq!(&field.name(), name);
                assert_eq!(field.scaled, *scaled);
            }
        }
    }

    #[test]
    fn test_empty_message_not_sendable() {
        let message = MessageCodec::new();
        assert!(matches!(message.check_sendable(), Err(Error::EmptyMessage)));
    }
}

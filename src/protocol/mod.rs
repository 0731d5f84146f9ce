//! Structured message encoding
//!
//! This module packs named values into the 12-byte frame the radio network
//! carries, and decodes such frames back into named values.

pub mod codec;
pub mod hex;
pub mod message;
pub mod name;

pub use self::codec::{MessageCodec, FIELD_HEX_DIGITS};
pub use self::hex::ToHex;
pub use self::message::{DecodedField, DecodedMessage, Field, FieldValue};


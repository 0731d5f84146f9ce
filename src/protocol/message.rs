use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::core::{Error, Result};
use super::name;

/// Value carried by a message field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Whole number, transmitted scaled by 10
    Int(i32),
    /// Number with one decimal place, transmitted scaled by 10
    Float(f64),
    /// Up to three letters, transmitted with the name alphabet
    Text(String),
    /// Value already scaled by 10
    Scaled(i16),
}

impl FieldValue {
    /// Returns the 16-bit word transmitted for this value
    pub fn to_word(&self) -> Result<u16> {
        match self {
            FieldValue::Int(v) => {
                let scaled = v
                    .checked_mul(10)
                    .and_then(|s| i16::try_from(s).ok())
                    .ok_or_else(|| Error::out_of_range(format!("{} does not fit in a field", v)))?;
                Ok(scaled as u16)
            }
            FieldValue::Float(v) => {
                let scaled = (v * 10.0).round();
                if !scaled.is_finite() || scaled < i16::MIN as f64 || scaled > i16::MAX as f64 {
                    return Err(Error::out_of_range(format!("{} does not fit in a field", v)));
                }
                Ok(scaled as i16 as u16)
            }
            FieldValue::Text(text) => Ok(name::pack_name(text)),
            FieldValue::Scaled(v) => Ok(*v as u16),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{:.1}", v),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Scaled(v) => write_tenths(f, *v),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FieldValue {
                fn from(v: $t) -> Self {
                    FieldValue::Int(v as i32)
                }
            }
        )*
    };
}

impl_from_int!(i8, u8, i16, u16, i32);

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::Float(v as f64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// A named value added to a message
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name, at most 3 letters survive encoding
    pub name: String,
    /// Field value
    pub value: FieldValue,
}

/// A field read back from an encoded message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedField {
    /// Packed 15-bit name
    pub packed_name: u16,
    /// Value scaled by 10
    pub scaled: i16,
}

impl DecodedField {
    /// Returns the name, truncated at the first empty letter slot
    pub fn name(&self) -> String {
        name::unpack_name_str(self.packed_name)
    }

    /// Returns the value with its one decimal place restored
    pub fn value(&self) -> f64 {
        self.scaled as f64 / 10.0
    }
}

/// Fields decoded from a message, in transmission order.
///
/// `Display` renders `{"abc":12.3,"xyz":-4.5}` with exactly one fractional digit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Decoded fields
    pub fields: Vec<DecodedField>,
}

impl DecodedMessage {
    /// Returns the value of the first field called `name`
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|field| field.name() == name)
            .map(DecodedField::value)
    }

    /// Number of decoded fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when nothing was decoded
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn write_tenths(f: &mut fmt::Formatter<'_>, scaled: i16) -> fmt::Result {
    let sign = if scaled < 0 { "-" } else { "" };
    let magnitude = scaled.unsigned_abs();
    write!(f, "{}{}.{}", sign, magnitude / 10, magnitude % 10)
}

impl fmt::Display for DecodedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "\"{}\":", field.name())?;
            write_tenths(f, field.scaled)?;
        }
        f.write_str("}")
    }
}

impl Serialize for DecodedMessage {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.name(), &field.value())?;
        }
        map.end()
    }
}

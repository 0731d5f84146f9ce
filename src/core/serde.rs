use serde::{Serialize, Deserialize, Serializer, Deserializer};
use std::time::Duration;

/// Serializes Duration as seconds
pub fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    duration.as_secs_f64().serialize(serializer)
}

/// Deserializes Duration from seconds
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(serde::de::Error::custom(format!("invalid duration: {}", secs)));
    }
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}

/// Serializes an optional Duration as seconds or null
pub fn serialize_opt_duration<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    duration.map(|d| d.as_secs_f64()).serialize(serializer)
}

/// Deserializes an optional Duration from seconds or null
pub fn deserialize_opt_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        Some(secs) if !secs.is_finite() || secs < 0.0 => {
            Err(serde::de::Error::custom(format!("invalid duration: {}", secs)))
        }
        Some(secs) => Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json;

    #[derive(Serialize, Deserialize)]
    struct Test {
        #[serde(serialize_with = "serialize_duration")]
        #[serde(deserialize_with = "deserialize_duration")]
        spacing: Duration,
        #[serde(serialize_with = "serialize_opt_duration")]
        #[serde(deserialize_with = "deserialize_opt_duration")]
        timeout: Option<Duration>,
    }

    #[test]
    fn test_duration_serialization() {
        let original = Test {
            spacing: Duration::from_millis(2500),
            timeout: None,
        };

        let serialized = serde_json::to_string(&original).unwrap();
        assert_eq!(serialized, r#"{"spacing":2.5,"timeout":null}"#);

        let deserialized: Test = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.spacing, original.spacing);
        assert_eq!(deserialized.timeout, None);
    }

    #[test]
    fn test_optional_duration() {
        let parsed: Test = serde_json::from_str(r#"{"spacing":1.0,"timeout":60.0}"#).unwrap();
        assert_eq!(parsed.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_negative_duration_rejected() {
        let parsed = serde_json::from_str::<Test>(r#"{"spacing":-1.0,"timeout":null}"#);
        assert!(parsed.is_err());
    }
}

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use super::{Error, Result, MAX_COMMAND_TIMEOUT};

/// Regional radio configuration zone (RCZ1 to RCZ4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    /// Europe, Oman, South Africa
    Rcz1 = 1,
    /// United States
    Rcz2 = 2,
    /// Japan
    Rcz3 = 3,
    /// Singapore, Taiwan, Australia, New Zealand, Brazil and the rest
    Rcz4 = 4,
}

impl Zone {
    /// Returns the zone for a 1-based zone number
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Zone::Rcz1),
            2 => Some(Zone::Rcz2),
            3 => Some(Zone::Rcz3),
            4 => Some(Zone::Rcz4),
            _ => None,
        }
    }

    /// Returns the 1-based zone number
    pub fn number(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RCZ{}", self.number())
    }
}

/// Two-letter country code selecting the transmission zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Country([u8; 2]);

impl Country {
    pub const AU: Country = Country(*b"AU");
    pub const BR: Country = Country(*b"BR");
    pub const FR: Country = Country(*b"FR");
    pub const JP: Country = Country(*b"JP");
    pub const OM: Country = Country(*b"OM");
    pub const NZ: Country = Country(*b"NZ");
    pub const SA: Country = Country(*b"SA");
    pub const SG: Country = Country(*b"SG");
    pub const US: Country = Country(*b"US");
    pub const TW: Country = Country(*b"TW");

    /// Returns the zone that radios in this country must use
    pub fn zone(&self) -> Zone {
        match *self {
            Country::JP => Zone::Rcz3,
            Country::US => Zone::Rcz2,
            Country::FR | Country::OM | Country::SA => Zone::Rcz1,
            _ => Zone::Rcz4,
        }
    }

    /// Returns the country code as a string slice
    pub fn code(&self) -> &str {
        // Construction only admits ASCII uppercase letters
        std::str::from_utf8(&self.0).unwrap_or("??")
    }
}

impl FromStr for Country {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 || !bytes.iter().all(|b| b.is_ascii_alphabetic()) {
            return Err(Error::config(format!("Invalid country code: {:?}", s)));
        }
        Ok(Country([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
        ]))
    }
}

impl TryFrom<String> for Country {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Country> for String {
    fn from(country: Country) -> Self {
        country.code().to_string()
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Operating mode of the radio module as tracked by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceMode {
    /// Payloads may be transmitted
    #[default]
    Send,
    /// Module commands may be issued
    Command,
    /// Module configuration may be written
    Config,
}

/// Identity of a radio module on the network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Device ID, most significant byte first
    pub id: String,
    /// Porting authorization code used to register the device
    pub pac: String,
}

/// Configuration for a transceiver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Country the device transmits in
    pub country: Country,
    /// Route traffic to a test receiver instead of the live network
    pub use_emulator: bool,
    /// Device name reported before the real ID is known
    pub device: String,
    /// Whether diagnostic echo starts enabled
    pub echo: bool,
    /// Override of the adapter's default response timeout
    #[serde(serialize_with = "super::serde::serialize_opt_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_opt_duration")]
    pub command_timeout: Option<Duration>,
    /// Hard minimum spacing between two sends
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub min_send_spacing: Duration,
    /// Regulatory spacing between two sends
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub send_interval: Duration,
    /// Bring-up attempts before giving up
    pub init_attempts: u32,
    /// Delay before each bring-up attempt
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub init_delay: Duration,
    /// Maximum exit-command transactions before the device is declared stuck
    pub exit_retry_limit: u32,
    /// Settle time after opening the serial channel
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub open_settle: Duration,
    /// Pause after each outbound unit
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub write_pacing: Duration,
    /// Pause while waiting for inbound bytes
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            country: Country::SG,
            use_emulator: false,
            device: String::new(),
            echo: true,
            command_timeout: None,
            min_send_spacing: super::MIN_SEND_SPACING,
            send_interval: super::SEND_INTERVAL,
            init_attempts: 5,
            init_delay: Duration::from_secs(2),
            exit_retry_limit: 16,
            open_settle: Duration::from_millis(200),
            write_pacing: Duration::from_millis(10),
            poll_interval: Duration::from_millis(1),
        }
    }
}

impl Config {
    /// Checks that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.init_attempts == 0 {
            return Err(Error::config("init_attempts must be at least 1"));
        }
        if self.exit_retry_limit == 0 {
            return Err(Error::config("exit_retry_limit must be at least 1"));
        }
        if self.min_send_spacing > self.send_interval {
            return Err(Error::config("min_send_spacing exceeds send_interval"));
        }
        if let Some(timeout) = self.command_timeout {
            if timeout.is_zero() {
                return Err(Error::config("command_timeout must be positive"));
            }
            if timeout > MAX_COMMAND_TIMEOUT {
                return Err(Error::config(format!(
                    "command_timeout exceeds {} s",
                    MAX_COMMAND_TIMEOUT.as_secs()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_zones() {
        assert_eq!(Country::SG.zone(), Zone::Rcz4);
        assert_eq!(Country::TW.zone(), Zone::Rcz4);
        assert_eq!(Country::AU.zone(), Zone::Rcz4);
        assert_eq!(Country::US.zone(), Zone::Rcz2);
        assert_eq!(Country::JP.zone(), Zone::Rcz3);
        assert_eq!(Country::FR.zone(), Zone::Rcz1);
        assert_eq!(Country::OM.zone(), Zone::Rcz1);
        assert_eq!(Country::SA.zone(), Zone::Rcz1);
        assert_eq!("de".parse::<Country>().unwrap().zone(), Zone::Rcz4);
    }

    #[test]
    fn test_country_parsing() {
        assert_eq!("us".parse::<Country>().unwrap(), Country::US);
        assert!("USA".parse::<Country>().is_err());
        assert!("U1".parse::<Country>().is_err());
        assert_eq!(Country::NZ.to_string(), "NZ");
    }

    #[test]
    fn test_zone_numbers() {
        for n in 1..=4 {
            assert_eq!(Zone::from_number(n).unwrap().number(), n);
        }
        assert_eq!(Zone::from_number(0), None);
        assert_eq!(Zone::from_number(5), None);
        assert_eq!(Zone::Rcz4.to_string(), "RCZ4");
    }

    #[test]
    fn test_config_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(DeviceMode::default(), DeviceMode::Send);
    }

    #[test]
    fn test_config_validation() {
        let config = Config {
            init_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            min_send_spacing: Duration::from_secs(3600),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            command_timeout: Some(MAX_COMMAND_TIMEOUT + Duration::from_secs(1)),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            command_timeout: Some(MAX_COMMAND_TIMEOUT),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_json_rejects_huge_durations() {
        assert!(serde_json::from_str::<Config>(r#"{"init_delay":1e30}"#).is_err());
        assert!(serde_json::from_str::<Config>(r#"{"command_timeout":1e30}"#).is_err());
        assert!(serde_json::from_str::<Config>(r#"{"poll_interval":-1.0}"#).is_err());
    }

    #[test]
    fn test_config_json() {
        let config: Config = serde_json::from_str(
            r#"{"country":"jp","use_emulator":true,"command_timeout":5.0}"#,
        )
        .unwrap();
        assert_eq!(config.country, Country::JP);
        assert!(config.use_emulator);
        assert_eq!(config.command_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.init_attempts, 5);

        let text = serde_json::to_string(&config).unwrap();
        assert!(text.contains(r#""country":"JP""#));
    }
}

//! Core types and constants for the transceiver driver
//!
//! This module contains the fundamental building blocks used throughout the library.

pub mod error;
pub mod types;
pub mod serde;

use std::time::Duration;

pub use self::error::{Error, Result};
pub use self::types::{
    Config,
    Country,
    DeviceIdentity,
    DeviceMode,
    Zone,
};

/// The network accepts only 12 bytes per message
pub const MAX_BYTES_PER_MESSAGE: usize = 12;

/// Hex digits needed to carry a full message
pub const MAX_HEX_DIGITS: usize = MAX_BYTES_PER_MESSAGE * 2;

/// Regulatory spacing between messages (1% duty cycle)
pub const SEND_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Development floor below which a send is refused outright
pub const MIN_SEND_SPACING: Duration = Duration::from_secs(2);

/// Longest response timeout a configuration may set
pub const MAX_COMMAND_TIMEOUT: Duration = Duration::from_secs(60 * 60);

//! Sigfox transceiver driver
//!
//! This library drives Sigfox radio modules (Radiocrafts RC1692 and Wisol
//! WSSFM10) over a serial link, and packs named sensor values into the
//! 12-byte messages the network carries.
//!
//! ```no_run
//! use sigfox_transceiver::{Config, MessageCodec, SerialPortChannel, SystemClock, Transceiver, Wssfm10};
//!
//! # fn main() -> sigfox_transceiver::Result<()> {
//! let channel = SerialPortChannel::new("/dev/ttyUSB0");
//! let mut transceiver = Wssfm10::new(channel, SystemClock, Config::default())?;
//! transceiver.begin()?;
//!
//! let mut msg = MessageCodec::new();
//! msg.add_field("tmp", 23.5)?;
//! msg.send(&mut transceiver)?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod device;
pub mod protocol;
pub mod transceiver;
pub mod util;

// Re-export commonly used items
pub use crate::core::{Config, Country, DeviceIdentity, Error, Result, Zone};
pub use crate::device::{Echo, SerialChannel, SerialPortChannel, SystemClock};
pub use crate::protocol::{DecodedMessage, MessageCodec};
pub use crate::transceiver::{Rc1692, Transceiver, Wssfm10};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

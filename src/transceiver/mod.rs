//! Radio module drivers behind one common interface
//!
//! [`Rc1692`] speaks the binary, `>`-terminated protocol of Radiocrafts
//! modules. [`Wssfm10`] speaks the AT command set of Wisol modules.

pub mod rc1692;
pub mod wssfm10;

use std::time::Duration;

use tracing::{info, warn};

use crate::core::{DeviceIdentity, Error, Result, Zone, MAX_BYTES_PER_MESSAGE, MAX_HEX_DIGITS};
use crate::device::{Clock, Echo, SharedEcho};
use crate::protocol::hex;

pub use self::rc1692::Rc1692;
pub use self::wssfm10::Wssfm10;

/// Operations every radio module supports.
///
/// Payloads are strings of hex digit pairs of at most 12 bytes. Calls block
/// until the module answers or the response timeout passes; an instance must
/// not be shared between threads without external locking.
pub trait Transceiver {
    /// Powers up and configures the module, retrying the whole sequence
    fn begin(&mut self) -> Result<()>;

    /// Returns true when the duty cycle allows a send now
    fn is_ready(&self) -> bool;

    /// Sends a payload of hex digits
    fn send_message(&mut self, payload: &str) -> Result<()>;

    /// Sends a payload and waits for the network's downlink reply.
    ///
    /// Modules without downlink support send normally and return `None`.
    fn send_message_and_get_response(&mut self, payload: &str) -> Result<Option<String>>;

    /// Sends up to 12 ASCII characters, one byte each
    fn send_string(&mut self, text: &str) -> Result<()> {
        if !text.is_ascii() || text.len() > MAX_BYTES_PER_MESSAGE {
            return Err(Error::invalid_payload(format!(
                "expected at most {} ASCII characters, got {:?}",
                MAX_BYTES_PER_MESSAGE, text
            )));
        }
        self.send_message(&hex::encode_str(text))
    }

    /// Reads the device ID and PAC
    fn get_id(&mut self) -> Result<DeviceIdentity>;

    /// Module temperature in degrees Celsius
    fn get_temperature(&mut self) -> Result<f32>;

    /// Supply voltage in volts
    fn get_voltage(&mut self) -> Result<f32>;

    /// Radio configuration zone the module transmits in
    fn get_frequency_zone(&mut self) -> Result<Zone>;

    /// Switches the module to another radio configuration zone
    fn set_frequency_zone(&mut self, zone: Zone) -> Result<()>;

    /// Routes traffic to a test receiver
    fn enable_emulator(&mut self) -> Result<()>;

    /// Routes traffic to the live network
    fn disable_emulator(&mut self) -> Result<()>;

    /// Returns true when the module sends to the emulator
    fn get_emulator(&mut self) -> Result<bool>;

    /// Restarts the module
    fn reboot(&mut self) -> Result<()>;

    /// Persists the module settings to its flash
    fn write_settings(&mut self) -> Result<()> {
        Err(Error::Unsupported("write_settings"))
    }

    /// Resumes diagnostic echo
    fn echo_on(&mut self);

    /// Silences diagnostic echo
    fn echo_off(&mut self);

    /// Routes diagnostic echo to `sink`
    fn set_echo(&mut self, sink: SharedEcho);
}

/// Rejects payloads that are not hex digit pairs or do not fit one frame
pub(crate) fn validate_payload(payload: &str) -> Result<()> {
    if payload.len() > MAX_HEX_DIGITS {
        return Err(Error::invalid_payload(format!(
            "{} bytes exceeds the {} byte limit",
            payload.len() / 2,
            MAX_BYTES_PER_MESSAGE
        )));
    }
    if !hex::is_hex(payload) {
        return Err(Error::invalid_payload(format!("not hex digit pairs: {:?}", payload)));
    }
    Ok(())
}

/// Runs a bring-up sequence up to `attempts` times, waiting `delay` before
/// each one. Fatal errors end the retries at once.
pub(crate) fn retry_bring_up<C: Clock>(
    clock: &C,
    attempts: u32,
    delay: Duration,
    echo: &dyn Echo,
    mut bring_up: impl FnMut() -> Result<()>,
) -> Result<()> {
    for attempt in 1..=attempts {
        clock.sleep(delay);
        match bring_up() {
            Ok(()) => {
                info!("Module ready after {} attempt(s)", attempt);
                return Ok(());
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Bring-up attempt {}/{} failed: {}", attempt, attempts, e);
                echo.warn(&format!(" - Bring-up attempt {} failed: {}", attempt, e));
            }
        }
    }
    Err(Error::InitFailed(attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use crate::device::{ManualClock, NullEcho};

    #[test]
    fn test_validate_payload() {
        assert!(validate_payload("").is_ok());
        assert!(validate_payload("0102030405060708090a0b0c").is_ok());
        assert!(validate_payload("0102030405060708090a0b0c0d").is_err());
        assert!(validate_payload("123").is_err());
        assert!(validate_payload("zz").is_err());
    }

    #[test]
    fn test_retry_until_success() {
        let clock = ManualClock::new();
        let calls = Cell::new(0);
        retry_bring_up(&clock, 5, Duration::from_secs(2), &NullEcho, || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(Error::Timeout(Duration::from_secs(1)))
            } else {
                Ok(())
            }
        })
        .unwrap();
        assert_eq!(calls.get(), 3);
        assert_eq!(clock.elapsed(), Duration::from_secs(6));
    }

    #[test]
    fn test_retry_exhausted() {
        let clock = ManualClock::new();
        let err = retry_bring_up(&clock, 5, Duration::from_secs(2), &NullEcho, || {
            Err(Error::unexpected("4a"))
        })
        .unwrap_err();
        assert!(matches!(err, Error::InitFailed(5)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_retry_stops_on_fatal() {
        let clock = ManualClock::new();
        let calls = Cell::new(0);
        let err = retry_bring_up(&clock, 5, Duration::ZERO, &NullEcho, || {
            calls.set(calls.get() + 1);
            Err(Error::ModeStuck(16))
        })
        .unwrap_err();
        assert!(matches!(err, Error::ModeStuck(16)));
        assert_eq!(calls.get(), 1);
    }
}

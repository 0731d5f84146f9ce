//! Utility module
//!
//! This module provides logging setup and the last-resort halt used when a
//! device cannot be brought up.

use std::time::Duration;

use tracing::Level;

use crate::core::{Error, Result};
use crate::device::Echo;

/// Interval between repeats of the stop message
pub const STOP_REPEAT: Duration = Duration::from_secs(10);

/// Installs a `tracing` subscriber printing to stdout up to `level`
pub fn init_logging(level: Level) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::config(format!("logging already initialized: {}", e)))
}

/// Line repeated by [`stop`]
pub fn stop_message(msg: &str) -> String {
    format!("STOPSTOPSTOP: {}", msg)
}

/// Halts the program for good, repeating `msg` every 10 seconds.
///
/// Used when the radio cannot be configured; a test harness watching the
/// output sees the message instead of a program running with a
/// misconfigured radio.
pub fn stop(echo: &dyn Echo, msg: &str) -> ! {
    let line = stop_message(msg);
    loop {
        echo.warn(&line);
        std::thread::sleep(STOP_REPEAT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_message() {
        assert_eq!(stop_message("Unable to init"), "STOPSTOPSTOP: Unable to init");
    }

    #[test]
    fn test_init_logging_once() {
        // Another test may have installed a subscriber first
        let first = init_logging(Level::DEBUG);
        assert!(init_logging(Level::DEBUG).is_err() || first.is_err());
    }
}

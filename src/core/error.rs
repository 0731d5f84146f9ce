use std::io;
use std::time::Duration;
use thiserror::Error;

/// Custom error types for the transceiver driver
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Message too long, already {committed} bytes")]
    CapacityExceeded {
        /// Bytes already committed to the message
        committed: usize,
    },

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Must wait before sending the next message, only {0:?} since last send")]
    DutyCycleViolation(Duration),

    #[error("Device did not return to send mode after {0} exit attempts")]
    ModeStuck(u32),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Value out of range: {0}")]
    ValueOutOfRange(String),

    #[error("Nothing to send")]
    EmptyMessage,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not supported: {0}")]
    Unsupported(&'static str),

    #[error("Device initialization failed after {0} attempts")]
    InitFailed(u32),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new unexpected response error
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Error::UnexpectedResponse(msg.into())
    }

    /// Creates a new invalid payload error
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Error::InvalidPayload(msg.into())
    }

    /// Creates a new value range error
    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Error::ValueOutOfRange(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Returns true when the device can no longer be trusted to be usable.
    ///
    /// Callers usually hand these to [`crate::util::stop`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ModeStuck(_) | Error::InitFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::unexpected("4a4b");
        assert!(matches!(err, Error::UnexpectedResponse(_)));
        assert_eq!(err.to_string(), "Unexpected response: 4a4b");
    }

    #[test]
    fn test_capacity_message() {
        let err = Error::CapacityExceeded { committed: 12 };
        assert_eq!(err.to_string(), "Message too long, already 12 bytes");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::Other, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::ModeStuck(16).is_fatal());
        assert!(Error::InitFailed(5).is_fatal());
        assert!(!Error::Timeout(Duration::from_secs(1)).is_fatal());
        assert!(!Error::EmptyMessage.is_fatal());
    }
}
